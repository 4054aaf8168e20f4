//! metric-tail — Binary Entrypoint
//! Loads configuration, connects to CloudWatch and draws (or tails) the
//! per-minute sample counts of one metric.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use metric_tail::backend::cloudwatch::CloudWatchBackend;
use metric_tail::render::TerminalRenderer;
use metric_tail::tail::IntervalTicker;
use metric_tail::{AppConfig, SplittingFetcher, TailMode, WindowAdvancer};

/// Logs go to stderr so they never interleave with the chart on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("metric_tail=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        metric = %cfg.metric,
        namespace = %cfg.namespace,
        region = %cfg.region,
        tail = cfg.tail,
        "starting"
    );

    let backend = Arc::new(CloudWatchBackend::from_env(&cfg.region).await);
    let fetcher = SplittingFetcher::new(backend)
        .with_fan_out(cfg.fan_out)
        .with_timeout(cfg.query_timeout);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl-C");
                cancel.cancel();
            }
        });
    }

    let mode = if cfg.tail {
        TailMode::Continuous
    } else {
        TailMode::Once
    };
    let advancer = WindowAdvancer::new(
        fetcher,
        TerminalRenderer::stdout(),
        IntervalTicker::new(cfg.tick),
        cfg.metric,
        cfg.namespace,
        cfg.lookback,
    );
    advancer
        .run(mode, cancel)
        .await
        .context("metric tail stopped")?;
    Ok(())
}
