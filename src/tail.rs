// src/tail.rs
//! # Tailing
//! Renders the lookback window once, then on every tick fetches only the
//! interval since the previous tick and rolls it onto the held series.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::backend::RemoteQueryService;
use crate::error::TailError;
use crate::fetch::SplittingFetcher;
use crate::query::{StatisticQuery, TimeWindow};
use crate::render::{RenderContext, Renderer};
use crate::series::{self, DenseSeries};

/// The backend publishes one-minute buckets, so polling faster buys nothing.
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("tail_ticks_total", "Completed tail ticks.");
        describe_gauge!("tail_series_len", "Entries in the displayed series.");
    });
}

/// Where the loop gets "now" from and how it waits between ticks.
#[async_trait]
pub trait TickSource: Send {
    fn now(&self) -> DateTime<Utc>;
    /// Wait for the next tick and return its instant.
    async fn tick(&mut self) -> DateTime<Utc>;
}

/// Wall-clock ticks on a tokio interval. The first tick fires one period after
/// construction; late ticks are delayed rather than bunched up.
pub struct IntervalTicker {
    interval: tokio::time::Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl TickSource for IntervalTicker {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn tick(&mut self) -> DateTime<Utc> {
        self.interval.tick().await;
        Utc::now()
    }
}

/// Scripted ticks for tests and replays. Once the script runs out it never
/// ticks again, optionally cancelling a token first so the loop can exit.
pub struct ManualTicks {
    current: DateTime<Utc>,
    pending: VecDeque<DateTime<Utc>>,
    on_exhausted: Option<CancellationToken>,
}

impl ManualTicks {
    pub fn new(start: DateTime<Utc>, ticks: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        Self {
            current: start,
            pending: ticks.into_iter().collect(),
            on_exhausted: None,
        }
    }

    pub fn cancel_when_exhausted(mut self, token: CancellationToken) -> Self {
        self.on_exhausted = Some(token);
        self
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    fn now(&self) -> DateTime<Utc> {
        self.current
    }

    async fn tick(&mut self) -> DateTime<Utc> {
        match self.pending.pop_front() {
            Some(t) => {
                self.current = t;
                t
            }
            None => {
                if let Some(token) = &self.on_exhausted {
                    token.cancel();
                }
                std::future::pending::<DateTime<Utc>>().await
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailMode {
    Once,
    Continuous,
}

enum State {
    Initial,
    Tailing {
        series: DenseSeries,
        last_end: DateTime<Utc>,
    },
}

pub struct WindowAdvancer<B, R, T> {
    fetcher: SplittingFetcher<B>,
    renderer: R,
    ticks: T,
    metric: String,
    namespace: String,
    lookback: TimeDelta,
    state: State,
}

impl<B, R, T> WindowAdvancer<B, R, T>
where
    B: RemoteQueryService + 'static,
    R: Renderer,
    T: TickSource,
{
    pub fn new(
        fetcher: SplittingFetcher<B>,
        renderer: R,
        ticks: T,
        metric: impl Into<String>,
        namespace: impl Into<String>,
        lookback: TimeDelta,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            ticks,
            metric: metric.into(),
            namespace: namespace.into(),
            lookback,
            state: State::Initial,
        }
    }

    pub fn series(&self) -> Option<&DenseSeries> {
        match &self.state {
            State::Initial => None,
            State::Tailing { series, .. } => Some(series),
        }
    }

    /// Fetch `[start, end)` and gap-fill it. An empty or inverted interval
    /// yields an empty series without calling the backend.
    async fn fetch_series(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DenseSeries, TailError> {
        let Some(window) = TimeWindow::new(start, end) else {
            return Ok(DenseSeries::empty(start));
        };
        let query = StatisticQuery::sample_count(&self.metric, &self.namespace, window);
        let points = self.fetcher.fetch(&query).await?;
        Ok(series::build(points, window.start))
    }

    fn draw(&mut self, as_of: DateTime<Utc>) -> Result<(), TailError> {
        let State::Tailing { series, .. } = &self.state else {
            return Ok(());
        };
        let ctx = RenderContext {
            metric: self.metric.clone(),
            namespace: self.namespace.clone(),
            lookback: self.lookback,
            as_of,
        };
        self.renderer.render(series, &ctx)?;
        Ok(())
    }

    /// Initial state: fetch `[now + lookback, now)` and render it.
    pub async fn render_initial(&mut self) -> Result<(), TailError> {
        ensure_metrics_described();
        let now = self.ticks.now();
        let start = TimeWindow::lookback_from(now, self.lookback).map_or(now, |w| w.start);
        let series = self.fetch_series(start, now).await?;
        tracing::info!(
            target: "tail",
            metric = %self.metric,
            namespace = %self.namespace,
            len = series.len(),
            "initial window fetched"
        );
        gauge!("tail_series_len").set(series.len() as f64);
        self.state = State::Tailing {
            series,
            last_end: now,
        };
        self.draw(now)
    }

    /// One tailing step up to `now`: fetch what arrived since the last end,
    /// evict as many old entries as new ones arrived, and redraw.
    pub async fn advance_to(&mut self, now: DateTime<Utc>) -> Result<(), TailError> {
        let last_end = match &self.state {
            State::Tailing { last_end, .. } => *last_end,
            State::Initial => return self.render_initial().await,
        };
        let newer = self.fetch_series(last_end, now).await?;
        let arrived = newer.len();

        if let State::Tailing { series, last_end } = &mut self.state {
            series.advance(newer);
            *last_end = now;
            counter!("tail_ticks_total").increment(1);
            gauge!("tail_series_len").set(series.len() as f64);
            tracing::debug!(target: "tail", arrived, len = series.len(), "tick merged");
        }
        self.draw(now)
    }

    /// Run until done: once in `Once` mode, otherwise until `cancel` fires or a
    /// fetch/render error ends the loop. Returns the last displayed series.
    pub async fn run(
        mut self,
        mode: TailMode,
        cancel: CancellationToken,
    ) -> Result<DenseSeries, TailError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(self.into_series()),
            res = self.render_initial() => res?,
        }

        if mode == TailMode::Continuous {
            loop {
                let now = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    now = self.ticks.tick() => now,
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    res = self.advance_to(now) => {
                        if let Err(e) = res {
                            tracing::error!(target: "tail", error = %e, "tail loop stopped");
                            return Err(e);
                        }
                    }
                }
            }
            tracing::info!(target: "tail", "tail loop cancelled");
        }
        Ok(self.into_series())
    }

    fn into_series(self) -> DenseSeries {
        match self.state {
            State::Tailing { series, .. } => series,
            State::Initial => DenseSeries::empty(self.ticks.now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::query::RawDatapoint;
    use crate::render::RecordingRenderer;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn minute(m: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + TimeDelta::minutes(m)
    }

    #[tokio::test]
    async fn first_advance_from_initial_renders_the_lookback() {
        let backend = MockBackend::new(vec![RawDatapoint::new(minute(2), 5.0)]);
        let mut rec = RecordingRenderer::new();
        let mut adv = WindowAdvancer::new(
            SplittingFetcher::new(Arc::new(backend)),
            &mut rec,
            ManualTicks::new(minute(3), Vec::<DateTime<Utc>>::new()),
            "m",
            "n",
            TimeDelta::minutes(3),
        );
        assert!(adv.series().is_none());

        adv.advance_to(minute(3)).await.unwrap();
        assert_eq!(adv.series().map(|s| s.values().to_vec()), Some(vec![0.0, 0.0, 5.0]));

        // no time has passed: nothing fetched, nothing evicted
        adv.advance_to(minute(3)).await.unwrap();
        assert_eq!(adv.series().map(|s| s.len()), Some(3));
        drop(adv);
        assert_eq!(rec.frames.len(), 2);
    }
}
