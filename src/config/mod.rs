// src/config/mod.rs
pub mod lookback;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;
use serde::Deserialize;

use crate::backend::cloudwatch::DEFAULT_REGION;
use crate::error::ConfigError;
use crate::fetch::{DEFAULT_FAN_OUT, DEFAULT_QUERY_TIMEOUT, MIN_FAN_OUT};
use crate::tail::DEFAULT_TICK;

pub const DEFAULT_CONFIG_PATH: &str = "config/metric-tail.toml";
pub const DEFAULT_LOOKBACK: &str = "-12h";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Name of the metric to visualize
    #[arg(long)]
    pub metric: Option<String>,

    /// Namespace in which the metric exists
    #[arg(long)]
    pub namespace: Option<String>,

    /// Amount of metric history to fetch, e.g. -12h or 90m
    #[arg(long, allow_hyphen_values = true)]
    pub lookback: Option<String>,

    /// Keep polling every tick and redraw
    #[arg(long)]
    pub tail: bool,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    #[arg(short, long, env = "METRIC_TAIL_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Sub-queries issued when the backend rejects a window
    #[arg(long)]
    pub fan_out: Option<usize>,

    #[arg(long)]
    pub query_timeout_secs: Option<u64>,

    #[arg(long)]
    pub tick_secs: Option<u64>,
}

/// Optional TOML file; every key mirrors a CLI flag.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub metric: Option<String>,
    pub namespace: Option<String>,
    pub lookback: Option<String>,
    pub tail: Option<bool>,
    pub region: Option<String>,
    pub fan_out: Option<usize>,
    pub query_timeout_secs: Option<u64>,
    pub tick_secs: Option<u64>,
}

impl FileConfig {
    /// A missing file is not an error; it just contributes nothing.
    pub fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(target: "config", path = %path.display(), "no config file");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub metric: String,
    pub namespace: String,
    /// Negative offset from now.
    pub lookback: TimeDelta,
    pub tail: bool,
    pub region: String,
    pub fan_out: usize,
    pub query_timeout: Duration,
    pub tick: Duration,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let file = FileConfig::load_optional(&args.config)?;
        Self::merge(args, file)
    }

    /// CLI values win over file values, which win over defaults.
    pub fn merge(args: CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let metric = args
            .metric
            .or(file.metric)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("metric"))?;
        let namespace = args
            .namespace
            .or(file.namespace)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("namespace"))?;

        let raw_lookback = args
            .lookback
            .or(file.lookback)
            .unwrap_or_else(|| DEFAULT_LOOKBACK.to_string());
        let lookback = lookback::parse_lookback(&raw_lookback)?;

        let fan_out = args.fan_out.or(file.fan_out).unwrap_or(DEFAULT_FAN_OUT);
        if fan_out < MIN_FAN_OUT {
            return Err(ConfigError::FanOutTooSmall {
                got: fan_out,
                min: MIN_FAN_OUT,
            });
        }
        let query_timeout = match args.query_timeout_secs.or(file.query_timeout_secs) {
            Some(0) => return Err(ConfigError::NotPositive("query_timeout_secs")),
            Some(s) => Duration::from_secs(s),
            None => DEFAULT_QUERY_TIMEOUT,
        };
        let tick = match args.tick_secs.or(file.tick_secs) {
            Some(0) => return Err(ConfigError::NotPositive("tick_secs")),
            Some(s) => Duration::from_secs(s),
            None => DEFAULT_TICK,
        };

        Ok(Self {
            metric,
            namespace,
            lookback,
            tail: args.tail || file.tail.unwrap_or(false),
            region: args
                .region
                .or(file.region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            fan_out,
            query_timeout,
            tick,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["metric-tail"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn cli_only_uses_defaults() {
        let cfg = AppConfig::merge(
            args(&["--metric", "orders|created", "--namespace", "Shop"]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(cfg.lookback, TimeDelta::hours(-12));
        assert_eq!(cfg.fan_out, 2);
        assert_eq!(cfg.tick, Duration::from_secs(60));
        assert!(!cfg.tail);
    }

    #[test]
    fn hyphenated_lookback_is_accepted() {
        let cfg = AppConfig::merge(
            args(&["--metric", "m", "--namespace", "n", "--lookback", "-90m", "--tail"]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(cfg.lookback, TimeDelta::minutes(-90));
        assert!(cfg.tail);
    }

    #[test]
    fn cli_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            metric = "from-file"
            namespace = "FileNs"
            lookback = "2h"
            fan_out = 4
            "#,
        )
        .unwrap();
        let cfg = AppConfig::merge(args(&["--metric", "from-cli"]), file).unwrap();
        assert_eq!(cfg.metric, "from-cli");
        assert_eq!(cfg.namespace, "FileNs");
        assert_eq!(cfg.lookback, TimeDelta::hours(-2));
        assert_eq!(cfg.fan_out, 4);
    }

    #[test]
    fn bad_lookback_aborts() {
        let err = AppConfig::merge(
            args(&["--metric", "m", "--namespace", "n", "--lookback", "soon"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLookback { .. }));
    }

    #[test]
    fn missing_metric_is_reported() {
        let err = AppConfig::merge(args(&["--namespace", "n"]), FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("metric")));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("metrik = \"typo\"").is_err());
    }
}
