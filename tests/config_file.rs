// tests/config_file.rs
use std::{env, fs, time::Duration};

use chrono::TimeDelta;
use clap::Parser;
use metric_tail::config::{AppConfig, CliArgs};
use metric_tail::ConfigError;

const ENV_PATH: &str = "METRIC_TAIL_CONFIG";

#[serial_test::serial]
#[test]
fn file_from_env_fills_missing_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("metric-tail.toml");
    fs::write(
        &path,
        r#"
metric = "scheduled-charge|updated"
namespace = "Cron"
lookback = "30m"
tail = true
tick_secs = 15
"#,
    )
    .unwrap();
    env::set_var(ENV_PATH, path.display().to_string());

    let cfg = AppConfig::from_args(CliArgs::parse_from(["metric-tail"])).unwrap();
    env::remove_var(ENV_PATH);

    assert_eq!(cfg.metric, "scheduled-charge|updated");
    assert_eq!(cfg.namespace, "Cron");
    assert_eq!(cfg.lookback, TimeDelta::minutes(-30));
    assert!(cfg.tail);
    assert_eq!(cfg.tick, Duration::from_secs(15));
}

#[serial_test::serial]
#[test]
fn missing_file_contributes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    env::remove_var(ENV_PATH);
    let absent = tmp.path().join("nope.toml");

    let args = CliArgs::parse_from([
        "metric-tail",
        "--config",
        absent.to_str().unwrap(),
        "--metric",
        "m",
        "--namespace",
        "n",
    ]);
    let cfg = AppConfig::from_args(args).unwrap();
    assert_eq!(cfg.lookback, TimeDelta::hours(-12));
    assert!(!cfg.tail);
}

#[serial_test::serial]
#[test]
fn malformed_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    env::remove_var(ENV_PATH);
    let path = tmp.path().join("bad.toml");
    fs::write(&path, "metric = [").unwrap();

    let args = CliArgs::parse_from(["metric-tail", "--config", path.to_str().unwrap()]);
    assert!(matches!(
        AppConfig::from_args(args),
        Err(ConfigError::Toml(_))
    ));
}

#[serial_test::serial]
#[test]
fn fan_out_of_one_is_rejected() {
    env::remove_var(ENV_PATH);
    let tmp = tempfile::tempdir().unwrap();
    let absent = tmp.path().join("none.toml");
    let args = CliArgs::parse_from([
        "metric-tail",
        "--config",
        absent.to_str().unwrap(),
        "--metric",
        "m",
        "--namespace",
        "n",
        "--fan-out",
        "1",
    ]);
    assert!(matches!(
        AppConfig::from_args(args),
        Err(ConfigError::FanOutTooSmall { got: 1, min: 2 })
    ));
}
