// src/config/lookback.rs
//! Lookback durations in Go's `time.ParseDuration` syntax (`-12h`, `1h30m`,
//! `1.5h`, `250ms`), which is what users of this tool have always typed.

use chrono::TimeDelta;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::ConfigError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn whole_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"^[-+]?(?:(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:ns|us|µs|μs|ms|s|m|h))+$")
            .expect("static regex")
    })
}

fn part_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"([0-9]+\.?[0-9]*|\.[0-9]+)(ns|us|µs|μs|ms|s|m|h)").expect("static regex")
    })
}

fn unit_nanos(unit: &str) -> f64 {
    match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        _ => 3600e9,
    }
}

/// Parse a Go-style duration string.
pub fn parse_go_duration(input: &str) -> Result<TimeDelta, String> {
    let s = input.trim();
    if matches!(s, "0" | "-0" | "+0") {
        return Ok(TimeDelta::zero());
    }
    if s.is_empty() || !whole_re().is_match(s) {
        return Err("expected a number followed by a unit (ns, us, ms, s, m, h)".into());
    }

    let negative = s.starts_with('-');
    let mut nanos = 0f64;
    for cap in part_re().captures_iter(s) {
        let value: f64 = cap[1]
            .parse()
            .map_err(|_| format!("invalid number {:?}", &cap[1]))?;
        nanos += value * unit_nanos(&cap[2]);
    }
    if nanos > i64::MAX as f64 {
        return Err("duration out of range".into());
    }
    let nanos = nanos.round() as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

/// Lookbacks are offsets into the past: a value without a leading `-` gets
/// one. Zero is rejected since it leaves no window to query.
pub fn parse_lookback(input: &str) -> Result<TimeDelta, ConfigError> {
    let trimmed = input.trim();
    let signed = if trimmed.starts_with('-') {
        trimmed.to_string()
    } else {
        format!("-{trimmed}")
    };
    let d = parse_go_duration(&signed).map_err(|reason| ConfigError::InvalidLookback {
        input: input.to_string(),
        reason,
    })?;
    if d.is_zero() {
        return Err(ConfigError::ZeroLookback);
    }
    Ok(d)
}

/// Format like Go's `Duration.String()`: `-12h0m0s`, `1m30s`, `250ms`.
pub fn format_go_duration(d: TimeDelta) -> String {
    let Some(total) = d.num_nanoseconds() else {
        // beyond ~292 years; seconds precision is plenty
        return format!("{}s", d.num_seconds());
    };
    if total == 0 {
        return "0s".into();
    }
    let sign = if total < 0 { "-" } else { "" };
    let n = (total as i128).unsigned_abs();

    if n < NANOS_PER_SEC {
        let body = if n < 1_000 {
            format!("{n}ns")
        } else if n < 1_000_000 {
            format!("{}µs", frac(n / 1_000, n % 1_000, 3))
        } else {
            format!("{}ms", frac(n / 1_000_000, n % 1_000_000, 6))
        };
        return format!("{sign}{body}");
    }

    let secs = n / NANOS_PER_SEC;
    let sub = n % NANOS_PER_SEC;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let s = frac(s, sub, 9);
    if h > 0 {
        format!("{sign}{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{sign}{m}m{s}s")
    } else {
        format!("{sign}{s}s")
    }
}

fn frac(whole: u128, rem: u128, digits: usize) -> String {
    if rem == 0 {
        return whole.to_string();
    }
    let digits = format!("{rem:0digits$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}
