// tests/series_gapfill.rs
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use metric_tail::series::{self, DenseSeries};
use metric_tail::RawDatapoint;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn at_secs(secs: i64, count: f64) -> RawDatapoint {
    RawDatapoint::new(t0() + TimeDelta::seconds(secs), count)
}

#[test]
fn five_minute_scenario() {
    let dps = vec![at_secs(4 * 60, 7.0), at_secs(60, 3.0)];
    let s = series::build(dps, t0());
    assert_eq!(s.values(), &[0.0, 3.0, 0.0, 0.0, 7.0]);
}

#[test]
fn nonzero_entries_land_on_cumulative_offsets() {
    let minutes = [2i64, 3, 7, 8, 15];
    let dps: Vec<RawDatapoint> = minutes
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &m)| at_secs(m * 60, (i + 1) as f64))
        .collect();
    let s = series::build(dps, t0());

    assert_eq!(s.len(), 16);
    let nonzero: Vec<usize> = s
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| **v != 0.0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(nonzero, vec![2, 3, 7, 8, 15]);
    // reversed input, so counts descend in time order
    assert_eq!(s.values()[2], 5.0);
    assert_eq!(s.values()[15], 1.0);
}

#[test]
fn empty_input_gives_empty_series() {
    let s = series::build(vec![], t0());
    assert!(s.is_empty());
    assert_eq!(s, DenseSeries::empty(t0()));
}

#[test]
fn jitter_within_twenty_seconds_is_absorbed() {
    let exact = series::build(vec![at_secs(5 * 60, 1.0), at_secs(9 * 60, 2.0)], t0());
    for jitter in [-20i64, 20] {
        let shifted = series::build(
            vec![at_secs(5 * 60 + jitter, 1.0), at_secs(9 * 60 - jitter, 2.0)],
            t0(),
        );
        assert_eq!(shifted.values(), exact.values(), "jitter {jitter}s");
    }
}

#[test]
fn last_point_before_window_end_is_not_padded() {
    let s = series::build(vec![at_secs(2 * 60, 1.0)], t0());
    assert_eq!(s.len(), 3);
}

#[test]
fn rolling_merge_holds_length() {
    let mut held = series::build(
        (0..10).map(|m| at_secs(m * 60, 1.0)).collect(),
        t0(),
    );
    let tick_start = t0() + TimeDelta::minutes(10);
    let newer = series::build(
        vec![RawDatapoint::new(tick_start + TimeDelta::minutes(1), 9.0)],
        tick_start,
    );
    assert_eq!(newer.values(), &[0.0, 9.0]);

    held.advance(newer);
    assert_eq!(held.len(), 10);
    assert_eq!(held.values()[8..], [0.0, 9.0]);
    assert_eq!(held.anchor(), t0() + TimeDelta::minutes(2));
}

#[test]
fn rolling_merge_with_longer_update_keeps_only_new() {
    let mut held = series::build(vec![at_secs(0, 1.0), at_secs(60, 1.0)], t0());
    let later = t0() + TimeDelta::minutes(30);
    let newer = series::build(
        vec![RawDatapoint::new(later + TimeDelta::minutes(2), 4.0)],
        later,
    );
    held.advance(newer);
    assert_eq!(held.values(), &[0.0, 0.0, 4.0]);
    assert_eq!(held.anchor(), later);
}
