// src/series.rs
//! # Dense series
//! Turns an unordered, sparse set of datapoints into a per-minute sequence
//! with zeros where the backend reported nothing, and rolls that sequence
//! forward while tailing.

use chrono::{DateTime, TimeDelta, Utc};

use crate::query::{RawDatapoint, PERIOD_SECONDS};

/// Per-period values; `values[i]` belongs to `anchor + i` periods.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseSeries {
    anchor: DateTime<Utc>,
    period: TimeDelta,
    values: Vec<f64>,
}

impl DenseSeries {
    pub fn empty(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            period: TimeDelta::seconds(PERIOD_SECONDS),
            values: Vec::new(),
        }
    }

    pub fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Roll the window forward by `newer`: evict `newer.len()` entries from the
    /// front and append `newer` at the back.
    ///
    /// Length stays constant unless `newer` is longer than `self`, in which
    /// case everything old is evicted and the result is exactly `newer`.
    pub fn advance(&mut self, newer: DenseSeries) {
        if newer.len() >= self.values.len() {
            *self = newer;
            return;
        }
        let evict = newer.len();
        self.values.drain(..evict);
        self.values.extend(newer.values);
        self.anchor += self.period * evict as i32;
    }
}

/// Sort `datapoints` by time and zero-fill the gaps, starting from
/// `window_start`.
///
/// Each point lands on the slot `round((ts - window_start) / period)`, with
/// zeros appended to reach it, so backend jitter of up to half a period stays
/// on the same bucket and never accumulates. Points whose slot is already
/// filled are appended as-is. Nothing is padded after the last datapoint, and
/// an empty input gives an empty series.
pub fn build(mut datapoints: Vec<RawDatapoint>, window_start: DateTime<Utc>) -> DenseSeries {
    build_with_period(&mut datapoints, window_start, TimeDelta::seconds(PERIOD_SECONDS))
}

pub fn build_with_period(
    datapoints: &mut [RawDatapoint],
    window_start: DateTime<Utc>,
    period: TimeDelta,
) -> DenseSeries {
    datapoints.sort_unstable_by_key(|dp| dp.timestamp);

    let period_ms = period.num_milliseconds().max(1) as f64;
    let mut values = Vec::with_capacity(datapoints.len());
    for dp in datapoints.iter() {
        let slot = ((dp.timestamp - window_start).num_milliseconds() as f64 / period_ms).round();
        let gap = slot - values.len() as f64;
        if gap > 0.0 {
            values.resize(values.len() + gap as usize, 0.0);
        }
        values.push(dp.sample_count);
    }

    DenseSeries {
        anchor: window_start,
        period,
        values,
    }
}
