// src/query.rs
//! Query data model: half-open time windows, statistic queries and the raw
//! datapoints a backend returns for them.

use chrono::{DateTime, TimeDelta, Utc};

/// Backend aggregation period used everywhere in this tool (one minute).
pub const PERIOD_SECONDS: i64 = 60;

/// Half-open window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Returns `None` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Window ending at `now` and starting `lookback` earlier. `lookback` is
    /// a negative offset; its sign is ignored.
    pub fn lookback_from(now: DateTime<Utc>, lookback: TimeDelta) -> Option<Self> {
        Self::new(now - lookback.abs(), now)
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Whole minutes covered; a partial trailing minute does not count.
    pub fn total_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// Splits into `parts` contiguous windows of `floor(total_minutes / parts)`
    /// minutes each, starting at `start`.
    ///
    /// The last piece is not stretched to `end`; any remainder falls outside
    /// every piece, and no piece ever reaches past `end`. Returns an empty vec
    /// when a piece would be empty.
    pub fn partition(&self, parts: usize) -> Vec<TimeWindow> {
        if parts == 0 {
            return Vec::new();
        }
        let step_minutes = self.total_minutes() / parts as i64;
        if step_minutes <= 0 {
            return Vec::new();
        }
        let step = TimeDelta::minutes(step_minutes);
        (0..parts as i32)
            .map(|i| TimeWindow {
                start: self.start + step * i,
                end: self.start + step * (i + 1),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    SampleCount,
}

/// One `GetMetricStatistics`-style request. Immutable once issued; sub-queries
/// are derived with [`StatisticQuery::with_window`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticQuery {
    pub metric_name: String,
    pub namespace: String,
    pub window: TimeWindow,
    pub period_seconds: i64,
    pub statistic: Statistic,
}

impl StatisticQuery {
    pub fn sample_count(
        metric_name: impl Into<String>,
        namespace: impl Into<String>,
        window: TimeWindow,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            namespace: namespace.into(),
            window,
            period_seconds: PERIOD_SECONDS,
            statistic: Statistic::SampleCount,
        }
    }

    pub fn with_window(&self, window: TimeWindow) -> Self {
        Self {
            window,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDatapoint {
    pub timestamp: DateTime<Utc>,
    pub sample_count: f64,
}

impl RawDatapoint {
    pub fn new(timestamp: DateTime<Utc>, sample_count: f64) -> Self {
        Self {
            timestamp,
            sample_count,
        }
    }
}
