// src/backend/mock.rs
//! In-memory backend for tests and offline demos.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;

use super::RemoteQueryService;
use crate::error::BackendError;
use crate::query::{RawDatapoint, StatisticQuery, TimeWindow};

/// Serves a fixed set of datapoints, filtered to each query's window.
///
/// Failures can be scripted per window, by window length, or globally.
/// Every call's window is recorded in `calls`.
pub struct MockBackend {
    datapoints: Vec<RawDatapoint>,
    reject_longer_than: Option<TimeDelta>,
    failing: Vec<(TimeWindow, BackendError)>,
    transport_down: bool,
    delay: Option<Duration>,
    slow: Vec<(TimeWindow, Duration)>,
    pub calls: Mutex<Vec<TimeWindow>>,
}

impl MockBackend {
    pub fn new(datapoints: Vec<RawDatapoint>) -> Self {
        Self {
            datapoints,
            reject_longer_than: None,
            failing: Vec::new(),
            transport_down: false,
            delay: None,
            slow: Vec::new(),
            calls: Mutex::new(vec![]),
        }
    }

    /// Reject any window strictly longer than `max`, like a backend that caps
    /// the number of datapoints per response.
    pub fn reject_longer_than(mut self, max: TimeDelta) -> Self {
        self.reject_longer_than = Some(max);
        self
    }

    pub fn fail_window(mut self, window: TimeWindow, err: BackendError) -> Self {
        self.failing.push((window, err));
        self
    }

    pub fn transport_down(mut self) -> Self {
        self.transport_down = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only calls for `window`, overriding `with_delay` for it.
    pub fn slow_window(mut self, window: TimeWindow, delay: Duration) -> Self {
        self.slow.push((window, delay));
        self
    }

    pub fn recorded_calls(&self) -> Vec<TimeWindow> {
        self.calls.lock().expect("mock calls mutex poisoned").clone()
    }
}

#[async_trait]
impl RemoteQueryService for MockBackend {
    async fn get_statistics(
        &self,
        query: &StatisticQuery,
    ) -> Result<Vec<RawDatapoint>, BackendError> {
        let window = query.window;
        self.calls
            .lock()
            .expect("mock calls mutex poisoned")
            .push(window);

        let delay = self
            .slow
            .iter()
            .find(|(w, _)| *w == window)
            .map(|(_, d)| *d)
            .or(self.delay);
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.transport_down {
            return Err(BackendError::Transport("connection refused".into()));
        }
        if let Some((_, err)) = self.failing.iter().find(|(w, _)| *w == window) {
            return Err(err.clone());
        }
        if let Some(max) = self.reject_longer_than {
            if window.duration() > max {
                return Err(BackendError::Rejected(format!(
                    "InvalidParameterCombination: window of {}m exceeds {}m",
                    window.total_minutes(),
                    max.num_minutes()
                )));
            }
        }

        Ok(self
            .datapoints
            .iter()
            .filter(|dp| window.contains(dp.timestamp))
            .copied()
            .collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
