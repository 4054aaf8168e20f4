// src/fetch.rs
//! SplittingFetcher: one query, and on a backend rejection a single level of
//! concurrent sub-queries over equal slices of the window.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::backend::RemoteQueryService;
use crate::error::BackendError;
use crate::query::{RawDatapoint, StatisticQuery};

pub const DEFAULT_FAN_OUT: usize = 2;
pub const MIN_FAN_OUT: usize = 2;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_queries_total", "Backend calls issued, sub-queries included.");
        describe_counter!("fetch_splits_total", "Queries split after a backend rejection.");
        describe_counter!(
            "fetch_subqueries_dropped_total",
            "Sub-queries whose datapoints were lost to a failure."
        );
    });
}

pub struct SplittingFetcher<B> {
    backend: Arc<B>,
    fan_out: usize,
    timeout: Duration,
}

impl<B> Clone for SplittingFetcher<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            fan_out: self.fan_out,
            timeout: self.timeout,
        }
    }
}

impl<B> SplittingFetcher<B>
where
    B: RemoteQueryService + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            fan_out: DEFAULT_FAN_OUT,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Pieces per rejected window; anything below two would never split.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(MIN_FAN_OUT);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the raw datapoints for `query`.
    ///
    /// A rejected query is not retried as-is; its window is partitioned and the
    /// pieces are queried concurrently, each exactly once. Pieces that fail are
    /// dropped, and a rejected window too short to partition yields no
    /// datapoints. Only transport failures of the original call are returned.
    pub async fn fetch(&self, query: &StatisticQuery) -> Result<Vec<RawDatapoint>, BackendError> {
        ensure_metrics_described();

        let err = match call(self.backend.as_ref(), query, self.timeout).await {
            Ok(points) => return Ok(points),
            Err(e) if e.is_rejection() => e,
            Err(e) => return Err(e),
        };

        let pieces = query.window.partition(self.fan_out);
        if pieces.is_empty() {
            counter!("fetch_subqueries_dropped_total").increment(1);
            tracing::warn!(
                target: "fetch",
                start = %query.window.start,
                end = %query.window.end,
                fan_out = self.fan_out,
                error = %err,
                "rejected window too small to split, dropping its datapoints"
            );
            return Ok(Vec::new());
        }

        counter!("fetch_splits_total").increment(1);
        let covered = pieces.last().map(|w| w.end).unwrap_or(query.window.end);
        let dropped_minutes = (query.window.end - covered).num_minutes();
        tracing::info!(
            target: "fetch",
            metric = %query.metric_name,
            minutes = query.window.total_minutes(),
            pieces = pieces.len(),
            error = %err,
            "backend rejected query, splitting"
        );
        if dropped_minutes > 0 {
            tracing::debug!(target: "fetch", dropped_minutes, "uneven split leaves tail uncovered");
        }

        let mut set = JoinSet::new();
        for window in pieces {
            let backend = Arc::clone(&self.backend);
            let sub = query.with_window(window);
            let timeout = self.timeout;
            set.spawn(async move {
                let res = call(backend.as_ref(), &sub, timeout).await;
                (sub.window, res)
            });
        }

        // Completion order; the series builder sorts afterwards.
        let mut merged = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(mut points))) => merged.append(&mut points),
                Ok((window, Err(e))) => {
                    counter!("fetch_subqueries_dropped_total").increment(1);
                    tracing::warn!(
                        target: "fetch",
                        start = %window.start,
                        end = %window.end,
                        error = %e,
                        "sub-query failed, dropping its datapoints"
                    );
                }
                Err(e) => {
                    counter!("fetch_subqueries_dropped_total").increment(1);
                    tracing::warn!(target: "fetch", error = ?e, "sub-query task aborted");
                }
            }
        }
        Ok(merged)
    }
}

async fn call<B>(
    backend: &B,
    query: &StatisticQuery,
    timeout: Duration,
) -> Result<Vec<RawDatapoint>, BackendError>
where
    B: RemoteQueryService + ?Sized,
{
    counter!("fetch_queries_total").increment(1);
    match tokio::time::timeout(timeout, backend.get_statistics(query)).await {
        Ok(res) => res,
        Err(_) => Err(BackendError::Transport(format!(
            "{} query timed out after {:?}",
            backend.name(),
            timeout
        ))),
    }
}
