// src/backend/mod.rs
pub mod cloudwatch;
pub mod mock;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::query::{RawDatapoint, StatisticQuery};

pub use mock::MockBackend;

/// A monitoring service that can answer one statistics query.
///
/// Datapoints come back in no particular order and empty buckets may be
/// omitted entirely.
#[async_trait]
pub trait RemoteQueryService: Send + Sync {
    async fn get_statistics(
        &self,
        query: &StatisticQuery,
    ) -> Result<Vec<RawDatapoint>, BackendError>;

    fn name(&self) -> &'static str;
}
