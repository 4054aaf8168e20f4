// src/backend/cloudwatch.rs
//! AWS CloudWatch `GetMetricStatistics` adapter.

use async_trait::async_trait;
use aws_sdk_cloudwatch::config::Region;
use aws_sdk_cloudwatch::error::{DisplayErrorContext, SdkError};
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::Statistic as CwStatistic;
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};

use super::RemoteQueryService;
use crate::error::BackendError;
use crate::query::{RawDatapoint, Statistic, StatisticQuery};

pub const DEFAULT_REGION: &str = "us-east-1";

pub struct CloudWatchBackend {
    client: Client,
}

impl CloudWatchBackend {
    /// Build a client from the shared AWS config (env, profile, IMDS) pinned
    /// to `region`.
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        tracing::debug!(target: "backend", region, "cloudwatch client ready");
        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl RemoteQueryService for CloudWatchBackend {
    async fn get_statistics(
        &self,
        query: &StatisticQuery,
    ) -> Result<Vec<RawDatapoint>, BackendError> {
        let statistic = match query.statistic {
            Statistic::SampleCount => CwStatistic::SampleCount,
        };
        let output = self
            .client
            .get_metric_statistics()
            .metric_name(&query.metric_name)
            .namespace(&query.namespace)
            .start_time(to_aws(query.window.start))
            .end_time(to_aws(query.window.end))
            .period(query.period_seconds as i32)
            .statistics(statistic)
            .send()
            .await
            .map_err(classify)?;

        let mut skipped = 0usize;
        let points: Vec<RawDatapoint> = output
            .datapoints()
            .iter()
            .filter_map(|dp| {
                let point = dp
                    .timestamp()
                    .and_then(from_aws)
                    .zip(dp.sample_count())
                    .map(|(ts, count)| RawDatapoint::new(ts, count));
                if point.is_none() {
                    skipped += 1;
                }
                point
            })
            .collect();

        if skipped > 0 {
            tracing::debug!(target: "backend", skipped, "datapoints without timestamp or sample count");
        }
        Ok(points)
    }

    fn name(&self) -> &'static str {
        "cloudwatch"
    }
}

/// Service and response errors mean CloudWatch itself refused the call;
/// everything else happened before a usable answer arrived.
fn classify<E, R>(err: SdkError<E, R>) -> BackendError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let msg = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ServiceError(_) | SdkError::ResponseError(_) => BackendError::Rejected(msg),
        _ => BackendError::Transport(msg),
    }
}

fn to_aws(t: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_millis(t.timestamp_millis())
}

fn from_aws(t: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.secs(), t.subsec_nanos())
}
