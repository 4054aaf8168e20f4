// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod backend;
pub mod config;
pub mod error;
pub mod fetch;
pub mod query;
pub mod render;
pub mod series;
pub mod tail;

// ---- Re-exports for stable public API ----
pub use crate::backend::{MockBackend, RemoteQueryService};
pub use crate::config::AppConfig;
pub use crate::error::{BackendError, ConfigError, RenderError, TailError};
pub use crate::fetch::SplittingFetcher;
pub use crate::query::{RawDatapoint, Statistic, StatisticQuery, TimeWindow};
pub use crate::series::DenseSeries;
pub use crate::tail::{TailMode, WindowAdvancer};
