// src/error.rs
//! Error kinds for the retrieval pipeline.
//!
//! `BackendError` is the classified failure of a single remote call. Only the
//! `Rejected` variant lets the fetcher recover by splitting the window.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The monitoring service answered but refused or errored the query.
    #[error("backend rejected query: {0}")]
    Rejected(String),
    /// Local or network-layer failure; never split, always surfaced.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Rejected(_))
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot fetch terminal size: {0}")]
    TerminalSize(#[source] std::io::Error),
    #[error("writing chart failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("renderer failed: {0}")]
    Other(String),
}

/// Failure that ends a tailing session.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] BackendError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse lookback {input:?}: {reason}")]
    InvalidLookback { input: String, reason: String },
    #[error("lookback must not be zero")]
    ZeroLookback,
    #[error("missing required setting `{0}` (pass --{0} or set it in the config file)")]
    Missing(&'static str),
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("fan_out must be at least {min} to split a rejected query, got {got}")]
    FanOutTooSmall { got: usize, min: usize },
    #[error("reading config from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file: {0}")]
    Toml(#[from] toml::de::Error),
}
