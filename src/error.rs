//! Error types shared by the HTTP helper, provider lookups and aggregators.

use std::fmt;
use thiserror::Error;

/// Failure of a single remote call or of decoding its response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("cannot connect to {url}")]
    Connect { url: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("lookup canceled")]
    Canceled,

    #[error("lookup aborted: {0}")]
    Aborted(String),
}

/// What a failed lookup reports: the stage that broke plus the cause.
#[derive(Debug)]
pub struct LookupFailure {
    pub stage: String,
    pub source: FetchError,
}

impl LookupFailure {
    pub fn new(stage: impl Into<String>, source: FetchError) -> Self {
        Self {
            stage: stage.into(),
            source,
        }
    }

    /// Terminal failure emitted for lookups stopped by a cancellation.
    pub fn canceled() -> Self {
        Self::new("canceled before completion", FetchError::Canceled)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.source, FetchError::Canceled)
    }
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.source)
    }
}

impl std::error::Error for LookupFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Attach a stage label to any fallible step of a lookup.
pub trait StageExt<T> {
    fn stage(self, stage: &str) -> Result<T, LookupFailure>;
}

impl<T, E> StageExt<T> for Result<T, E>
where
    E: Into<FetchError>,
{
    fn stage(self, stage: &str) -> Result<T, LookupFailure> {
        self.map_err(|e| LookupFailure::new(stage, e.into()))
    }
}

/// Aggregation-level failures. Per-provider failures never show up here.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("failed to build HTTP client: {0}")]
    Setup(#[source] reqwest::Error),

    #[error("result channel closed after {received} of {expected} reports")]
    ChannelClosed { expected: usize, received: usize },
}
