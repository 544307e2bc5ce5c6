//! Typed errors for the discovery pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! fatal run error from a per-item failure by type alone.

use thiserror::Error;

use crate::pagination::StrategyId;

/// Errors that abort a whole pipeline run.
///
/// Per-item failures never surface here; they are recorded on the
/// individual [`CompleteItem`](crate::types::item::CompleteItem).
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The page session could not hand out a listing page
    #[error("session setup failed: {0}")]
    SessionSetup(#[source] PageError),

    /// The listing page could not be waited on or read
    #[error("listing page {page} could not be read: {source}")]
    Listing {
        page: usize,
        #[source]
        source: PageError,
    },

    /// Every advance strategy failed without reaching the last page
    #[error("no advance strategy worked on page {page} ({} attempts, {gathered} items gathered)", .failures.len())]
    TraversalExhausted {
        page: usize,
        gathered: usize,
        failures: Vec<StrategyFailure>,
    },

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid pipeline options
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// One failed attempt at advancing the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: StrategyId,
    pub reason: String,
}

/// Errors raised by a page collaborator.
#[derive(Debug, Error)]
pub enum PageError {
    /// A readiness wait ran out of time
    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    /// An element or listing could not be found
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Clicking, typing or scrolling failed
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// The page was already closed
    #[error("page closed")]
    Closed,

    /// Anything else the driver reported
    #[error("page error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors raised by a classifier collaborator.
///
/// The pipeline treats every variant as "no answer" and keeps the items
/// it was asked about.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier is not reachable at all
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// The classifier replied with nothing usable
    #[error("classifier returned an empty answer")]
    EmptyAnswer,

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error: {0}")]
    Api(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),
}

/// Invalid options or environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("target profile description is too long ({len} characters, max {max})")]
    ProfileTooLong { len: usize, max: usize },

    #[error("target profile description is empty")]
    EmptyProfile,

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("at least one advance strategy is required")]
    NoStrategies,

    #[error("max pages must be at least 1 when set")]
    InvalidPageCap,

    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: String, reason: String },
}

/// Result type alias for pipeline operations.
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for page collaborator calls.
pub type PageResult<T> = std::result::Result<T, PageError>;

/// Result type alias for classifier calls.
pub type ClassifierResult<T> = std::result::Result<T, ClassifierError>;

/// Result type alias for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
