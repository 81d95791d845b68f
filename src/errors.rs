//! Monitoring Data-Plane Error Hierarchy
//!
//! Defines the error types for the entity cache and the evaluation engines,
//! categorized by subsystem and operational concern.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache access failures (missing keys, transaction misuse)
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Settings file / environment parsing failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed entity definitions at creation time
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Condition or expression failures during evaluation
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Scheduler lifecycle misuse
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Loader / expression-source collaborator failures
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Cache access errors.
///
/// A missing key is returned to the caller as a value, never logged as an
/// error by the cache itself. Stale updates dropped by the `CacheFlow`
/// policy are not errors at all: `put` reports them as a `false` return.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Requested key absent from the cache
    #[error("Entity {id} not found in {cache} cache")]
    NotFound { cache: &'static str, id: u64 },

    /// A transaction touched a key outside its declared key set
    #[error("Key {id} is outside the transaction's declared key set ({cache} cache)")]
    KeyOutsideTransaction { cache: &'static str, id: u64 },
}

/// Entity construction failures.
///
/// Fatal to that entity's creation: the cache never sees a partial object.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid parameter \"{parameter}\": {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// Per-entity evaluation failures.
///
/// Caught at the entity boundary: one failing alarm or rule is logged and
/// skipped, the surrounding batch or cycle continues.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// Alarm condition failed while evaluating a tag value
    #[error("Condition evaluation failed for alarm {alarm_id}: {reason}")]
    Condition { alarm_id: u64, reason: String },

    /// Compiled expression failed at runtime
    #[error("Expression evaluation failed for rule {rule_id}: {reason}")]
    Expression { rule_id: u64, reason: String },

    /// Expression text could not be compiled
    #[error("Expression compilation failed for rule {rule_id}: {reason}")]
    Compile { rule_id: u64, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error("Scheduler is not running")]
    NotRunning,
}
