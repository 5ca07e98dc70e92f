// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RexError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Task '{0}' cannot depend on itself")]
    SelfDependency(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cycle detected: {0}")]
    Cycle(String),

    #[error("Concurrent update: {0}")]
    ConcurrentUpdate(String),

    #[error("Task not found: {0}")]
    TaskMissing(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid mode change for task '{task}': {from} -> {to}")]
    InvalidModeChange {
        task: String,
        from: crate::types::Mode,
        to: crate::types::Mode,
    },

    #[error("Remote invocation failed: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RexError {
    /// Only optimistic-concurrency failures are worth replaying from the
    /// original read. Everything else would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RexError::ConcurrentUpdate(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RexError>;
