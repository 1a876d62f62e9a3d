//! Typed error hierarchy for the taskpilot pipeline.
//!
//! Only `Configuration` is fatal to a whole run. Every other variant is
//! caught at the task boundary and turned into a failed `PipelineResult`.
//! A failing test suite is not an error at all: it is a `TestOutcome` with
//! `success == false`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error ({key}): {message}")]
    Configuration { key: String, message: String },

    #[error("Git {operation} failed: {message}")]
    GitOperation { operation: String, message: String },

    #[error("Coding agent exited with code {exit_code}{}", detail_suffix(.stderr))]
    DelegatedExecution { exit_code: i32, stderr: String },

    #[error("Review request creation failed: {0}")]
    Publish(String),

    #[error("Status synchronization failed: {0}")]
    Sync(String),

    #[error("Issue tracker error: {0}")]
    Tracker(String),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {}", detail)
    }
}

impl PipelineError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must stop the run before (or instead of) processing tasks.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}
