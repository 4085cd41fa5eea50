//! Shared error types for the evidence store and analysis stages.
//!
//! Errors fall into a few groups:
//!
//! - **Configuration**: malformed run ids, invalid id prefixes or category
//!   names. These are integration mistakes and are surfaced immediately.
//! - **Not found**: a requested run does not exist on disk.
//! - **Validation**: a record failed its construction-time checks and was
//!   never written.
//! - **I/O and serialization**: propagated from the file system or serde.
//!
//! Missing evidence is never an error; readers and analyzers resolve it to
//! empty collections.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for riskledger operations
#[derive(Debug, Error)]
pub enum Error {
    /// Run id does not have the `YYYYMMDD_HHMMSSZ[_NN]` shape
    #[error("Invalid run id '{0}': expected YYYYMMDD_HHMMSSZ with optional _NN suffix")]
    InvalidRunId(String),

    /// Evidence id prefix is empty or not alphabetic
    #[error("Invalid evidence id prefix '{0}': prefix must be a non-empty alphabetic token")]
    InvalidPrefix(String),

    /// Sequence counter for a prefix cannot advance any further
    #[error("Evidence id sequence exhausted for prefix '{0}'")]
    IdsExhausted(String),

    /// Category name cannot be used as a stream file name
    #[error("Invalid evidence category '{0}': use letters, digits, '_' or '-'")]
    InvalidCategory(String),

    /// Requested run is absent from the runs root
    #[error("Run not found: {run} (looked in {})", path.display())]
    RunNotFound { run: String, path: PathBuf },

    /// Record failed construction-time validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a file system error with path context
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }

    /// True for errors caused by caller or integration mistakes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRunId(_)
                | Self::InvalidPrefix(_)
                | Self::IdsExhausted(_)
                | Self::InvalidCategory(_)
        )
    }

    /// True when the error means "the requested run does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RunNotFound { .. })
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

/// Attach a path to an `std::io::Error` while converting it.
pub(crate) trait IoResultExt<T> {
    fn with_path(self, message: &str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, message: &str, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| Error::file_system(message, path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_classified() {
        assert!(Error::InvalidRunId("x".into()).is_configuration());
        assert!(Error::InvalidPrefix("".into()).is_configuration());
        assert!(Error::IdsExhausted("RSK".into()).is_configuration());
        assert!(!Error::validation("score").is_configuration());
    }

    #[test]
    fn run_not_found_mentions_run_and_path() {
        let err = Error::RunNotFound {
            run: "20250101_000000Z".into(),
            path: PathBuf::from("/tmp/runs/20250101_000000Z"),
        };
        assert!(err.is_not_found());
        let msg = err.to_string();
        assert!(msg.contains("20250101_000000Z"));
        assert!(msg.contains("/tmp/runs"));
    }

    #[test]
    fn context_wraps_message() {
        let result: Result<()> = Err(Error::validation("score out of range"));
        let err = result.context("writing risks").unwrap_err();
        assert_eq!(
            err.to_string(),
            "writing risks: Validation error: score out of range"
        );
    }
}
