//! Error types for Leadline.
//!
//! Library crates use [`LeadlineError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Failures at I/O boundaries that drive a contact's workflow status are
//! reported through [`Attempt`], which separates transient failures from
//! permanent ones so the caller decides between "try again next run" and a
//! terminal status.

use std::path::PathBuf;

use crate::types::ContactStatus;

/// Top-level error type for all Leadline operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadlineError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A secret could not be resolved from the credential provider.
    #[error("credential error: {0}")]
    Credentials(String),

    /// Transport-level network failure (connect, DNS, TLS, body read).
    #[error("network error: {message}")]
    Network { message: String, timeout: bool },

    /// A remote endpoint answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// HTML / JSON / MIME parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Outbound or inbound mail transport error.
    #[error("mail error: {message}")]
    Mail { message: String, transient: bool },

    /// A workflow status change that the state machine does not allow.
    #[error("invalid status transition {from} -> {to}")]
    Transition {
        from: ContactStatus,
        to: ContactStatus,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, missing field, invariant breach).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadlineError>;

impl LeadlineError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Network failure that is not a timeout.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
            timeout: false,
        }
    }

    /// Network timeout.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
            timeout: true,
        }
    }

    /// Non-success HTTP status.
    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Mail transport error; `transient` marks connection-level failures.
    pub fn mail(msg: impl Into<String>, transient: bool) -> Self {
        Self::Mail {
            message: msg.into(),
            transient,
        }
    }

    /// Whether retrying the same operation later could plausibly succeed.
    ///
    /// Timeouts, connection failures, HTTP 429 and 5xx, and transient mail
    /// failures are retryable. Everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Mail { transient, .. } => *transient,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Attempt
// ---------------------------------------------------------------------------

/// Tagged outcome of an operation whose failure kind matters to the caller.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The operation completed (the value may itself be "nothing found").
    Ok(T),
    /// The operation failed in a way that may succeed on a later run.
    Retryable(LeadlineError),
    /// The operation failed and retrying will not help.
    Permanent(LeadlineError),
}

impl<T> Attempt<T> {
    /// Classify a failed operation by [`LeadlineError::is_retryable`].
    pub fn failed(err: LeadlineError) -> Self {
        if err.is_retryable() {
            Self::Retryable(err)
        } else {
            Self::Permanent(err)
        }
    }

    /// Map the success value, keeping failure tags intact.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attempt<U> {
        match self {
            Self::Ok(v) => Attempt::Ok(f(v)),
            Self::Retryable(e) => Attempt::Retryable(e),
            Self::Permanent(e) => Attempt::Permanent(e),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Collapse into a plain `Result`, dropping the retryable/permanent tag.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Retryable(e) | Self::Permanent(e) => Err(e),
        }
    }
}

impl<T> From<Result<T>> for Attempt<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::failed(e),
        }
    }
}
