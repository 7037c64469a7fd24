//! Unified error type for subcover.
//!
//! All crates funnel their failures into [`Error`]. Nothing in the core is
//! fatal: callers use [`Error::is_retryable`] to decide between showing a
//! degraded, retryable view and surfacing a user notification.

use std::fmt;

/// Unified error type covering all failure modes in subcover.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "media unit", "profile").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Data failed validation (profile editing, config, CLI input).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record or sidecar query against the backend failed.
    #[error("Query error [{what}]: {message}")]
    Query {
        /// What was being fetched.
        what: String,
        /// Human-readable error description.
        message: String,
    },

    /// A status, blacklist, delete or batch mutation failed.
    #[error("Mutation error [{action}]: {message}")]
    Mutation {
        /// The mutation that failed.
        action: String,
        /// Human-readable error description.
        message: String,
    },

    /// The push channel could not be read.
    #[error("Channel error: {0}")]
    Channel(String),

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query { .. } | Error::Channel(_) | Error::Io { .. } => true,
            Error::Http { status, .. } => *status >= 500 || *status == 429,
            Error::NotFound { .. }
            | Error::Validation(_)
            | Error::Mutation { .. }
            | Error::Internal(_) => false,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Query`].
    pub fn query(what: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Query {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Mutation`].
    pub fn mutation(action: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Mutation {
            action: action.into(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Http`].
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
