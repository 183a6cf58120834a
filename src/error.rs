//! Error types for feed-mirror
//!
//! Errors fall into the classes the sync driver cares about:
//! - Item-level failures (one asset, one post body) that are logged and skipped
//! - Structural decode failures that make the whole run meaningless
//! - Precondition violations (programming errors, never retried)

use thiserror::Error;

/// Result type alias for feed-mirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for feed-mirror
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "sync.max_concurrent_assets")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Transport-level failure talking to the remote platform or an asset host
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// HTTP status code returned by the remote
        status: u16,
        /// The requested URL
        url: String,
    },

    /// A listing or detail response could not be decoded
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The URL whose response body was malformed
        url: String,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Asset storage backend failure (stat, put or get)
    #[error("storage error: {message}")]
    Storage {
        /// What failed and for which key
        message: String,
        /// Whether the backend reported a condition that may clear on retry
        /// (timeout, dispatch failure, throttling, 5xx)
        transient: bool,
    },

    /// An asset URL that no stable file name can be derived from
    #[error("invalid asset URL: {0}")]
    InvalidAssetUrl(String),

    /// An operation was called out of order (e.g. next page before the first page)
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Serialization error while persisting
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Storage failure that retrying will not fix
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
            transient: false,
        }
    }

    /// Storage failure that may succeed on a later attempt
    pub fn transient_storage(message: impl Into<String>) -> Self {
        Error::Storage {
            message: message.into(),
            transient: true,
        }
    }

    /// Whether this error invalidates the whole sync run.
    ///
    /// Run-fatal errors escalate to the outermost catch; everything else is
    /// isolated to the asset or post that produced it.
    pub fn is_fatal_for_run(&self) -> bool {
        match self {
            Error::Decode { .. }
            | Error::Precondition(_)
            | Error::Config { .. }
            | Error::Database(_)
            | Error::Sqlx(_)
            | Error::Serialization(_) => true,
            Error::Network(_)
            | Error::HttpStatus { .. }
            | Error::Io(_)
            | Error::Storage { .. }
            | Error::InvalidAssetUrl(_)
            | Error::Other(_) => false,
        }
    }
}
