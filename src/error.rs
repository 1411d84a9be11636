//! Error types shared by the store, the dispatcher and the workbench.

/// Every failure the core can report. Validation failures never reach the
/// network; network failures and timeouts never reach history.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input: empty URL, malformed headers, unknown method
    #[error("validation error: {0}")]
    Validation(String),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// DNS, refused connection, TLS or body read failure
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Constraint violation or SQLite failure
    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// True for transport failures, timeouts included
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
