//! Error type shared by the library.
//!
//! Every failure is recoverable by the user retrying; the controller turns
//! these into free-text notices instead of propagating them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SalesError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("{0}")]
    Auth(String),

    #[error("sale {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("backend is not configured")]
    NotConfigured,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

impl SalesError {
    /// Authentication failures block the sales views until resolved.
    /// A 403 is a row-level-security refusal for a valid session, not one.
    pub fn is_auth(&self) -> bool {
        match self {
            SalesError::Auth(_) => true,
            SalesError::Backend { status, .. } => *status == 401,
            _ => false,
        }
    }
}

impl From<keyring::Error> for SalesError {
    fn from(err: keyring::Error) -> Self {
        SalesError::Credential(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SalesError>;
