//! Error types for teamdeck
//!
//! Status codes surfaced to the transport layer:
//! - 400: Bad request (invalid field value, order out of range, owner removal)
//! - 403: Forbidden (role does not permit the mutation)
//! - 404: Not found (missing entity, or owner-scoped lookup miss)
//! - 409: Conflict (duplicate member, dangling tag/category reference)
//! - 422: Capacity ceiling reached
//! - 500: Internal (aborted multi-document transaction, storage failure)

use thiserror::Error;

/// Status codes reported alongside errors
pub mod status {
    pub const BAD_REQUEST: u16 = 400;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const CAPACITY: u16 = 422;
    pub const INTERNAL: u16 = 500;
}

/// Main error type for teamdeck operations
#[derive(Error, Debug)]
pub enum Error {
    // Bad requests (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid order {requested} for a list of {len} items")]
    InvalidOrder { requested: usize, len: usize },

    // Permission failures (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Missing entities (404). Owner-scoped lookups deliberately conflate
    // "does not exist" and "not yours" so existence is never leaked.
    #[error("Not found: {0}")]
    NotFound(String),

    // Reference conflicts (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    // Capacity ceilings (422)
    #[error("Capacity exceeded: at most {max} {what} allowed")]
    CapacityExceeded { what: &'static str, max: usize },

    // Internal failures (500)
    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Get the status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) | Error::InvalidOrder { .. } => status::BAD_REQUEST,

            Error::Forbidden(_) => status::FORBIDDEN,

            Error::NotFound(_) => status::NOT_FOUND,

            Error::Conflict(_) => status::CONFLICT,

            Error::CapacityExceeded { .. } => status::CAPACITY,

            Error::TransactionAborted(_)
            | Error::InvalidConfig(_)
            | Error::LockFailed(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_) => status::INTERNAL,
        }
    }

    /// Stable machine-readable kind for envelopes and logs
    pub fn kind(&self) -> &'static str {
        match self.status_code() {
            status::BAD_REQUEST => "bad_request",
            status::FORBIDDEN => "forbidden",
            status::NOT_FOUND => "not_found",
            status::CONFLICT => "conflict",
            status::CAPACITY => "capacity_exceeded",
            _ => "internal",
        }
    }
}

/// Result type alias for teamdeck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub status: u16,
    pub kind: &'static str,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            status: err.status_code(),
            kind: err.kind(),
        }
    }
}
