//! Error handling primitives shared across the core.
//!
//! Every fallible operation returns [`MaintResult`]. The HTTP layer maps the
//! [`ErrorCode`] to a status and a generic body; the message stays in the logs.

/// Stable error codes, also emitted as the `code` field of log events.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// No feature data exists for the requested equipment.
    NotFound = 1,
    /// Input failed validation.
    InvalidInput = 2,
    /// Feature store, history or alert I/O failed; retrying may succeed.
    TransientIo = 3,
    /// The prediction call itself failed.
    ModelError = 4,
    /// Catch-all for bugs and unexpected states.
    Internal = 5,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::TransientIo => "transient_io",
            ErrorCode::ModelError => "model_error",
            ErrorCode::Internal => "internal",
        }
    }
}

/// Canonical error type for the core.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{}: {}", .code.as_str(), .msg)]
pub struct MaintError {
    /// Machine parsable error code.
    pub code: ErrorCode,
    /// Developer facing message.
    pub msg: String,
}

/// Result alias used throughout the crate.
pub type MaintResult<T> = Result<T, MaintError>;

impl MaintError {
    /// Create a new error with the provided code and message.
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }

    /// Missing data helper.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, what)
    }

    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    /// Transient I/O helper.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransientIo, msg)
    }

    /// Model failure helper.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ModelError, msg)
    }

    /// Internal error helper.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Wrap an I/O error with the operation that produced it.
    pub fn io(op: &str, err: std::io::Error) -> Self {
        Self::transient(format!("{op}: {err}"))
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }
}
