//! Crate-wide error types.
//!
//! Each layer gets its own `thiserror` enum; `ControllerError` is the single
//! union surfaced to `Delegate::on_error_occurred` and is built from the
//! lower-level errors via `From` so internal code can use `?`.

use thiserror::Error;

use crate::auth::AuthErrorCode;

/// Transport-level failure taxonomy, mapped verbatim from the underlying
/// channel's disconnect code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("connection timed out")]
    Timeout,
    #[error("connection reset by peer")]
    Reset,
    #[error("connection refused")]
    Refused,
    #[error("network error: {0}")]
    Other(String),
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => NetworkError::Timeout,
            std::io::ErrorKind::ConnectionReset => NetworkError::Reset,
            std::io::ErrorKind::ConnectionRefused => NetworkError::Refused,
            other => NetworkError::Other(other.to_string()),
        }
    }
}

/// Errors produced by the message codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("message truncated")]
    Truncated,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Router-originated error codes, as sent in a `ConnectionOffer`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RouterErrorCode {
    #[error("peer not found")]
    PeerNotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("key pool empty")]
    KeyPoolEmpty,
    #[error("relay error")]
    RelayError,
    #[error("unknown router error")]
    Unknown,
}

/// The three-kind error union surfaced to the controller's delegate.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthErrorCode),
    #[error("router error: {0}")]
    Router(#[from] RouterErrorCode),
}
