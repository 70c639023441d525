//! hfanout error types.
//!
//! Two layers:
//!
//! - [`TransferError`] — per-request outcome, delivered through
//!   `HttpClientCallbacks::on_done`. Recoverable at the application layer
//!   (resubmit the request).
//! - [`ClientError`] — fatal engine-level errors. These indicate invariant
//!   violations (engine/reactor desync, malformed peer data, misconfiguration)
//!   and terminate the engine instance rather than a single request.

use std::fmt;

/// Client-visible outcome of one transfer.
///
/// Every engine-native result code maps to exactly one of these kinds;
/// codes outside the known set resolve to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// Transfer completed successfully.
    None,
    /// The transfer exceeded its declared timeout.
    Timeout,
    /// Host name resolution failed.
    HostNotFound,
    /// TCP/TLS connection could not be established.
    CouldNotConnect,
    /// Sending request data failed.
    SendError,
    /// Receiving response data failed.
    RecvError,
    /// Catch-all for engine codes outside the known set.
    Unknown,
}

impl TransferError {
    /// True for the success value.
    pub fn is_none(&self) -> bool {
        matches!(self, TransferError::None)
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "no error"),
            Self::Timeout => write!(f, "request timed out"),
            Self::HostNotFound => write!(f, "host not found"),
            Self::CouldNotConnect => write!(f, "could not connect"),
            Self::SendError => write!(f, "send error"),
            Self::RecvError => write!(f, "receive error"),
            Self::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Fatal engine-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A nonzero `queue_size` was configured; bounded-queue semantics are
    /// not implemented and are rejected at construction.
    QueueSizeUnsupported,
    /// Parallelism must be at least 1.
    InvalidParallelism(usize),
    /// OS error with errno.
    Os(i32),
    /// The transfer engine returned a control code outside the accepted set;
    /// engine and reactor state can no longer be trusted.
    EngineDesync(i32),
    /// The engine reported a completion for a slot with no bound request.
    UnknownTransfer(usize),
    /// The remote peer sent a status line missing its space-delimited tokens.
    MalformedStatusLine,
    /// The engine requested a timeout value below -1.
    UnhandledTimeout(i64),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueSizeUnsupported => {
                write!(f, "'queue_size' semantics not implemented")
            }
            Self::InvalidParallelism(n) => {
                write!(f, "invalid parallelism: {}", n)
            }
            Self::Os(e) => write!(f, "OS error: errno {}", e),
            Self::EngineDesync(c) => {
                write!(f, "transfer engine control code {} out of accepted set", c)
            }
            Self::UnknownTransfer(idx) => {
                write!(f, "completion for unbound slot {}", idx)
            }
            Self::MalformedStatusLine => write!(f, "malformed status line"),
            Self::UnhandledTimeout(ms) => {
                write!(f, "unhandled timeout value: {}", ms)
            }
        }
    }
}

impl std::error::Error for ClientError {}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_display() {
        assert_eq!(format!("{}", TransferError::None), "no error");
        assert_eq!(format!("{}", TransferError::HostNotFound), "host not found");
        assert!(TransferError::None.is_none());
        assert!(!TransferError::Timeout.is_none());
    }

    #[test]
    fn test_client_error_display() {
        assert_eq!(
            format!("{}", ClientError::QueueSizeUnsupported),
            "'queue_size' semantics not implemented"
        );
        assert_eq!(format!("{}", ClientError::Os(11)), "OS error: errno 11");
        assert_eq!(
            format!("{}", ClientError::UnhandledTimeout(-5)),
            "unhandled timeout value: -5"
        );
    }
}
