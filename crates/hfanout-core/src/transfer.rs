//! Transfer-engine boundary.
//!
//! The transfer engine is the external multiplexing HTTP engine
//! (libcurl-analogous) that performs actual wire I/O, TLS, and DNS. The
//! client engine drives it with explicit calls ([`TransferEngine`]) and the
//! engine reports its readiness needs and per-transfer data synchronously
//! through [`EngineHost`] during any drive call.
//!
//! The two native code spaces ([`TransferCode`] per transfer,
//! [`MultiCode`] per control call) are kept as opaque `i32` newtypes with
//! well-known constants, so that any code the engine emits is representable
//! and the client's translation stays total.

use crate::error::Result;
use crate::method::Method;

use std::os::unix::io::RawFd;

/// Opaque per-transfer association between the engine and a connection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(pub usize);

/// Readiness interest the engine requests for one of its sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketInterest {
    pub input: bool,
    pub output: bool,
}

impl SocketInterest {
    pub const NONE: SocketInterest = SocketInterest {
        input: false,
        output: false,
    };

    /// No interest at all means "stop watching this descriptor".
    pub fn is_none(&self) -> bool {
        !self.input && !self.output
    }
}

/// Everything the engine needs to know to run one transfer.
///
/// Built by the connection slot from the bound request plus the engine
/// instance's construction-time toggles.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub url: String,
    pub method: Method,
    /// Request headers, including the synthesized body headers for
    /// non-GET verbs (Content-Length, blank Transfer-Encoding,
    /// Content-Type, blank Expect).
    pub headers: Vec<(String, String)>,
    /// Declared body length (Content-Length / INFILESIZE).
    pub body_len: usize,
    /// PUT: stream the body through `EngineHost::body_read`.
    pub upload: bool,
    /// POST: body passed directly as post fields.
    pub post_fields: Option<Vec<u8>>,
    /// HEAD: suppress response-body retrieval.
    pub no_body: bool,
    pub timeout_secs: Option<u32>,
    /// Receive buffer size hint.
    pub buffer_size: usize,
    /// Verify TLS certificate and host. Disabling is insecure and intended
    /// for testing only.
    pub ssl_verify: bool,
    pub tcp_no_delay: bool,
    pub verbose: bool,
}

/// Engine-native per-transfer result code.
///
/// The constants mirror the curl code space the reference engine uses;
/// any other value is representable and translates to
/// `TransferError::Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCode(pub i32);

impl TransferCode {
    pub const OK: TransferCode = TransferCode(0);
    pub const COULDNT_RESOLVE_HOST: TransferCode = TransferCode(6);
    pub const COULDNT_CONNECT: TransferCode = TransferCode(7);
    pub const OPERATION_TIMEDOUT: TransferCode = TransferCode(28);
    pub const SEND_ERROR: TransferCode = TransferCode(55);
    pub const RECV_ERROR: TransferCode = TransferCode(56);

    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }
}

/// Engine-native control code returned by add/remove/drive calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiCode(pub i32);

impl MultiCode {
    pub const OK: MultiCode = MultiCode(0);
    /// "Call the drive entry point again" — accepted alongside OK for
    /// add/remove, per the reference engine's contract.
    pub const CALL_PERFORM: MultiCode = MultiCode(-1);

    /// Accepted set for transfer registration and removal.
    pub fn is_accepted(&self) -> bool {
        matches!(self.0, 0 | -1)
    }
}

/// Inbound callback surface the engine invokes synchronously during any
/// drive call.
///
/// **Contract:**
/// - `socket_interest` with `is_none()` interest deregisters the descriptor;
///   otherwise it registers (`is_new`) or modifies a known descriptor.
/// - `timer_request(0)` means the engine must be driven again immediately,
///   within the same drive call, before control returns to the event loop.
///   `-1` disarms the timer; values below `-1` are a fatal error.
/// - `header_line` / `body_chunk` / `body_read` address the connection slot
///   bound to `id`; the engine must only use ids it was given at
///   `add_transfer` time.
pub trait EngineHost {
    fn socket_interest(
        &mut self,
        fd: RawFd,
        interest: SocketInterest,
        is_new: bool,
    ) -> Result<()>;

    fn timer_request(&mut self, timeout_ms: i64) -> Result<()>;

    /// One response header line, separator included. Returns the number of
    /// bytes consumed (always the full line on success).
    fn header_line(&mut self, id: TransferId, line: &[u8]) -> Result<usize>;

    /// One received body chunk. Returns bytes consumed (always all of them;
    /// this design has no delivery backpressure).
    fn body_chunk(&mut self, id: TransferId, data: &[u8]) -> usize;

    /// Fill `buf` with upload bytes. Returns 0 at end of body.
    fn body_read(&mut self, id: TransferId, buf: &mut [u8]) -> usize;
}

/// The external multiplexing transfer engine, driven by the client.
///
/// Every method that can make the engine progress takes the host, because
/// the engine may synchronously call back into it (socket interest changes,
/// timer requests, per-transfer data) before returning.
pub trait TransferEngine {
    /// Engine-wide pipelining toggle, applied at client construction.
    fn set_pipelining(&mut self, enabled: bool);

    /// Begin a transfer. May synchronously trigger host callbacks.
    fn add_transfer(
        &mut self,
        id: TransferId,
        options: TransferOptions,
        host: &mut dyn EngineHost,
    ) -> Result<MultiCode>;

    /// Deregister a finished transfer.
    fn remove_transfer(&mut self, id: TransferId, host: &mut dyn EngineHost)
        -> Result<MultiCode>;

    /// Drive by socket readiness event.
    fn socket_action(
        &mut self,
        fd: RawFd,
        input: bool,
        output: bool,
        host: &mut dyn EngineHost,
    ) -> Result<MultiCode>;

    /// Drive by timeout ("check timeouts" action, no specific socket).
    fn timeout_action(&mut self, host: &mut dyn EngineHost) -> Result<MultiCode>;

    /// Move the engine's finished-transfer notifications into `out`.
    fn drain_finished(&mut self, out: &mut Vec<(TransferId, TransferCode)>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_interest_none() {
        assert!(SocketInterest::NONE.is_none());
        assert!(!SocketInterest { input: true, output: false }.is_none());
        assert!(!SocketInterest { input: false, output: true }.is_none());
    }

    #[test]
    fn test_multi_code_accepted_set() {
        assert!(MultiCode::OK.is_accepted());
        assert!(MultiCode::CALL_PERFORM.is_accepted());
        assert!(!MultiCode(7).is_accepted());
    }

    #[test]
    fn test_transfer_code_ok() {
        assert!(TransferCode::OK.is_ok());
        assert!(!TransferCode::OPERATION_TIMEDOUT.is_ok());
    }
}
