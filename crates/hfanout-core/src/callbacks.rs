//! Callback consumer interface.
//!
//! Implemented by callers, invoked by the engine on its reactor thread.
//!
//! **Contract:**
//! - All notifications for one request fire on the reactor thread; consumers
//!   never need their own synchronization against the engine.
//! - Per request, the sequence is: exactly one `on_response_start`, then zero
//!   or more `on_header`, interleaved with zero or more `on_data`, then
//!   exactly one `on_done`. Nothing fires after `on_done`.
//! - Completion order across concurrent requests follows transfer completion,
//!   never submission order.
//! - `on_data` must consume the whole chunk; there is no backpressure
//!   signaling on the delivery path.

use crate::error::TransferError;
use crate::request::HttpRequest;

/// Receives per-request notifications from the engine.
pub trait HttpClientCallbacks: Send + Sync {
    /// The final response's status line was parsed.
    ///
    /// Provisional responses (100 Continue) are suppressed and never
    /// reach this method.
    fn on_response_start(&self, request: &HttpRequest, version: &str, code: u16) {
        let _ = (request, version, code);
    }

    /// One raw header line, line separator included.
    fn on_header(&self, request: &HttpRequest, header: &[u8]) {
        let _ = (request, header);
    }

    /// One body chunk, delivered verbatim.
    fn on_data(&self, request: &HttpRequest, data: &[u8]) {
        let _ = (request, data);
    }

    /// Terminal notification; delivered exactly once per accepted request.
    fn on_done(&self, request: &HttpRequest, error: TransferError);
}
