//! Per-transfer protocol handling for one connection slot.
//!
//! A `Connection` is reused across many unrelated transfers over its
//! lifetime. It is either *free* (no bound request) or *busy* (exactly one
//! bound request); never partially bound. The transfer engine addresses it
//! through an explicit slot id, not captured closures, so reuse carries no
//! stale environment state.
//!
//! Header handling: a provisional "100 Continue" response sets a
//! continuation flag; while set, header lines are swallowed until the bare
//! CRLF that ends the provisional headers, so only the final response
//! reaches the callback consumer.

use hfanout_core::error::{ClientError, Result};
use hfanout_core::method::Method;
use hfanout_core::request::HttpRequest;
use hfanout_core::transfer::TransferOptions;

use std::sync::Arc;

/// Receive buffer size handed to the transfer engine for every transfer.
const TRANSFER_BUFFER_SIZE: usize = 65536;

/// Marks the start of a provisional 100 Continue status line.
const CONTINUE_PREFIX: &[u8] = b"HTTP/1.1 100";
/// Marks any status line.
const STATUS_PREFIX: &[u8] = b"HTTP/";

/// One in-flight request/response exchange bound to a pool slot.
pub struct Connection {
    request: Option<Arc<HttpRequest>>,
    /// Bytes of the request body already handed to the transfer engine.
    upload_offset: usize,
    /// True while swallowing a provisional response's headers.
    after_continue: bool,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            request: None,
            upload_offset: 0,
            after_continue: false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.request.is_some()
    }

    pub fn request(&self) -> Option<&Arc<HttpRequest>> {
        self.request.as_ref()
    }

    /// Bind a dequeued request to this slot.
    pub fn bind(&mut self, request: Arc<HttpRequest>) {
        debug_assert!(self.request.is_none(), "binding a busy slot");
        self.request = Some(request);
        self.upload_offset = 0;
        self.after_continue = false;
    }

    /// Reset to free, returning the bound request for the completion
    /// notification.
    pub fn reset(&mut self) -> Option<Arc<HttpRequest>> {
        self.upload_offset = 0;
        self.after_continue = false;
        self.request.take()
    }

    /// One response header line, separator included.
    ///
    /// Status lines parse as `<version> <code> <reason...>`; missing either
    /// space-delimited token is fatal. Returns bytes consumed.
    pub fn on_header_line(&mut self, line: &[u8]) -> Result<usize> {
        let Some(request) = self.request.as_ref() else {
            log::error!("header line for unbound slot, dropping {} bytes", line.len());
            return Ok(line.len());
        };

        if line.starts_with(CONTINUE_PREFIX) {
            self.after_continue = true;
        } else if self.after_continue {
            if line == b"\r\n" {
                self.after_continue = false;
            }
        } else if line.starts_with(STATUS_PREFIX) {
            let (version, code) = parse_status_line(line)?;
            request.callbacks().on_response_start(request, version, code);
        } else {
            request.callbacks().on_header(request, line);
        }

        Ok(line.len())
    }

    /// One received body chunk, forwarded verbatim. Always reports full
    /// consumption (no delivery backpressure in this design).
    pub fn on_body_chunk(&self, data: &[u8]) -> usize {
        if let Some(request) = self.request.as_ref() {
            request.callbacks().on_data(request, data);
        } else {
            log::error!("body chunk for unbound slot, dropping {} bytes", data.len());
        }
        data.len()
    }

    /// Copy up to `buf.len()` upload bytes from the request body at the
    /// current cursor, advancing it. Returns 0 at end of body.
    pub fn on_body_read(&mut self, buf: &mut [u8]) -> usize {
        let Some(request) = self.request.as_ref() else {
            return 0;
        };
        let body = request.content().body();
        let remaining = body.len().saturating_sub(self.upload_offset);
        let n = remaining.min(buf.len());
        buf[..n].copy_from_slice(&body[self.upload_offset..self.upload_offset + n]);
        self.upload_offset += n;
        n
    }

    #[cfg(test)]
    pub(crate) fn upload_offset(&self) -> usize {
        self.upload_offset
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `<version> <space> <code> <space> <reason...>`.
fn parse_status_line(line: &[u8]) -> Result<(&str, u16)> {
    let text = std::str::from_utf8(line).map_err(|_| ClientError::MalformedStatusLine)?;
    let sp1 = text.find(' ').ok_or(ClientError::MalformedStatusLine)?;
    let version = &text[..sp1];
    let rest = &text[sp1 + 1..];
    let sp2 = rest.find(' ').ok_or(ClientError::MalformedStatusLine)?;
    let code = rest[..sp2]
        .parse::<u16>()
        .map_err(|_| ClientError::MalformedStatusLine)?;
    Ok((version, code))
}

/// Per-verb transfer configuration policy.
///
/// GET issues no body. PUT streams the body through the upload-read
/// callback with a declared length. POST passes the body as post fields.
/// HEAD suppresses body retrieval. All non-GET verbs synthesize
/// Content-Length, blank Transfer-Encoding (forces non-chunked),
/// Content-Type, and blank Expect (suppresses the engine's automatic
/// 100-Continue negotiation; the swallow logic above covers engines that
/// ignore the suppression).
pub fn transfer_options(
    request: &HttpRequest,
    ssl_verify: bool,
    tcp_no_delay: bool,
    verbose: bool,
) -> TransferOptions {
    let method = request.method();
    let body = request.content().body();
    let mut headers: Vec<(String, String)> = request.headers().as_slice().to_vec();
    let mut upload = false;
    let mut post_fields = None;
    let mut no_body = false;

    if method.sends_body_headers() {
        match method {
            Method::Put => upload = true,
            Method::Post => post_fields = Some(body.to_vec()),
            Method::Head => no_body = true,
            Method::Get => unreachable!(),
        }
        headers.push(("Content-Length".into(), body.len().to_string()));
        headers.push(("Transfer-Encoding".into(), String::new()));
        headers.push(("Content-Type".into(), request.content().content_type().into()));
        headers.push(("Expect".into(), String::new()));
    }

    TransferOptions {
        url: request.url().to_string(),
        method,
        headers,
        body_len: body.len(),
        upload,
        post_fields,
        no_body,
        timeout_secs: request.timeout_secs(),
        buffer_size: TRANSFER_BUFFER_SIZE,
        ssl_verify,
        tcp_no_delay,
        verbose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfanout_core::callbacks::HttpClientCallbacks;
    use hfanout_core::error::TransferError;
    use hfanout_core::request::{Params, RequestContent};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        starts: Mutex<Vec<(String, u16)>>,
        headers: Mutex<Vec<Vec<u8>>>,
        data: Mutex<Vec<Vec<u8>>>,
    }

    impl HttpClientCallbacks for Recorder {
        fn on_response_start(&self, _r: &HttpRequest, version: &str, code: u16) {
            self.starts.lock().unwrap().push((version.to_string(), code));
        }
        fn on_header(&self, _r: &HttpRequest, header: &[u8]) {
            self.headers.lock().unwrap().push(header.to_vec());
        }
        fn on_data(&self, _r: &HttpRequest, data: &[u8]) {
            self.data.lock().unwrap().push(data.to_vec());
        }
        fn on_done(&self, _r: &HttpRequest, _e: TransferError) {}
    }

    fn bound(method: Method, body: &[u8]) -> (Connection, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let request = Arc::new(HttpRequest::new(
            method,
            "http://h/x",
            Arc::clone(&recorder) as Arc<dyn HttpClientCallbacks>,
            RequestContent::new(body.to_vec(), "application/octet-stream"),
            Params::new(),
            None,
        ));
        let mut conn = Connection::new();
        conn.bind(request);
        (conn, recorder)
    }

    #[test]
    fn test_status_line_triggers_response_start() {
        let (mut conn, rec) = bound(Method::Get, b"");
        let n = conn.on_header_line(b"HTTP/1.1 200 OK\r\n").unwrap();
        assert_eq!(n, 17);
        assert_eq!(
            rec.starts.lock().unwrap().as_slice(),
            &[("HTTP/1.1".to_string(), 200)]
        );
    }

    #[test]
    fn test_plain_header_forwarded_raw() {
        let (mut conn, rec) = bound(Method::Get, b"");
        conn.on_header_line(b"HTTP/1.1 200 OK\r\n").unwrap();
        conn.on_header_line(b"Content-Type: text/plain\r\n").unwrap();
        assert_eq!(
            rec.headers.lock().unwrap().as_slice(),
            &[b"Content-Type: text/plain\r\n".to_vec()]
        );
    }

    #[test]
    fn test_continue_preamble_suppressed() {
        let (mut conn, rec) = bound(Method::Put, b"body");
        conn.on_header_line(b"HTTP/1.1 100 Continue\r\n").unwrap();
        conn.on_header_line(b"Some-Interim: header\r\n").unwrap();
        conn.on_header_line(b"\r\n").unwrap();
        conn.on_header_line(b"HTTP/1.1 200 OK\r\n").unwrap();
        conn.on_header_line(b"ETag: abc\r\n").unwrap();

        let starts = rec.starts.lock().unwrap();
        assert_eq!(starts.as_slice(), &[("HTTP/1.1".to_string(), 200)]);
        let headers = rec.headers.lock().unwrap();
        assert_eq!(headers.as_slice(), &[b"ETag: abc\r\n".to_vec()]);
    }

    #[test]
    fn test_malformed_status_lines() {
        let (mut conn, _rec) = bound(Method::Get, b"");
        assert_eq!(
            conn.on_header_line(b"HTTP/1.1\r\n").unwrap_err(),
            ClientError::MalformedStatusLine
        );
        assert_eq!(
            conn.on_header_line(b"HTTP/1.1 200\r\n").unwrap_err(),
            ClientError::MalformedStatusLine
        );
        assert_eq!(
            conn.on_header_line(b"HTTP/1.1 abc OK\r\n").unwrap_err(),
            ClientError::MalformedStatusLine
        );
    }

    #[test]
    fn test_body_chunk_full_consumption() {
        let (conn, rec) = bound(Method::Get, b"");
        assert_eq!(conn.on_body_chunk(b"hello"), 5);
        assert_eq!(rec.data.lock().unwrap().as_slice(), &[b"hello".to_vec()]);
    }

    #[test]
    fn test_body_read_cursor() {
        let (mut conn, _rec) = bound(Method::Put, b"0123456789");
        let mut buf = [0u8; 4];
        assert_eq!(conn.on_body_read(&mut buf), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(conn.on_body_read(&mut buf), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(conn.on_body_read(&mut buf), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(conn.on_body_read(&mut buf), 0);
        assert_eq!(conn.upload_offset(), 10);
    }

    #[test]
    fn test_reset_clears_state() {
        let (mut conn, _rec) = bound(Method::Put, b"abc");
        let mut buf = [0u8; 8];
        conn.on_body_read(&mut buf);
        conn.on_header_line(b"HTTP/1.1 100 Continue\r\n").unwrap();

        let req = conn.reset();
        assert!(req.is_some());
        assert!(!conn.is_busy());
        assert_eq!(conn.upload_offset(), 0);
        assert!(conn.reset().is_none());
    }

    #[test]
    fn test_get_options_carry_no_body_headers() {
        let (conn, _rec) = bound(Method::Get, b"");
        let req = conn.request().unwrap();
        let opts = transfer_options(req, true, false, false);
        assert!(opts.headers.is_empty());
        assert!(!opts.upload);
        assert!(opts.post_fields.is_none());
        assert!(!opts.no_body);
    }

    #[test]
    fn test_put_options() {
        let (conn, _rec) = bound(Method::Put, b"12345");
        let opts = transfer_options(conn.request().unwrap(), true, true, false);
        assert!(opts.upload);
        assert_eq!(opts.body_len, 5);
        assert!(opts.tcp_no_delay);
        let find = |k: &str| {
            opts.headers
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(find("Content-Length").unwrap(), "5");
        assert_eq!(find("Transfer-Encoding").unwrap(), "");
        assert_eq!(find("Content-Type").unwrap(), "application/octet-stream");
        assert_eq!(find("Expect").unwrap(), "");
    }

    #[test]
    fn test_post_and_head_options() {
        let (conn, _rec) = bound(Method::Post, b"k=v");
        let opts = transfer_options(conn.request().unwrap(), true, false, false);
        assert_eq!(opts.post_fields.as_deref(), Some(b"k=v".as_slice()));
        assert!(!opts.upload);

        let (conn, _rec) = bound(Method::Head, b"");
        let opts = transfer_options(conn.request().unwrap(), true, false, false);
        assert!(opts.no_body);
    }
}
