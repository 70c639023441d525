//! Request model: body content, key/value parameter lists, `HttpRequest`.
//!
//! An `HttpRequest` is immutable once constructed. It is created by the
//! caller at enqueue time, owned jointly by the request queue (until
//! dequeued) and the bound connection slot (until the transfer completes),
//! and dropped when the last `Arc` owner releases it.

use crate::callbacks::HttpClientCallbacks;
use crate::method::Method;

use std::fmt;
use std::sync::Arc;

/// Request body plus its declared content type.
#[derive(Debug, Clone, Default)]
pub struct RequestContent {
    body: Vec<u8>,
    content_type: String,
}

impl RequestContent {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    /// Empty body, blank content type (GET / HEAD).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Ordered key/value list used for both query parameters and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }

    /// Render as an escaped query string: `?k=v&k2=v2`, empty when there
    /// are no parameters. Keys and values are percent-escaped.
    pub fn uri_escaped(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut out = String::from("?");
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            escape_into(&mut out, k);
            out.push('=');
            escape_into(&mut out, v);
        }
        out
    }
}

impl From<Vec<(String, String)>> for Params {
    fn from(v: Vec<(String, String)>) -> Self {
        Self(v)
    }
}

/// Percent-escape everything outside the RFC 3986 unreserved set.
fn escape_into(out: &mut String, s: &str) {
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => {
                out.push('%');
                out.push(char::from_digit(u32::from(b >> 4), 16).unwrap_or('0').to_ascii_uppercase());
                out.push(char::from_digit(u32::from(b & 0xf), 16).unwrap_or('0').to_ascii_uppercase());
            }
        }
    }
}

/// One submitted request. Immutable after construction.
pub struct HttpRequest {
    method: Method,
    url: String,
    content: RequestContent,
    headers: Params,
    timeout_secs: Option<u32>,
    callbacks: Arc<dyn HttpClientCallbacks>,
}

impl HttpRequest {
    pub fn new(
        method: Method,
        url: impl Into<String>,
        callbacks: Arc<dyn HttpClientCallbacks>,
        content: RequestContent,
        headers: Params,
        timeout_secs: Option<u32>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            content,
            headers,
            timeout_secs,
            callbacks,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> &RequestContent {
        &self.content
    }

    pub fn headers(&self) -> &Params {
        &self.headers
    }

    pub fn timeout_secs(&self) -> Option<u32> {
        self.timeout_secs
    }

    pub fn callbacks(&self) -> &Arc<dyn HttpClientCallbacks> {
        &self.callbacks
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body_len", &self.content.body.len())
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}
