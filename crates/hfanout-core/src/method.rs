//! HTTP request verbs and their body policy.

use std::fmt;

/// Request verb.
///
/// The verb decides how the body is handed to the transfer engine:
/// GET sends none, PUT streams via the upload-read callback, POST passes
/// the body as post fields, HEAD suppresses response-body retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
        }
    }

    /// Non-GET verbs carry body-related headers (Content-Length,
    /// Content-Type, blank Transfer-Encoding and Expect).
    pub fn sends_body_headers(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
