//! Response descriptors.
//!
//! - [`ResponseState`] - The live, mutable status and header set that
//!   handlers write into while a request is in flight.
//! - [`NormalizedResponse`] - The canonical shape produced by the normalizer
//!   and written out by a transport.
//! - [`ResponseMeta`] - A body-less snapshot handed to observation hooks.

use crate::{body::ResponseBody, error::HttpError};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};

/// The mutable response descriptor of an in-flight request.
#[derive(Debug, Clone, Default)]
pub struct ResponseState {
    /// Status explicitly set by a handler.
    pub status: Option<StatusCode>,
    /// Reason phrase explicitly set by a handler.
    pub status_text: Option<String>,
    /// Response headers accumulated so far.
    pub headers: HeaderMap,
}

impl ResponseState {
    /// Set a header, replacing previous values.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append a header, keeping previous values (`set-cookie`).
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Remove every value of a header.
    pub fn remove_header(&mut self, name: &HeaderName) {
        self.headers.remove(name);
    }
}

/// The canonical response shape written out by every transport.
#[derive(Debug, Default)]
pub struct NormalizedResponse {
    /// Status code.
    pub status: StatusCode,
    /// Reason phrase.
    pub status_text: String,
    /// Headers, duplicate-aware.
    pub headers: HeaderMap,
    /// Body.
    pub body: ResponseBody,
    /// The error this response was produced from, if any.
    pub error: Option<HttpError>,
}

impl NormalizedResponse {
    /// The `content-type` header, if set and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Snapshot everything but the body.
    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            error: self.error.clone(),
        }
    }
}

/// A body-less view of a response, passed to observation hooks.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    /// Status code.
    pub status: StatusCode,
    /// Reason phrase.
    pub status_text: String,
    /// Headers.
    pub headers: HeaderMap,
    /// The error this response was produced from, if any.
    pub error: Option<HttpError>,
}

/// The default reason phrase for a status.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}
