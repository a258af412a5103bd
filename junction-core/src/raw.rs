//! # Transport Layer (RawEvent)
//!
//! The capability interface every transport adapter implements. A
//! `RawEvent` exposes the request primitives (method, target, headers,
//! body) and the response primitives (status, headers, `send_response`)
//! of exactly one inbound request.
//!
//! # Contract
//!
//! - Header lookups are case-insensitive (`HeaderMap`).
//! - Body readers are memoized through the adapter's [`BodyCache`]; the
//!   transport stream is consumed at most once.
//! - `send_response` succeeds once. Later calls fail with
//!   [`TransportError::AlreadySent`] and never touch the wire.
//! - Read and write failures are returned as `Err`, never raised as panics.

use crate::{
    body::{BodyCache, BodyStream, FormData},
    error::{HttpError, TransportError},
    response::{NormalizedResponse, ResponseState},
};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::sync::Mutex;

/// The per-transport capability object for one request.
#[async_trait]
pub trait RawEvent: Send + Sync + 'static {
    /// A short transport name, for logs (`"node"`, `"web"`, `"plain"`).
    fn transport(&self) -> &'static str;

    /// The upper-case request method.
    fn method(&self) -> &Method;

    /// The request target as received (path and query).
    fn path(&self) -> &str;

    /// Request headers.
    fn headers(&self) -> &HeaderMap;

    /// The memoized body of this request.
    fn body(&self) -> &BodyCache;

    /// The live response descriptor.
    fn response_state(&self) -> &Mutex<ResponseState>;

    /// Whether the response has been written.
    fn handled(&self) -> bool;

    /// Write the response. Succeeds at most once per request.
    async fn send_response(&self, response: NormalizedResponse) -> Result<(), TransportError>;

    /// Whether the client went away while a streamed body was in flight.
    fn is_aborted(&self) -> bool {
        false
    }

    /// Read the whole body.
    async fn read_raw_body(&self) -> Result<Option<Bytes>, HttpError> {
        self.body().read_raw().await
    }

    /// Read the body as text.
    async fn read_text_body(&self) -> Result<Option<String>, HttpError> {
        self.body().read_text().await
    }

    /// Read the body as urlencoded form data.
    async fn read_form_data(&self) -> Result<FormData, HttpError> {
        self.body().read_form().await
    }

    /// Take the body as a stream.
    fn read_body_stream(&self) -> Option<BodyStream> {
        self.body().take_stream()
    }
}
