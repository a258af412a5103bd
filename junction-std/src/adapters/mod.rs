//! # Transport Adapters
//!
//! One [`RawEvent`] implementation per transport:
//!
//! | Adapter | Input                          | Output                        |
//! |---------|--------------------------------|-------------------------------|
//! | node    | `http::Request<Incoming>`      | `http::Response<HttpBody>`    |
//! | web     | `http::Request<B>` + context   | `http::Response<HttpBody>`    |
//! | plain   | [`PlainRequest`]               | [`PlainResponse`]             |
//!
//! Each adapter also provides a `*_handler` function that wraps a
//! [`Dispatcher`](junction_core::Dispatcher) into a plain async function of
//! its transport's request type.

mod body;
mod node;
mod plain;
mod web;

pub use body::{HttpBody, body_stream, http_body, http_response};
pub use node::{NodeEvent, node_handler};
pub use plain::{PlainEvent, PlainRequest, PlainResponse, plain_handler};
pub use web::{WebEvent, web_handler};

use crate::errors::error_response;
use http::{HeaderMap, Method};
use junction_core::{BodyCache, HttpError, NormalizedResponse, ResponseState, TransportError};
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

/// The request half and single-shot guard shared by every adapter.
#[derive(Debug)]
pub(crate) struct RequestParts {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: BodyCache,
    pub(crate) response: Mutex<ResponseState>,
    handled: AtomicBool,
}

/// Fold a method's case, so `patch` and `PATCH` reach the same routes.
fn upper_case(method: Method) -> Method {
    let name = method.as_str();
    if !name.bytes().any(|b| b.is_ascii_lowercase()) {
        return method;
    }
    Method::from_bytes(name.to_ascii_uppercase().as_bytes()).unwrap_or(method)
}

impl RequestParts {
    pub(crate) fn new(method: Method, path: String, headers: HeaderMap, body: BodyCache) -> Self {
        Self {
            method: upper_case(method),
            path,
            headers,
            body,
            response: Mutex::new(ResponseState::default()),
            handled: AtomicBool::new(false),
        }
    }

    pub(crate) fn handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    /// Claim the right to write the response. Succeeds once.
    pub(crate) fn claim(&self, transport: &'static str) -> Result<(), TransportError> {
        if self.handled.swap(true, Ordering::AcqRel) {
            tracing::warn!(transport, path = %self.path, "response already sent");
            return Err(TransportError::AlreadySent);
        }
        Ok(())
    }
}

/// Where buffered adapters park the response until the dispatcher returns.
pub(crate) type ResponseSlot = Arc<Mutex<Option<NormalizedResponse>>>;

pub(crate) fn take_slot(slot: &ResponseSlot) -> Option<NormalizedResponse> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

pub(crate) fn fill_slot(slot: &ResponseSlot, response: NormalizedResponse) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(response);
}

/// The response used when dispatch ended without writing anything.
pub(crate) fn unsent_response(transport: &'static str, path: &str) -> NormalizedResponse {
    tracing::error!(transport, path, "dispatch finished without sending a response");
    error_response(
        HttpError::internal("dispatch finished without sending a response").with_unhandled(true),
        &ResponseState::default(),
        false,
    )
}
