//! # junction-core
//!
//! Core types and traits for the Junction HTTP dispatch framework.
//!
//! This crate has minimal dependencies and is meant to be imported by
//! transport adapters and middleware that don't need the full
//! `junction-std` implementation.
//!
//! # Layers
//!
//! ## Transport ([`RawEvent`])
//!
//! The capability interface a transport adapter implements for one request:
//! method, target, headers, a memoized body, a mutable response descriptor,
//! and a single-shot `send_response`.
//!
//! ## Event ([`Event`])
//!
//! The handle passed to user code. It wraps one `RawEvent`, adds a
//! per-request [`Context`] (route params, matched route, typed extensions)
//! and supports scoped path views for prefix middleware.
//!
//! ## Handler ([`Handler`])
//!
//! Middleware and route handlers share one shape:
//! `Fn(Event) -> impl Future<Output = impl IntoOutput>`. Returning `()`
//! passes control to the next stage.
//!
//! ## Output ([`Output`])
//!
//! The closed set of values a stage can produce. The response normalizer in
//! `junction-std` turns it into a [`NormalizedResponse`].
//!
//! # Error Types
//!
//! - [`HttpError`] - The HTTP-aware error carried through the pipeline
//! - [`TransportError`] - Failures of the transport primitives

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod body;
mod dispatcher;
mod error;
mod event;
mod handler;
mod hook;
mod output;
mod raw;
mod response;

// Re-exports
pub use body::{BodyCache, BodyStream, FormData, ResponseBody};
pub use dispatcher::{Dispatcher, DynDispatcher};
pub use error::{BoxError, HttpError, SharedError, TransportError};
pub use event::{Context, Event, MatchedRoute, Params};
pub use handler::{BoxHandler, DynHandler, Handler};
pub use hook::{BoxHook, DynHook, ErrorEvent, Hook, ResponseEvent};
pub use output::{Blob, IntoOutput, Json, Output};
pub use raw::RawEvent;
pub use response::{NormalizedResponse, ResponseMeta, ResponseState, reason_phrase};

/// Re-exported so adapters outside this workspace can implement
/// [`RawEvent`] without naming the macro crate themselves.
pub use async_trait::async_trait;
