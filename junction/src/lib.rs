//! # junction - Transport-Agnostic HTTP Event Dispatch
//!
//! `junction` takes a request from one of several transports, runs it
//! through hooks, global middleware, prefix-scoped middleware and a route
//! table, and turns whatever the answering handler returned (or failed with)
//! into a response.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use junction::prelude::*;
//!
//! # async fn run() {
//! let mut app = App::new();
//! app.get("/hello/:name", |event: Event| async move {
//!     format!("Hello {}!", event.param("name").unwrap_or_default())
//! });
//!
//! let handler = app.into_shared().plain_handler();
//! let response = handler(PlainRequest::get("/hello/world")).await;
//! assert_eq!(response.text(), "Hello world!");
//! # }
//! ```
//!
//! ## Transports
//!
//! | Adapter | Input                      | Output                 |
//! |---------|----------------------------|------------------------|
//! | node    | `Request<Incoming>`        | `Response<HttpBody>`   |
//! | web     | `Request<B>` + extensions  | `Response<HttpBody>`   |
//! | plain   | [`PlainRequest`]           | [`PlainResponse`]      |
//!
//! ## Handler Returns
//!
//! Handlers return anything implementing [`IntoOutput`]: `()` passes to the
//! next stage, strings become `text/html`, `serde_json::Value` and
//! [`Json`] become `application/json`, `Result::Err` goes through the error
//! pipeline.

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod app;
mod dispatch;
mod options;

pub use app::{App, ResolvedRoute};
pub use options::AppOptions;

pub use junction_core::{
    // Body
    BodyStream,
    // Handler
    BoxHandler,
    // Errors
    BoxError,
    // Output
    Blob,
    Context,
    Dispatcher,
    ErrorEvent,
    // Event
    Event,
    FormData,
    // Hooks
    Hook,
    HttpError,
    IntoOutput,
    Json,
    Handler,
    MatchedRoute,
    NormalizedResponse,
    Output,
    Params,
    RawEvent,
    ResponseBody,
    ResponseEvent,
    ResponseMeta,
    TransportError,
};

pub use junction_std::{
    adapters::{HttpBody, PlainRequest, PlainResponse, node_handler, plain_handler, web_handler},
    middleware::{LayerOptions, LayerSpec},
    routing::RouteMethod,
};

/// Transport adapters.
pub mod adapters {
    #![allow(clippy::wildcard_imports)]
    pub use junction_std::adapters::*;
}

/// Standard handler wrappers.
pub mod handlers {
    #![allow(clippy::wildcard_imports)]
    pub use junction_std::handlers::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use junction_std::testing::*;
}

/// Prelude module - common imports for Junction.
///
/// # Usage
///
/// ```rust,ignore
/// use junction::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Setup
        App,
        AppOptions,
        // Core types
        Event,
        Handler,
        HttpError,
        IntoOutput,
        Json,
        LayerOptions,
        Output,
        PlainRequest,
        PlainResponse,
    };
}
