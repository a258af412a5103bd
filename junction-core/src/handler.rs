//! # Handler Layer
//!
//! The unit of work of every dispatch stage. Middleware and route handlers
//! share one shape: they receive the [`Event`] and produce something that
//! converts [`IntoOutput`].
//!
//! # Pass-through
//!
//! A handler that returns `()` (or `None`) produces [`Output::Pass`]: the
//! dispatcher moves on to the next stage. Any other value ends dispatch and
//! is sent as the response.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|event: Event| async move { "hello" }`
//! 2. **Struct implementation**: `impl Handler for MyHandler`
//! 3. **Type-erased**: [`BoxHandler::new`] for storage in registries

use crate::{
    event::Event,
    output::{IntoOutput, Output},
};
use std::{fmt, future::Future, pin::Pin, sync::Arc};

/// A middleware or route handler.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a handler",
    label = "missing `Handler` implementation",
    note = "Handlers are `Fn(Event) -> impl Future<Output = impl IntoOutput>`."
)]
pub trait Handler: Send + Sync + 'static {
    /// What the handler returns.
    type Output: IntoOutput + Send;

    /// Handle one event.
    fn call(&self, event: Event) -> impl Future<Output = Self::Output> + Send;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send,
    R: IntoOutput + Send,
{
    type Output = R;

    fn call(&self, event: Event) -> impl Future<Output = Self::Output> + Send {
        (self)(event)
    }
}

/// Object-safe version of [`Handler`].
pub trait DynHandler: Send + Sync + 'static {
    /// Handle one event (dynamic dispatch version).
    fn call_dyn<'a>(&'a self, event: Event) -> Pin<Box<dyn Future<Output = Output> + Send + 'a>>;
}

impl<T: Handler> DynHandler for T {
    fn call_dyn<'a>(&'a self, event: Event) -> Pin<Box<dyn Future<Output = Output> + Send + 'a>> {
        Box::pin(async move { self.call(event).await.into_output() })
    }
}

/// A shared, type-erased handler.
#[derive(Clone)]
pub struct BoxHandler(Arc<dyn DynHandler>);

impl BoxHandler {
    /// Erase a handler.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    /// Wrap an already shared handler.
    pub fn from_arc(handler: Arc<dyn DynHandler>) -> Self {
        Self(handler)
    }
}

impl Handler for BoxHandler {
    type Output = Output;

    fn call(&self, event: Event) -> impl Future<Output = Self::Output> + Send {
        self.0.call_dyn(event)
    }
}

impl fmt::Debug for BoxHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxHandler")
    }
}
