//! # Lifecycle Hooks
//!
//! Hooks observe a request at fixed points of dispatch. They are not part of
//! the middleware chain: they cannot produce a response, only fail.
//!
//! | Point                | Input            |
//! |----------------------|------------------|
//! | `on_request`         | [`Event`]        |
//! | `on_error`           | [`ErrorEvent`]   |
//! | `on_before_response` | [`ResponseEvent`]|
//! | `on_after_response`  | [`ResponseEvent`]|
//!
//! A failing `on_request` hook is treated like a failing handler. Failures
//! of the other hooks are logged and swallowed by the dispatcher.

use crate::{error::HttpError, event::Event, response::ResponseMeta};
use std::{future::Future, pin::Pin, sync::Arc};

/// Input of an `on_error` hook.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    /// The error being reported.
    pub error: HttpError,
    /// The request it happened on.
    pub event: Event,
}

/// Input of the response hooks.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    /// The request.
    pub event: Event,
    /// The response, without its body.
    pub response: ResponseMeta,
}

/// A lifecycle hook over inputs of type `A`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be used as a hook for `{A}`",
    label = "missing `Hook<{A}>` implementation",
    note = "Hooks are `Fn({A}) -> impl Future<Output = Result<(), HttpError>>`."
)]
pub trait Hook<A>: Send + Sync + 'static {
    /// Run the hook.
    fn call(&self, input: A) -> impl Future<Output = Result<(), HttpError>> + Send;
}

impl<F, A, Fut> Hook<A> for F
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HttpError>> + Send,
{
    fn call(&self, input: A) -> impl Future<Output = Result<(), HttpError>> + Send {
        (self)(input)
    }
}

/// Object-safe version of [`Hook`].
pub trait DynHook<A>: Send + Sync + 'static {
    /// Run the hook (dynamic dispatch version).
    fn call_dyn<'a>(
        &'a self,
        input: A,
    ) -> Pin<Box<dyn Future<Output = Result<(), HttpError>> + Send + 'a>>
    where
        A: 'a;
}

impl<A, T: Hook<A>> DynHook<A> for T {
    fn call_dyn<'a>(
        &'a self,
        input: A,
    ) -> Pin<Box<dyn Future<Output = Result<(), HttpError>> + Send + 'a>>
    where
        A: 'a,
    {
        Box::pin(self.call(input))
    }
}

/// A shared, type-erased hook.
pub type BoxHook<A> = Arc<dyn DynHook<A>>;
