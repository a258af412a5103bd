//! Dispatcher core traits.

use crate::event::Event;
use std::{future::Future, pin::Pin, sync::Arc};

/// Runs one event through the full request lifecycle.
///
/// Dispatch never fails from the caller's point of view: every error is
/// turned into a response and written through the event's transport.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot dispatch events",
    label = "missing `Dispatcher` implementation",
    note = "Implement `Dispatcher` to drive the request lifecycle."
)]
pub trait Dispatcher: Send + Sync + 'static {
    /// Dispatch the event.
    fn dispatch(&self, event: Event) -> impl Future<Output = ()> + Send;
}

/// Object-safe version of [`Dispatcher`].
pub trait DynDispatcher: Send + Sync + 'static {
    /// Dispatch the event (dynamic dispatch version).
    fn dispatch_dyn<'a>(&'a self, event: Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<T: Dispatcher> DynDispatcher for T {
    fn dispatch_dyn<'a>(&'a self, event: Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.dispatch(event))
    }
}

impl Dispatcher for Arc<dyn DynDispatcher> {
    async fn dispatch(&self, event: Event) {
        self.dispatch_dyn(event).await
    }
}
