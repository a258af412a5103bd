//! Handlers resolved on first use.

use junction_core::{BoxHandler, Event, Handler, HttpError, Output};
use std::{fmt, future::Future};
use tokio::sync::OnceCell;

/// A handler built by an async factory the first time it is called.
///
/// Concurrent first callers share one factory run. The outcome is cached:
/// a factory error is returned to every later caller as well.
///
/// # Example
///
/// ```rust
/// use junction_core::{Event, HttpError};
/// use junction_std::handlers::LazyHandler;
///
/// let handler = LazyHandler::new(|| async {
///     // e.g. load templates or open a pool
///     Ok::<_, HttpError>(|_event: Event| async { "ready" })
/// });
/// ```
pub struct LazyHandler<F> {
    factory: F,
    resolved: OnceCell<Result<BoxHandler, HttpError>>,
}

impl<F> LazyHandler<F> {
    /// Wrap a factory.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            resolved: OnceCell::new(),
        }
    }

    /// Whether the factory has already run.
    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }
}

impl<F, Fut, H> Handler for LazyHandler<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<H, HttpError>> + Send,
    H: Handler,
{
    type Output = Output;

    async fn call(&self, event: Event) -> Output {
        let resolved = self
            .resolved
            .get_or_init(|| async {
                tracing::debug!("resolving lazy handler");
                (self.factory)().await.map(BoxHandler::new)
            })
            .await;
        match resolved {
            Ok(handler) => handler.call(event).await,
            Err(err) => Output::Error(err.clone()),
        }
    }
}

impl<F> fmt::Debug for LazyHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyHandler")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
