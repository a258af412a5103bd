//! Application configuration.

use junction_core::{BoxHook, ErrorEvent, Event, Hook, ResponseEvent};
use std::{fmt, sync::Arc};

/// Options fixed when an [`App`](crate::App) is created.
///
/// # Example
///
/// ```rust
/// use junction::{AppOptions, ErrorEvent, HttpError};
///
/// let options = AppOptions::new()
///     .debug(true)
///     .on_error(|report: ErrorEvent| async move {
///         eprintln!("{}: {}", report.event.path(), report.error);
///         Ok::<_, HttpError>(())
///     });
/// assert!(options.is_debug());
/// ```
#[derive(Clone, Default)]
pub struct AppOptions {
    pub(crate) debug: bool,
    pub(crate) on_request: Option<BoxHook<Event>>,
    pub(crate) on_error: Option<BoxHook<ErrorEvent>>,
    pub(crate) on_before_response: Option<BoxHook<ResponseEvent>>,
    pub(crate) on_after_response: Option<BoxHook<ResponseEvent>>,
}

impl AppOptions {
    /// Default options: no hooks, debug off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretty-print JSON and include error stacks in responses.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Run before any middleware. A failure ends the request.
    pub fn on_request<H: Hook<Event>>(mut self, hook: H) -> Self {
        self.on_request = Some(Arc::new(hook));
        self
    }

    /// Observe every error that reaches the error pipeline.
    pub fn on_error<H: Hook<ErrorEvent>>(mut self, hook: H) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Observe the response head before it is written.
    pub fn on_before_response<H: Hook<ResponseEvent>>(mut self, hook: H) -> Self {
        self.on_before_response = Some(Arc::new(hook));
        self
    }

    /// Observe the response head after it was written.
    pub fn on_after_response<H: Hook<ResponseEvent>>(mut self, hook: H) -> Self {
        self.on_after_response = Some(Arc::new(hook));
        self
    }

    /// Whether debug mode is on.
    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

impl fmt::Debug for AppOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppOptions")
            .field("debug", &self.debug)
            .field("on_request", &self.on_request.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_before_response", &self.on_before_response.is_some())
            .field("on_after_response", &self.on_after_response.is_some())
            .finish()
    }
}
