//! Request logging middleware.

use junction_core::{Event, Handler};

/// A pass-through middleware that logs every request.
///
/// It never produces a response, so dispatch always continues.
///
/// # Example
///
/// ```rust,ignore
/// app.use_middleware(RequestLogger::named("api"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestLogger {
    name: &'static str,
}

impl RequestLogger {
    /// Create a logger with the default name.
    pub const fn new() -> Self {
        Self { name: "request" }
    }

    /// Create a logger with a custom name, used to tell pipelines apart.
    pub const fn named(name: &'static str) -> Self {
        Self { name }
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for RequestLogger {
    type Output = ();

    async fn call(&self, event: Event) {
        tracing::debug!(
            name = %self.name,
            transport = event.raw().transport(),
            method = %event.method(),
            path = %event.path(),
            "incoming request"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::plain_event;
    use junction_core::IntoOutput;

    #[tokio::test]
    async fn test_request_logger_passes() {
        let logger = RequestLogger::new();
        let output = logger.call(plain_event("GET", "/")).await.into_output();
        assert!(output.is_pass());
    }

    #[tokio::test]
    async fn test_request_logger_named() {
        let logger = RequestLogger::named("api");
        let output = logger.call(plain_event("POST", "/items")).await.into_output();
        assert!(output.is_pass());
    }
}
