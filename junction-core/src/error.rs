//! Error types for junction.
//!
//! This module provides the structured error hierarchy using `thiserror`:
//!
//! - [`HttpError`] - The error every failure path is converted into before it
//!   reaches the wire. Carries a status code, an optional status message and
//!   payload, and the `fatal` / `unhandled` flags used by the logging policy.
//! - [`TransportError`] - Failures raised by the raw transport adapters.
//!
//! # Handled vs. unhandled
//!
//! Errors built through the [`HttpError`] builder ([`HttpError::new`] and the
//! named constructors) are *expected* HTTP errors and keep `unhandled = false`.
//! Everything else that reaches the dispatcher (foreign error types, panics,
//! unsupported handler outputs) is wrapped with `unhandled = true`.

use http::{Method, StatusCode};
use std::{any::Any, sync::Arc};
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A shared error cause. `Arc` keeps [`HttpError`] cheap to clone.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The structured error produced for all failure paths.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use junction_core::HttpError;
///
/// let err = HttpError::new(StatusCode::UNPROCESSABLE_ENTITY)
///     .with_status_message("Invalid payload")
///     .with_data(serde_json::json!({ "field": "email" }));
///
/// assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
/// assert!(!err.is_unhandled());
/// ```
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HttpError {
    message: String,
    status_code: StatusCode,
    status_message: Option<String>,
    data: Option<serde_json::Value>,
    fatal: bool,
    unhandled: bool,
    #[source]
    cause: Option<SharedError>,
}

impl HttpError {
    /// Create an explicit application error with the given status.
    ///
    /// The message defaults to the canonical reason phrase of the status.
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            message: status_code
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            status_code,
            status_message: None,
            data: None,
            fatal: false,
            unhandled: false,
            cause: None,
        }
    }

    /// Create a 500 error with a custom message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_message(message)
    }

    /// Wrap a foreign error. The result is a 500 marked as unhandled.
    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut wrapped = Self::internal(err.to_string());
        wrapped.unhandled = true;
        wrapped.cause = Some(Arc::new(err));
        wrapped
    }

    /// Convert a panic payload caught at the dispatcher boundary.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        let mut err = Self::internal(message);
        err.unhandled = true;
        err
    }

    /// The routing-miss error: no stage produced a response.
    pub fn not_found(path: &str) -> Self {
        let path = if path.is_empty() { "/" } else { path };
        Self::new(StatusCode::NOT_FOUND)
            .with_status_message(format!("Cannot find any path matching {path}."))
    }

    /// A path matched a route but no handler exists for the method.
    pub fn method_not_allowed(method: &Method) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
            .with_status_message(format!("Method {method} is not allowed on this route."))
    }

    /// A handler produced a value that cannot be sent as a response.
    pub fn unsupported(type_name: &str) -> Self {
        let mut err = Self::new(StatusCode::INTERNAL_SERVER_ERROR)
            .with_status_message(format!("Cannot send {type_name} as response."));
        err.unhandled = true;
        err
    }

    /// Set the error message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the status message (HTTP reason phrase) sent to the client.
    pub fn with_status_message(mut self, status_message: impl Into<String>) -> Self {
        self.status_message = Some(status_message.into());
        self
    }

    /// Attach a JSON payload that is serialized into the error body.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the underlying cause.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Flag the error as non-recoverable. Fatal errors are always logged.
    pub fn fatal(mut self) -> Self {
        self.fatal = true;
        self
    }

    /// Override the unhandled flag.
    pub fn with_unhandled(mut self, unhandled: bool) -> Self {
        self.unhandled = unhandled;
        self
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// The explicit status message, if one was set.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// The JSON payload, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Whether the application flagged this error as fatal.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Whether the error was not created through the explicit constructors.
    pub fn is_unhandled(&self) -> bool {
        self.unhandled
    }

    /// The underlying cause, if any.
    pub fn cause(&self) -> Option<&SharedError> {
        self.cause.as_ref()
    }

    /// Walk the message and its cause chain, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut lines = vec![self.message.clone()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let line = err.to_string();
            if lines.last() != Some(&line) {
                lines.push(line);
            }
            source = err.source();
        }
        lines
    }
}

impl Default for HttpError {
    fn default() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

// Boxed errors may already carry an `HttpError`; keep it intact in that case.
impl From<BoxError> for HttpError {
    fn from(err: BoxError) -> Self {
        match err.downcast::<HttpError>() {
            Ok(http) => *http,
            Err(other) => {
                let mut wrapped = Self::internal(other.to_string());
                wrapped.unhandled = true;
                wrapped.cause = Some(Arc::from(other));
                wrapped
            }
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<http::Error> for HttpError {
    fn from(err: http::Error) -> Self {
        Self::from_error(err)
    }
}

/// Errors raised by the raw transport adapters.
#[derive(Error, Debug)]
pub enum TransportError {
    /// `send_response` was called after the response was already written.
    #[error("response has already been sent")]
    AlreadySent,

    /// A buffered read was requested after the body stream was handed out.
    #[error("request body has already been consumed as a stream")]
    BodyConsumed,

    /// Reading the request body from the transport failed.
    #[error("failed to read request body")]
    Body(#[source] BoxError),

    /// The peer went away before the response could be written.
    #[error("connection closed before the response was written")]
    Closed,
}

impl From<TransportError> for HttpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Body(_) => HttpError::new(StatusCode::BAD_REQUEST)
                .with_status_message("Invalid request body")
                .with_cause(err),
            other => HttpError::from_error(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn test_explicit_error_is_handled() {
        let err = HttpError::new(StatusCode::BAD_REQUEST).with_status_message("nope");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.status_message(), Some("nope"));
        assert_eq!(err.message(), "Bad Request");
        assert!(!err.is_unhandled());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_foreign_error_is_unhandled() {
        let err = HttpError::from_error(Boom);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "boom");
        assert!(err.is_unhandled());
        assert!(err.cause().is_some());
    }

    #[test]
    fn test_boxed_http_error_is_preserved() {
        let boxed: BoxError = Box::new(HttpError::new(StatusCode::CONFLICT));
        let err = HttpError::from(boxed);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(!err.is_unhandled());
    }

    #[test]
    fn test_boxed_foreign_error_is_wrapped() {
        let boxed: BoxError = Box::new(Boom);
        let err = HttpError::from(boxed);
        assert!(err.is_unhandled());
        assert_eq!(err.chain(), vec!["boom".to_string()]);
    }

    #[test]
    fn test_panic_payloads() {
        let err = HttpError::from_panic(Box::new("static message"));
        assert_eq!(err.message(), "static message");
        assert!(err.is_unhandled());

        let err = HttpError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.message(), "owned");

        let err = HttpError::from_panic(Box::new(42_u8));
        assert_eq!(err.message(), "handler panicked");
    }

    #[test]
    fn test_unsupported_names_type() {
        let err = HttpError::unsupported("function");
        assert_eq!(
            err.status_message(),
            Some("Cannot send function as response.")
        );
        assert!(err.is_unhandled());
    }

    #[test]
    fn test_chain_includes_cause() {
        let err = HttpError::internal("outer").with_cause(Boom);
        assert_eq!(err.chain(), vec!["outer".to_string(), "boom".to_string()]);
    }

    #[test]
    fn test_transport_body_error_is_bad_request() {
        let err = HttpError::from(TransportError::Body(Box::new(Boom)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = HttpError::from(TransportError::BodyConsumed);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_unhandled());
    }
}
