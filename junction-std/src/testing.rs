//! Testing utilities for Junction.
//!
//! This module provides utilities to make testing middleware, handlers and
//! whole apps easier.
//!
//! # Features
//!
//! - [`plain_event`] / [`event_from`]: build an [`Event`] without a server
//! - [`Journal`]: a shared, ordered log of which stage ran
//! - [`RecordingMiddleware`]: a middleware that records the paths it saw
//! - [`CountingHandler`]: a handler that counts invocations

use crate::adapters::{PlainEvent, PlainRequest};
use junction_core::{Event, Handler, Output};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Event builders
// ============================================================================

/// Build an event over the plain adapter.
///
/// # Panics
///
/// Panics if `method` is not a valid HTTP method token.
pub fn plain_event(method: &str, path: &str) -> Event {
    event_from(PlainRequest::new(method, path))
}

/// Build an event from a full plain request.
///
/// # Panics
///
/// Panics if the request method is not a valid HTTP method token.
pub fn event_from(request: PlainRequest) -> Event {
    Event::new(PlainEvent::new(request).expect("valid test request"))
}

// ============================================================================
// Journal
// ============================================================================

/// A shared, ordered log of labels.
///
/// Hand clones to several middleware to assert the order they ran in.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// A copy of all entries, in order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

// ============================================================================
// Recording Middleware
// ============================================================================

/// A middleware that records every path it receives.
///
/// By default it passes; [`RecordingMiddleware::responding`] makes it answer
/// with a text body instead.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingMiddleware::new("auth");
/// app.use_at("/api", recorder.clone());
///
/// // ... dispatch `/api/users`
///
/// assert_eq!(recorder.paths(), vec!["/users"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingMiddleware {
    label: &'static str,
    paths: Arc<Mutex<Vec<String>>>,
    response: Option<&'static str>,
    journal: Option<Journal>,
}

impl RecordingMiddleware {
    /// Create a passing recorder.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            paths: Arc::new(Mutex::new(Vec::new())),
            response: None,
            journal: None,
        }
    }

    /// Answer with `body` instead of passing.
    pub fn responding(mut self, body: &'static str) -> Self {
        self.response = Some(body);
        self
    }

    /// Also append the label to `journal` on every call.
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// The paths seen so far.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// The number of calls.
    pub fn count(&self) -> usize {
        self.paths.lock().unwrap().len()
    }
}

impl Handler for RecordingMiddleware {
    type Output = Output;

    async fn call(&self, event: Event) -> Output {
        self.paths.lock().unwrap().push(event.path().to_string());
        if let Some(journal) = &self.journal {
            journal.record(self.label);
        }
        match self.response {
            Some(body) => Output::Text(body.to_string()),
            None => Output::Pass,
        }
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations and always passes.
#[derive(Debug, Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

impl Handler for CountingHandler {
    type Output = ();

    async fn call(&self, _event: Event) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
