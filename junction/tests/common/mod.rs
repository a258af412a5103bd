#![allow(dead_code)]

use junction::{App, PlainRequest, PlainResponse};
use std::{
    fmt,
    sync::{Arc, Mutex, Once},
};
use tracing::{Level, field::Field, subscriber::DefaultGuard};
use tracing_subscriber::{
    layer::{Context, Layer, SubscriberExt},
    registry::Registry,
};

// ============================================================================
// Tracing
// ============================================================================

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Collects `ERROR` events as `field=value` lines.
#[derive(Clone, Default)]
pub struct ErrorLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ErrorLog {
    /// Capture error events on the current thread until the guard drops.
    pub fn capture() -> (Self, DefaultGuard) {
        let log = Self::default();
        let guard = tracing::subscriber::set_default(Registry::default().with(log.clone()));
        (log, guard)
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl<S: tracing::Subscriber> Layer<S> for ErrorLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut fields = Vec::new();
        let mut visit = |field: &Field, value: &dyn fmt::Debug| {
            fields.push(format!("{}={:?}", field.name(), value));
        };
        event.record(&mut visit);
        self.lines.lock().unwrap().push(fields.join(" "));
    }
}

// ============================================================================
// Plain Round Trips
// ============================================================================

/// Dispatch one request through the plain adapter.
pub async fn send(app: App, request: PlainRequest) -> PlainResponse {
    init_tracing();
    let handler = app.into_shared().plain_handler();
    handler(request).await
}

/// Decode a JSON response body.
pub fn json(response: &PlainResponse) -> serde_json::Value {
    response.json().expect("response body is JSON")
}
