use junction_core::{Event, Handler};
use tracing::Instrument;

/// A handler wrapper that instruments execution with a `tracing` span.
///
/// The span is named `handler` and records the wrapper's name together with
/// the request method and path. If the request carries a `traceparent`
/// header, its trace id is recorded as well.
pub struct Traced<H> {
    inner: H,
    name: &'static str,
}

impl<H> Traced<H> {
    /// Wrap `inner`.
    pub const fn new(inner: H, name: &'static str) -> Self {
        Self { inner, name }
    }
}

impl<H: Clone> Clone for Traced<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name,
        }
    }
}

impl<H: Copy> Copy for Traced<H> {}

impl<H: Handler> Handler for Traced<H> {
    type Output = H::Output;

    async fn call(&self, event: Event) -> Self::Output {
        let span = match trace_id(&event) {
            Some(trace_id) => tracing::info_span!(
                "handler",
                name = %self.name,
                method = %event.method(),
                path = %event.path(),
                trace_id = %trace_id
            ),
            None => tracing::info_span!(
                "handler",
                name = %self.name,
                method = %event.method(),
                path = %event.path()
            ),
        };

        self.inner.call(event).instrument(span).await
    }
}

// `traceparent: 00-<trace-id>-<parent-id>-<flags>`
fn trace_id(event: &Event) -> Option<String> {
    let header = event.header("traceparent")?;
    header.split('-').nth(1).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{adapters::PlainRequest, testing::event_from};
    use junction_core::{IntoOutput, Output};

    #[derive(Clone, Copy)]
    struct Hello;

    impl Handler for Hello {
        type Output = &'static str;

        async fn call(&self, _event: Event) -> &'static str {
            "hello"
        }
    }

    #[tokio::test]
    async fn test_traced_passthrough() {
        let handler = Traced::new(Hello, "hello");
        let handler = handler.clone();

        let event = event_from(PlainRequest::get("/"));
        let output = handler.call(event).await.into_output();
        assert!(matches!(output, Output::Text(text) if text == "hello"));
    }

    #[tokio::test]
    async fn test_traced_with_traceparent() {
        let handler = Traced::new(Hello, "hello");
        let event = event_from(PlainRequest::get("/").header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        ));

        assert_eq!(
            trace_id(&event).as_deref(),
            Some("4bf92f3577b34da6a3ce929d0e0e4736")
        );
        assert!(!handler.call(event).await.into_output().is_pass());
    }
}
