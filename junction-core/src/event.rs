//! # Event Wrapper
//!
//! [`Event`] is the transport-agnostic facade handed to every hook,
//! middleware and route handler. It wraps exactly one [`RawEvent`] and adds
//! a per-request [`Context`].
//!
//! # Views
//!
//! An `Event` is a cheap handle (`Arc` inside). Scoped middleware receive a
//! *view* created with [`Event::with_path`]: the same request and context,
//! but a different visible path. The path of a view is immutable, so no
//! stage ever has to restore a path after a nested handler ran.
//!
//! # Body access
//!
//! The wrapper never buffers anything itself. Every body accessor delegates
//! to the memoized readers of the underlying `RawEvent`.

use crate::{
    body::{BodyStream, FormData},
    error::{HttpError, TransportError},
    raw::RawEvent,
    response::{NormalizedResponse, ResponseState},
};
use bytes::Bytes;
use http::{
    Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header::AsHeaderName,
};
use serde::de::DeserializeOwned;
use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

/// Route parameters captured by the route table, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no parameter was captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// The route-table entry that matched the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    /// The registered pattern, e.g. `/users/:id`.
    pub pattern: String,
}

/// Per-request state shared by every stage.
///
/// The router writes `params` and `matched_route`; middleware can stash
/// arbitrary typed values in `extensions`.
#[derive(Debug, Default)]
pub struct Context {
    /// Captured route parameters.
    pub params: Params,
    /// The matched route, once the route stage ran.
    pub matched_route: Option<MatchedRoute>,
    /// Free-form typed values.
    pub extensions: Extensions,
}

struct Shared {
    raw: Box<dyn RawEvent>,
    context: Mutex<Context>,
}

/// The user-facing request/response handle.
#[derive(Clone)]
pub struct Event {
    shared: Arc<Shared>,
    path: Arc<str>,
    url: Arc<OnceLock<String>>,
}

impl Event {
    /// Wrap a raw transport event.
    pub fn new<R: RawEvent>(raw: R) -> Self {
        Self::from_boxed(Box::new(raw))
    }

    /// Wrap an already boxed raw event.
    pub fn from_boxed(raw: Box<dyn RawEvent>) -> Self {
        let path = normalize_target(raw.path());
        Self {
            shared: Arc::new(Shared {
                raw,
                context: Mutex::new(Context::default()),
            }),
            path,
            url: Arc::new(OnceLock::new()),
        }
    }

    /// A view of the same request with a different visible path.
    pub fn with_path(&self, path: &str) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            path: normalize_target(path),
            url: Arc::new(OnceLock::new()),
        }
    }

    /// The underlying transport event.
    pub fn raw(&self) -> &dyn RawEvent {
        &*self.shared.raw
    }

    // ------------------------------------------------------------------
    // Request view
    // ------------------------------------------------------------------

    /// The upper-case request method.
    pub fn method(&self) -> &Method {
        self.shared.raw.method()
    }

    /// The visible path, including the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path as received from the transport, regardless of view.
    pub fn original_path(&self) -> &str {
        self.shared.raw.path()
    }

    /// The visible path without the query string.
    pub fn pathname(&self) -> &str {
        split_query(&self.path).0
    }

    /// Decoded query pairs, in order.
    pub fn query(&self) -> Vec<(String, String)> {
        split_query(&self.path)
            .1
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default()
    }

    /// The absolute URL of the visible path.
    pub fn url(&self) -> &str {
        self.url.get_or_init(|| {
            let headers = self.headers();
            let text = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
            };
            let scheme = text("x-forwarded-proto").unwrap_or("http");
            let host = text("x-forwarded-host")
                .or_else(|| text("host"))
                .unwrap_or("localhost");
            format!("{scheme}://{host}{}", self.path)
        })
    }

    /// Request headers (read-only).
    pub fn headers(&self) -> &HeaderMap {
        self.shared.raw.headers()
    }

    /// A request header as text. Absent or non-UTF-8 headers yield `None`.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    // ------------------------------------------------------------------
    // Context
    // ------------------------------------------------------------------

    /// Lock the per-request context.
    pub fn context(&self) -> MutexGuard<'_, Context> {
        self.shared
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The captured route parameters.
    pub fn params(&self) -> Params {
        self.context().params.clone()
    }

    /// A single route parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        self.context().params.get(name).map(str::to_string)
    }

    /// The matched route, once the route stage ran.
    pub fn matched_route(&self) -> Option<MatchedRoute> {
        self.context().matched_route.clone()
    }

    /// Store a typed value in the context.
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&self, value: T) -> Option<T> {
        self.context().extensions.insert(value)
    }

    /// Fetch a typed value from the context.
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.context().extensions.get::<T>().cloned()
    }

    // ------------------------------------------------------------------
    // Body
    // ------------------------------------------------------------------

    /// Read the whole body.
    pub async fn read_raw_body(&self) -> Result<Option<Bytes>, HttpError> {
        self.shared.raw.read_raw_body().await
    }

    /// Read the body as text.
    pub async fn read_text_body(&self) -> Result<Option<String>, HttpError> {
        self.shared.raw.read_text_body().await
    }

    /// Read the body as urlencoded form data.
    pub async fn read_form_data(&self) -> Result<FormData, HttpError> {
        self.shared.raw.read_form_data().await
    }

    /// Take the body as a stream.
    pub fn read_body_stream(&self) -> Option<BodyStream> {
        self.shared.raw.read_body_stream()
    }

    /// Decode the body as JSON.
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        let text = self.read_text_body().await?.unwrap_or_default();
        serde_json::from_str(&text).map_err(|err| {
            HttpError::new(StatusCode::BAD_REQUEST)
                .with_status_message("Invalid JSON body")
                .with_cause(err)
        })
    }

    // ------------------------------------------------------------------
    // Response
    // ------------------------------------------------------------------

    fn response(&self) -> MutexGuard<'_, ResponseState> {
        self.shared
            .raw
            .response_state()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the response status and, optionally, its reason phrase.
    pub fn set_response_status(&self, status: StatusCode, text: Option<&str>) {
        let mut state = self.response();
        state.status = Some(status);
        state.status_text = text.map(str::to_string);
    }

    /// Set a response header, replacing previous values.
    pub fn set_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.response().set_header(name, value);
    }

    /// Append a response header, keeping previous values.
    pub fn append_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.response().append_header(name, value);
    }

    /// Remove a response header.
    pub fn remove_response_header(&self, name: &HeaderName) {
        self.response().remove_header(name);
    }

    /// A snapshot of the response descriptor.
    pub fn response_state(&self) -> ResponseState {
        self.response().clone()
    }

    /// Whether the response has already been written.
    pub fn handled(&self) -> bool {
        self.shared.raw.handled()
    }

    /// Whether the client aborted a streamed response.
    pub fn is_aborted(&self) -> bool {
        self.shared.raw.is_aborted()
    }

    /// Write the response directly, bypassing normalization.
    pub async fn send(&self, response: NormalizedResponse) -> Result<(), TransportError> {
        self.shared.raw.send_response(response).await
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("transport", &self.shared.raw.transport())
            .field("method", self.method())
            .field("path", &self.path)
            .finish()
    }
}

fn split_query(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

// Visible paths always start with `/`, so `"?a=1"` becomes `"/?a=1"`.
fn normalize_target(target: &str) -> Arc<str> {
    if target.starts_with('/') {
        Arc::from(target)
    } else {
        Arc::from(format!("/{target}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubEvent {
        method: Method,
        path: String,
        headers: HeaderMap,
        body: BodyCache,
        response: Mutex<ResponseState>,
        handled: AtomicBool,
    }

    impl StubEvent {
        fn new(path: &str) -> Self {
            let mut headers = HeaderMap::new();
            headers.insert("host", HeaderValue::from_static("example.com"));
            Self {
                method: Method::GET,
                path: path.to_string(),
                headers,
                body: BodyCache::buffered(Some(Bytes::from_static(b"{\"n\":1}"))),
                response: Mutex::new(ResponseState::default()),
                handled: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl RawEvent for StubEvent {
        fn transport(&self) -> &'static str {
            "stub"
        }
        fn method(&self) -> &Method {
            &self.method
        }
        fn path(&self) -> &str {
            &self.path
        }
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }
        fn body(&self) -> &BodyCache {
            &self.body
        }
        fn response_state(&self) -> &Mutex<ResponseState> {
            &self.response
        }
        fn handled(&self) -> bool {
            self.handled.load(Ordering::Acquire)
        }
        async fn send_response(&self, _response: NormalizedResponse) -> Result<(), TransportError> {
            if self.handled.swap(true, Ordering::AcqRel) {
                return Err(TransportError::AlreadySent);
            }
            Ok(())
        }
    }

    #[test]
    fn test_path_views_share_context() {
        let event = Event::new(StubEvent::new("/api/users?page=2"));
        let view = event.with_path("/users?page=2");

        assert_eq!(event.pathname(), "/api/users");
        assert_eq!(view.pathname(), "/users");
        assert_eq!(view.original_path(), "/api/users?page=2");

        view.insert_extension(7_u32);
        assert_eq!(event.extension::<u32>(), Some(7));
    }

    #[test]
    fn test_query_and_url() {
        let event = Event::new(StubEvent::new("/search?q=rust+lang&tag=a&tag=b"));
        assert_eq!(
            event.query(),
            vec![
                ("q".to_string(), "rust lang".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(
            event.url(),
            "http://example.com/search?q=rust+lang&tag=a&tag=b"
        );
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let event = Event::new(StubEvent::new("/"));
        assert_eq!(event.header("HOST"), Some("example.com"));
        assert_eq!(event.header("x-missing"), None);
    }

    #[test]
    fn test_query_only_target_gets_slash() {
        let event = Event::new(StubEvent::new("/"));
        let view = event.with_path("?a=1");
        assert_eq!(view.path(), "/?a=1");
        assert_eq!(view.pathname(), "/");
    }

    #[tokio::test]
    async fn test_read_json() {
        #[derive(serde::Deserialize)]
        struct Payload {
            n: u32,
        }
        let event = Event::new(StubEvent::new("/"));
        let payload: Payload = event.read_json().await.unwrap();
        assert_eq!(payload.n, 1);
    }

    #[tokio::test]
    async fn test_send_is_single_shot() {
        let event = Event::new(StubEvent::new("/"));
        event.send(NormalizedResponse::default()).await.unwrap();
        assert!(event.handled());
        assert!(matches!(
            event.send(NormalizedResponse::default()).await,
            Err(TransportError::AlreadySent)
        ));
    }

    #[test]
    fn test_response_descriptor() {
        let event = Event::new(StubEvent::new("/"));
        event.set_response_status(StatusCode::CREATED, Some("Made"));
        event.append_response_header(
            http::header::SET_COOKIE,
            HeaderValue::from_static("a=1"),
        );
        event.append_response_header(
            http::header::SET_COOKIE,
            HeaderValue::from_static("b=2"),
        );
        let state = event.response_state();
        assert_eq!(state.status, Some(StatusCode::CREATED));
        assert_eq!(state.status_text.as_deref(), Some("Made"));
        assert_eq!(state.headers.get_all("set-cookie").iter().count(), 2);
    }
}
