//! Plain adapter: transport-free request/response records.
//!
//! Useful for tests, serverless shims and anything that already has the
//! request in memory. Streamed responses are drained into memory.

use super::{RequestParts, ResponseSlot, fill_slot, take_slot, unsent_response};
use crate::errors::error_response;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{FutureExt, future::BoxFuture};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use junction_core::{
    BodyCache, Dispatcher, Event, HttpError, NormalizedResponse, RawEvent, ResponseBody,
    ResponseState, TransportError,
};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};

const TRANSPORT: &str = "plain";

/// A request held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainRequest {
    /// Request method, any case.
    pub method: String,
    /// Request target (path and query).
    pub path: String,
    /// Header pairs, in order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Bytes>,
}

impl PlainRequest {
    /// A request with no headers and no body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// A `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// A `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and its content type.
    pub fn json(self, value: &serde_json::Value) -> Self {
        self.header("content-type", "application/json")
            .body(value.to_string())
    }
}

/// A response held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlainResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase.
    pub status_text: String,
    /// Header pairs; repeated headers appear once per value.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: Bytes,
}

impl PlainResponse {
    /// The first value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, case-insensitive.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body as text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    async fn from_normalized(response: NormalizedResponse) -> Self {
        let NormalizedResponse {
            status,
            status_text,
            headers,
            body,
            ..
        } = response;
        match body.collect().await {
            Ok(body) => Self::from_parts(status, status_text, &headers, body),
            Err(err) => {
                tracing::error!(transport = TRANSPORT, error = %err, "response stream failed");
                let failed = error_response(HttpError::from(err), &ResponseState::default(), false);
                let body = match failed.body {
                    ResponseBody::Bytes(bytes) => bytes,
                    _ => Bytes::new(),
                };
                Self::from_parts(failed.status, failed.status_text, &failed.headers, body)
            }
        }
    }

    fn from_parts(status: StatusCode, status_text: String, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            status: status.as_u16(),
            status_text,
            headers: headers
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body,
        }
    }
}

/// A request arriving through the plain adapter.
pub struct PlainEvent {
    parts: RequestParts,
    slot: ResponseSlot,
}

impl PlainEvent {
    /// Wrap a plain request.
    ///
    /// The method is upper-cased; an invalid method is a 400. Invalid header
    /// names or values are skipped.
    pub fn new(request: PlainRequest) -> Result<Self, HttpError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|err| {
                HttpError::new(StatusCode::BAD_REQUEST)
                    .with_status_message("Invalid request method")
                    .with_cause(err)
            })?;

        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::warn!(transport = TRANSPORT, header = %name, "skipping invalid header"),
            }
        }

        let path = if request.path.is_empty() {
            "/".to_string()
        } else {
            request.path
        };

        Ok(Self {
            parts: RequestParts::new(method, path, headers, BodyCache::buffered(request.body)),
            slot: ResponseSlot::default(),
        })
    }

    fn slot(&self) -> ResponseSlot {
        Arc::clone(&self.slot)
    }
}

#[async_trait]
impl RawEvent for PlainEvent {
    fn transport(&self) -> &'static str {
        TRANSPORT
    }

    fn method(&self) -> &Method {
        &self.parts.method
    }

    fn path(&self) -> &str {
        &self.parts.path
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn body(&self) -> &BodyCache {
        &self.parts.body
    }

    fn response_state(&self) -> &Mutex<ResponseState> {
        &self.parts.response
    }

    fn handled(&self) -> bool {
        self.parts.handled()
    }

    async fn send_response(&self, response: NormalizedResponse) -> Result<(), TransportError> {
        self.parts.claim(TRANSPORT)?;
        fill_slot(&self.slot, response);
        Ok(())
    }
}

/// Wrap a dispatcher into a `PlainRequest -> PlainResponse` function.
pub fn plain_handler<D: Dispatcher>(
    dispatcher: Arc<D>,
) -> impl Fn(PlainRequest) -> BoxFuture<'static, PlainResponse> + Clone + Send + Sync + 'static {
    move |request| {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            let raw = match PlainEvent::new(request) {
                Ok(raw) => raw,
                Err(err) => {
                    let rejected = error_response(err, &ResponseState::default(), false);
                    return PlainResponse::from_normalized(rejected).await;
                }
            };
            let slot = raw.slot();
            let path = raw.parts.path.clone();

            dispatcher.dispatch(Event::new(raw)).await;

            let response = take_slot(&slot).unwrap_or_else(|| unsent_response(TRANSPORT, &path));
            PlainResponse::from_normalized(response).await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_is_upper_cased() {
        let event = PlainEvent::new(PlainRequest::new("patch", "/x")).unwrap();
        assert_eq!(event.method(), Method::PATCH);
    }

    #[test]
    fn test_invalid_method_is_rejected() {
        let err = PlainEvent::new(PlainRequest::new("GE T", "/")).err().unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let request = PlainRequest::get("/")
            .header("x-ok", "yes")
            .header("bad header", "x")
            .header("x-bad-value", "line\nbreak");
        let event = PlainEvent::new(request).unwrap();
        assert_eq!(event.headers().len(), 1);
        assert_eq!(event.headers()["x-ok"], "yes");
    }

    #[test]
    fn test_empty_path_is_root() {
        let event = PlainEvent::new(PlainRequest::get("")).unwrap();
        assert_eq!(event.path(), "/");
    }

    #[tokio::test]
    async fn test_stream_is_drained() {
        let mut response = NormalizedResponse {
            body: ResponseBody::stream(futures::stream::iter(vec![
                Ok::<_, junction_core::BoxError>(Bytes::from_static(b"he")),
                Ok(Bytes::from_static(b"llo")),
            ])),
            ..Default::default()
        };
        response.headers.append("set-cookie", HeaderValue::from_static("a=1"));
        response.headers.append("set-cookie", HeaderValue::from_static("b=2"));

        let plain = PlainResponse::from_normalized(response).await;
        assert_eq!(plain.text(), "hello");
        assert_eq!(plain.header_values("Set-Cookie").count(), 2);
    }

    #[tokio::test]
    async fn test_failed_stream_becomes_error() {
        let response = NormalizedResponse {
            body: ResponseBody::stream(futures::stream::iter(vec![Err::<Bytes, _>(
                junction_core::BoxError::from("disk gone"),
            )])),
            ..Default::default()
        };
        let plain = PlainResponse::from_normalized(response).await;
        assert_eq!(plain.status, 500);
        assert_eq!(plain.header("content-type"), Some("application/json"));
    }
}
