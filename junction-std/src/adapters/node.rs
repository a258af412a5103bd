//! Node-style adapter over a streaming hyper server.
//!
//! The response head is handed to hyper as soon as the dispatcher calls
//! `send_response`; dispatch itself runs in its own task, so lifecycle hooks
//! that run after the write do not delay the client. Streamed bodies are
//! proxied chunk by chunk and the event is marked aborted when hyper drops
//! the body early.
//!
//! ```rust,no_run
//! # async fn serve(app: std::sync::Arc<impl junction_core::Dispatcher>) -> std::io::Result<()> {
//! use hyper::{server::conn::http1, service::service_fn};
//! use hyper_util::rt::TokioIo;
//! use junction_std::adapters::node_handler;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! let handler = node_handler(app);
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     let handler = handler.clone();
//!     tokio::spawn(async move {
//!         let _ = http1::Builder::new()
//!             .serve_connection(TokioIo::new(stream), service_fn(handler))
//!             .await;
//!     });
//! }
//! # }
//! ```

use super::{
    RequestParts, unsent_response,
    body::{HttpBody, body_stream, http_response},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{FutureExt, future::BoxFuture};
use http::{HeaderMap, Method, Request, Response};
use hyper::body::{Body, Incoming};
use junction_core::{
    BodyCache, BoxError, Dispatcher, Event, NormalizedResponse, RawEvent, ResponseState,
    TransportError,
};
use std::{
    convert::Infallible,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::oneshot;

const TRANSPORT: &str = "node";

/// A request arriving through a streaming hyper server.
pub struct NodeEvent {
    parts: RequestParts,
    aborted: Arc<AtomicBool>,
    sender: Mutex<Option<oneshot::Sender<Response<HttpBody>>>>,
}

impl NodeEvent {
    /// Wrap a request. The receiver yields the response once it is sent.
    pub fn new<B>(request: Request<B>) -> (Self, oneshot::Receiver<Response<HttpBody>>)
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (head, body) = request.into_parts();
        let path = head
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());
        let (sender, receiver) = oneshot::channel();
        let event = Self {
            parts: RequestParts::new(
                head.method,
                path,
                head.headers,
                BodyCache::new(Some(body_stream(body))),
            ),
            aborted: Arc::new(AtomicBool::new(false)),
            sender: Mutex::new(Some(sender)),
        };
        (event, receiver)
    }
}

#[async_trait]
impl RawEvent for NodeEvent {
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

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    async fn send_response(&self, response: NormalizedResponse) -> Result<(), TransportError> {
        self.parts.claim(TRANSPORT)?;
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(TransportError::AlreadySent)?;
        sender
            .send(http_response(response, Some(Arc::clone(&self.aborted))))
            .map_err(|_| {
                self.aborted.store(true, Ordering::Release);
                TransportError::Closed
            })
    }
}

/// Wrap a dispatcher into a hyper service function.
///
/// The returned closure plugs into `hyper::service::service_fn`.
pub fn node_handler<D: Dispatcher>(
    dispatcher: Arc<D>,
) -> impl Fn(Request<Incoming>) -> BoxFuture<'static, Result<Response<HttpBody>, Infallible>>
+ Clone
+ Send
+ Sync
+ 'static {
    move |request| {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            let (event, receiver) = NodeEvent::new(request);
            let path = event.parts.path.clone();
            tokio::spawn(async move { dispatcher.dispatch(Event::new(event)).await });
            match receiver.await {
                Ok(response) => Ok(response),
                Err(_) => Ok(http_response(unsent_response(TRANSPORT, &path), None)),
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use junction_core::ResponseBody;

    fn request(body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri("/upload?x=1")
            .header("content-type", "text/plain")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_view() {
        let (event, _receiver) = NodeEvent::new(request("hi"));
        assert_eq!(event.method(), Method::POST);
        assert_eq!(event.path(), "/upload?x=1");
        assert_eq!(event.headers()["content-type"], "text/plain");
        assert_eq!(
            event.read_text_body().await.unwrap().as_deref(),
            Some("hi")
        );
    }

    #[tokio::test]
    async fn test_send_once() {
        let (event, receiver) = NodeEvent::new(request(""));
        let response = NormalizedResponse {
            body: ResponseBody::from("done"),
            ..Default::default()
        };
        event.send_response(response).await.unwrap();
        assert!(event.handled());
        assert!(matches!(
            event.send_response(NormalizedResponse::default()).await,
            Err(TransportError::AlreadySent)
        ));

        let response = receiver.await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "done");
    }

    #[tokio::test]
    async fn test_closed_receiver() {
        let (event, receiver) = NodeEvent::new(request(""));
        drop(receiver);
        assert!(matches!(
            event.send_response(NormalizedResponse::default()).await,
            Err(TransportError::Closed)
        ));
        assert!(event.is_aborted());
    }
}
