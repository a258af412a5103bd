//! Fetch-style adapter: one request in, one complete response out.
//!
//! Works with any `http::Request<B>` whose body implements `http_body::Body`.
//! The optional [`Extensions`] passed next to the request (platform context
//! such as bindings or a client address) are merged into the event context,
//! together with the request's own extensions.

use super::{
    RequestParts, ResponseSlot, fill_slot, take_slot, unsent_response,
    body::{HttpBody, body_stream, http_response},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{FutureExt, future::BoxFuture};
use http::{Extensions, HeaderMap, Method, Request, Response};
use hyper::body::Body;
use junction_core::{
    BodyCache, BoxError, Dispatcher, Event, NormalizedResponse, RawEvent, ResponseState,
    TransportError,
};
use std::sync::{Arc, Mutex};

const TRANSPORT: &str = "web";

/// A request arriving through a fetch-style runtime.
pub struct WebEvent {
    parts: RequestParts,
    slot: ResponseSlot,
}

impl WebEvent {
    fn new<B>(head: http::request::Parts, body: B) -> (Self, ResponseSlot)
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let path = head
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());
        let slot = ResponseSlot::default();
        let event = Self {
            parts: RequestParts::new(
                head.method,
                path,
                head.headers,
                BodyCache::new(Some(body_stream(body))),
            ),
            slot: Arc::clone(&slot),
        };
        (event, slot)
    }
}

#[async_trait]
impl RawEvent for WebEvent {
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

/// Wrap a dispatcher into a fetch-style handler.
pub fn web_handler<D, B>(
    dispatcher: Arc<D>,
) -> impl Fn(Request<B>, Option<Extensions>) -> BoxFuture<'static, Response<HttpBody>>
+ Clone
+ Send
+ Sync
+ 'static
where
    D: Dispatcher,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    move |request, context| {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            let (mut head, body) = request.into_parts();
            let extensions = std::mem::take(&mut head.extensions);
            let (raw, slot) = WebEvent::new(head, body);
            let path = raw.parts.path.clone();

            let event = Event::new(raw);
            {
                let mut ctx = event.context();
                ctx.extensions.extend(extensions);
                if let Some(context) = context {
                    ctx.extensions.extend(context);
                }
            }
            dispatcher.dispatch(event).await;

            let response = take_slot(&slot).unwrap_or_else(|| unsent_response(TRANSPORT, &path));
            http_response(response, None)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    #[tokio::test]
    async fn test_send_fills_slot_once() {
        let request = Request::builder()
            .uri("/a?b=c")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let (head, body) = request.into_parts();
        let (event, slot) = WebEvent::new(head, body);

        assert_eq!(event.path(), "/a?b=c");
        event
            .send_response(NormalizedResponse::default())
            .await
            .unwrap();
        assert!(matches!(
            event.send_response(NormalizedResponse::default()).await,
            Err(TransportError::AlreadySent)
        ));
        assert!(take_slot(&slot).is_some());
        assert!(take_slot(&slot).is_none());
    }

    #[tokio::test]
    async fn test_empty_body_reads_as_none() {
        let request = Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let (head, body) = request.into_parts();
        let (event, _slot) = WebEvent::new(head, body);
        assert_eq!(event.read_raw_body().await.unwrap(), None);
    }
}
