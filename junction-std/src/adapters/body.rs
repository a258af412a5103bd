//! Conversions between `http-body` bodies and junction bodies.

use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use http::Response;
use http_body_util::{BodyDataStream, BodyExt, Empty, Full, StreamBody, combinators::UnsyncBoxBody};
use hyper::body::{Body, Frame};
use junction_core::{BodyStream, BoxError, NormalizedResponse, ResponseBody, reason_phrase};
use std::{
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll},
};

/// The response body type produced by the node and web adapters.
pub type HttpBody = UnsyncBoxBody<Bytes, BoxError>;

/// Turn any `http-body` body into a chunk stream.
pub fn body_stream<B>(body: B) -> BodyStream
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    BodyDataStream::new(body).map_err(Into::into).boxed()
}

/// Build an `http-body` body from a junction body.
///
/// When `aborted` is given, a streamed body that is dropped before its end
/// (client went away) sets the flag.
pub fn http_body(body: ResponseBody, aborted: Option<Arc<AtomicBool>>) -> HttpBody {
    match body {
        ResponseBody::Empty => Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync(),
        ResponseBody::Bytes(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed_unsync(),
        ResponseBody::Stream(stream) => {
            let stream: BodyStream = match aborted {
                Some(flag) => AbortOnDrop::new(stream, flag).boxed(),
                None => stream,
            };
            StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
        }
    }
}

/// Build an `http::Response` from a normalized response.
///
/// A non-canonical reason phrase travels as a `hyper::ext::ReasonPhrase`
/// extension; the originating error, if any, as an `HttpError` extension.
pub fn http_response(
    response: NormalizedResponse,
    aborted: Option<Arc<AtomicBool>>,
) -> Response<HttpBody> {
    let NormalizedResponse {
        status,
        status_text,
        headers,
        body,
        error,
    } = response;

    let mut out = Response::new(http_body(body, aborted));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    if !status_text.is_empty() && status_text != reason_phrase(status) {
        if let Ok(phrase) = hyper::ext::ReasonPhrase::try_from(status_text.into_bytes()) {
            out.extensions_mut().insert(phrase);
        }
    }
    if let Some(error) = error {
        out.extensions_mut().insert(error);
    }
    out
}

// ============================================================================
// Abort detection
// ============================================================================

struct AbortOnDrop {
    inner: BodyStream,
    finished: bool,
    aborted: Arc<AtomicBool>,
}

impl AbortOnDrop {
    fn new(inner: BodyStream, aborted: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            finished: false,
            aborted,
        }
    }
}

impl Stream for AbortOnDrop {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.poll_next_unpin(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            self.finished = true;
        }
        polled
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.finished {
            self.aborted.store(true, Ordering::Release);
            tracing::debug!("response stream dropped before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&'static str]) -> BodyStream {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, BoxError>(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
        .boxed()
    }

    #[tokio::test]
    async fn test_stream_round_trip() {
        let body = http_body(ResponseBody::Stream(chunks(&["a", "b"])), None);
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, "ab");

        let stream = body_stream(Full::new(Bytes::from_static(b"xyz")));
        let collected = ResponseBody::Stream(stream).collect().await.unwrap();
        assert_eq!(collected, "xyz");
    }

    #[tokio::test]
    async fn test_dropped_stream_sets_abort_flag() {
        let aborted = Arc::new(AtomicBool::new(false));
        let body = http_body(ResponseBody::Stream(chunks(&["a", "b"])), Some(aborted.clone()));
        drop(body);
        assert!(aborted.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_finished_stream_is_not_aborted() {
        let aborted = Arc::new(AtomicBool::new(false));
        let body = http_body(ResponseBody::Stream(chunks(&["a"])), Some(aborted.clone()));
        body.collect().await.unwrap();
        assert!(!aborted.load(Ordering::Acquire));
    }

    #[test]
    fn test_custom_reason_phrase() {
        let response = http_response(
            NormalizedResponse {
                status: http::StatusCode::OK,
                status_text: "All Good".to_string(),
                ..Default::default()
            },
            None,
        );
        let phrase = response.extensions().get::<hyper::ext::ReasonPhrase>().unwrap();
        assert_eq!(phrase.as_bytes(), b"All Good");
    }
}
