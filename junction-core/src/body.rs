//! Request and response bodies.
//!
//! Transports hand their request body to a [`BodyCache`], which owns the
//! single-consumption guard: the underlying stream is read at most once and
//! every reader (`raw`, `text`, `form`) is memoized independently.

use crate::error::{BoxError, HttpError, TransportError};
use bytes::{Bytes, BytesMut};
use futures::{
    StreamExt, TryStreamExt,
    stream::{self, BoxStream},
};
use std::{
    fmt,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::OnceCell;

/// A streamed body: a sequence of byte chunks that may fail.
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// The body of an outgoing response.
#[derive(Default)]
pub enum ResponseBody {
    /// No body.
    #[default]
    Empty,
    /// A fully buffered body.
    Bytes(Bytes),
    /// A body proxied chunk by chunk.
    Stream(BodyStream),
}

impl ResponseBody {
    /// Create a streamed body.
    pub fn stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }

    /// The exact length, when known up front.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(bytes) => Some(bytes.len()),
            Self::Stream(_) => None,
        }
    }

    /// Whether the body is known to be empty.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Drain the body into memory.
    pub async fn collect(self) -> Result<Bytes, BoxError> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Bytes(bytes) => Ok(bytes),
            Self::Stream(stream) => collect_stream(stream).await,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

async fn collect_stream(stream: BodyStream) -> Result<Bytes, BoxError> {
    let buffer = stream
        .try_fold(BytesMut::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await?;
    Ok(buffer.freeze())
}

/// Decoded `application/x-www-form-urlencoded` pairs, in body order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    /// Parse an urlencoded payload.
    pub fn parse(input: &[u8]) -> Self {
        Self {
            fields: url::form_urlencoded::parse(input).into_owned().collect(),
        }
    }

    /// The first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value for `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over all pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the form is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Memoized, consume-once access to a request body.
///
/// `read_raw` drains the transport stream the first time and caches the
/// bytes. `read_text` and `read_form` decode the cached bytes. `take_stream`
/// hands out the transport stream when nothing was buffered yet, or replays
/// the buffer otherwise.
pub struct BodyCache {
    source: Mutex<Option<BodyStream>>,
    streamed: AtomicBool,
    raw: OnceCell<Result<Option<Bytes>, HttpError>>,
    text: OnceCell<Result<Option<String>, HttpError>>,
    form: OnceCell<Result<FormData, HttpError>>,
}

impl BodyCache {
    /// Cache over a transport stream that has not been read yet.
    pub fn new(source: Option<BodyStream>) -> Self {
        Self {
            source: Mutex::new(source),
            streamed: AtomicBool::new(false),
            raw: OnceCell::new(),
            text: OnceCell::new(),
            form: OnceCell::new(),
        }
    }

    /// Cache over a body that is already in memory.
    pub fn buffered(body: Option<Bytes>) -> Self {
        let body = body.filter(|b| !b.is_empty());
        Self {
            source: Mutex::new(None),
            streamed: AtomicBool::new(false),
            raw: OnceCell::new_with(Some(Ok(body))),
            text: OnceCell::new(),
            form: OnceCell::new(),
        }
    }

    /// Read the whole body. Empty bodies read as `None`.
    pub async fn read_raw(&self) -> Result<Option<Bytes>, HttpError> {
        self.raw
            .get_or_init(|| async {
                let source = self
                    .source
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                match source {
                    Some(stream) => collect_stream(stream)
                        .await
                        .map(|bytes| Some(bytes).filter(|b| !b.is_empty()))
                        .map_err(|e| HttpError::from(TransportError::Body(e))),
                    None if self.streamed.load(Ordering::Acquire) => {
                        Err(TransportError::BodyConsumed.into())
                    }
                    None => Ok(None),
                }
            })
            .await
            .clone()
    }

    /// Read the body as UTF-8 text (lossy).
    pub async fn read_text(&self) -> Result<Option<String>, HttpError> {
        self.text
            .get_or_init(|| async {
                let raw = self.read_raw().await?;
                Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
            })
            .await
            .clone()
    }

    /// Read the body as urlencoded form data.
    pub async fn read_form(&self) -> Result<FormData, HttpError> {
        self.form
            .get_or_init(|| async {
                let raw = self.read_raw().await?;
                Ok(raw.map(|bytes| FormData::parse(&bytes)).unwrap_or_default())
            })
            .await
            .clone()
    }

    /// Hand out the body as a stream.
    pub fn take_stream(&self) -> Option<BodyStream> {
        if let Some(Ok(buffered)) = self.raw.get() {
            let replay = buffered.clone()?;
            return Some(stream::once(async move { Ok(replay) }).boxed());
        }
        let source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if source.is_some() {
            self.streamed.store(true, Ordering::Release);
        }
        source
    }
}

impl fmt::Debug for BodyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyCache")
            .field("streamed", &self.streamed.load(Ordering::Relaxed))
            .field("buffered", &self.raw.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn counted_stream(chunks: Vec<&'static str>, polls: Arc<AtomicUsize>) -> BodyStream {
        stream::iter(chunks)
            .map(move |chunk| {
                polls.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(chunk.as_bytes()))
            })
            .boxed()
    }

    #[tokio::test]
    async fn test_raw_body_is_memoized() {
        let polls = Arc::new(AtomicUsize::new(0));
        let cache = BodyCache::new(Some(counted_stream(vec!["he", "llo"], polls.clone())));

        let first = cache.read_raw().await.unwrap();
        let second = cache.read_raw().await.unwrap();

        assert_eq!(first, Some(Bytes::from_static(b"hello")));
        assert_eq!(first, second);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_text_after_raw_uses_buffer() {
        let polls = Arc::new(AtomicUsize::new(0));
        let cache = BodyCache::new(Some(counted_stream(vec!["hi"], polls.clone())));

        cache.read_raw().await.unwrap();
        let text = cache.read_text().await.unwrap();

        assert_eq!(text.as_deref(), Some("hi"));
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_replays_buffer() {
        let cache = BodyCache::buffered(Some(Bytes::from_static(b"abc")));
        let stream = cache.take_stream().unwrap();
        let collected = collect_stream(stream).await.unwrap();
        assert_eq!(collected, Bytes::from_static(b"abc"));
        // Still readable afterwards.
        assert_eq!(
            cache.read_raw().await.unwrap(),
            Some(Bytes::from_static(b"abc"))
        );
    }

    #[tokio::test]
    async fn test_raw_after_stream_is_consumed_error() {
        let polls = Arc::new(AtomicUsize::new(0));
        let cache = BodyCache::new(Some(counted_stream(vec!["x"], polls)));

        assert!(cache.take_stream().is_some());
        assert!(cache.take_stream().is_none());

        let err = cache.read_raw().await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_empty_body_reads_as_none() {
        let cache = BodyCache::buffered(Some(Bytes::new()));
        assert_eq!(cache.read_raw().await.unwrap(), None);
        assert_eq!(cache.read_text().await.unwrap(), None);
        assert!(cache.read_form().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_form_decoding() {
        let cache = BodyCache::buffered(Some(Bytes::from_static(b"a=1&b=two+words&a=3")));
        let form = cache.read_form().await.unwrap();
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), Some("two words"));
        assert_eq!(form.get_all("a").collect::<Vec<_>>(), vec!["1", "3"]);
        assert_eq!(form.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_stream_surfaces_bad_request() {
        let stream: BodyStream = stream::iter(vec![Err::<Bytes, BoxError>("reset".into())]).boxed();
        let cache = BodyCache::new(Some(stream));
        let err = cache.read_raw().await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }
}
