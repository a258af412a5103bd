//! Handler output conversion.
//!
//! Every handler and middleware produces an [`Output`]: a closed tagged union
//! of the shapes the response normalizer knows how to send. Plain Rust values
//! are converted through [`IntoOutput`].
//!
//! # Default Implementations
//!
//! - `()` / `None` → [`Output::Pass`] (continue to the next stage)
//! - `String` / `&'static str` → [`Output::Text`]
//! - `Bytes` / `Vec<u8>` → [`Output::Bytes`]
//! - `serde_json::Value`, [`Json<T>`], numbers, `bool` → [`Output::Json`]
//! - `i128` → [`Output::BigInt`]
//! - `http::Response<B>` → [`Output::Response`]
//! - `Result<T, E>` → delegates to `T`, or [`Output::Error`] on `Err`

use crate::{
    body::{BodyStream, ResponseBody},
    error::HttpError,
};
use bytes::Bytes;
use futures::StreamExt;
use serde::Serialize;
use std::fmt;

/// The result of one dispatch stage.
pub enum Output {
    /// Did not handle the request; dispatch continues with the next stage.
    Pass,
    /// Handled, with an empty body.
    Empty,
    /// Sentinel for "no stage matched".
    NotFound,
    /// A text body (`text/html` unless a content type was set).
    Text(String),
    /// A binary body (`application/octet-stream` unless set).
    Bytes(Bytes),
    /// A JSON value.
    Json(serde_json::Value),
    /// A big integer, sent as its decimal representation.
    BigInt(i128),
    /// A complete transport-native response.
    Response(http::Response<ResponseBody>),
    /// A typed binary payload.
    Blob(Blob),
    /// A streamed body, proxied to the client.
    Stream(BodyStream),
    /// A failure.
    Error(HttpError),
    /// A value the normalizer refuses to send, named by its type.
    Unsupported(&'static str),
}

impl Output {
    /// Wrap a stream of chunks.
    pub fn stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = Result<Bytes, crate::BoxError>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }

    /// Whether this output lets dispatch continue.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// A short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Empty => "empty",
            Self::NotFound => "not_found",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::BigInt(_) => "bigint",
            Self::Response(_) => "response",
            Self::Blob(_) => "blob",
            Self::Stream(_) => "stream",
            Self::Error(_) => "error",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::BigInt(n) => f.debug_tuple("BigInt").field(n).finish(),
            Self::Error(err) => f.debug_tuple("Error").field(err).finish(),
            Self::Unsupported(name) => f.debug_tuple("Unsupported").field(name).finish(),
            Self::Response(res) => f.debug_tuple("Response").field(&res.status()).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

/// A binary payload with its media type.
#[derive(Debug, Clone)]
pub struct Blob {
    /// The media type, e.g. `image/png`.
    pub content_type: Option<String>,
    /// The bytes.
    pub bytes: Bytes,
}

impl Blob {
    /// Create a blob.
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            bytes: bytes.into(),
        }
    }
}

/// Serialize any `T: Serialize` as a JSON response.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

/// Conversion of a handler's return value into an [`Output`].
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from a handler",
    label = "missing `IntoOutput` implementation",
    note = "Return an `Output`, or wrap serializable values in `Json(..)`."
)]
pub trait IntoOutput {
    /// Convert into an output.
    fn into_output(self) -> Output;
}

impl IntoOutput for Output {
    fn into_output(self) -> Output {
        self
    }
}

impl IntoOutput for () {
    fn into_output(self) -> Output {
        Output::Pass
    }
}

impl<T: IntoOutput> IntoOutput for Option<T> {
    fn into_output(self) -> Output {
        match self {
            Some(t) => t.into_output(),
            None => Output::Pass,
        }
    }
}

impl<T, E> IntoOutput for Result<T, E>
where
    T: IntoOutput,
    E: Into<HttpError>,
{
    fn into_output(self) -> Output {
        match self {
            Ok(t) => t.into_output(),
            Err(e) => Output::Error(e.into()),
        }
    }
}

impl IntoOutput for HttpError {
    fn into_output(self) -> Output {
        Output::Error(self)
    }
}

impl IntoOutput for String {
    fn into_output(self) -> Output {
        Output::Text(self)
    }
}

impl IntoOutput for &'static str {
    fn into_output(self) -> Output {
        Output::Text(self.to_string())
    }
}

impl IntoOutput for Bytes {
    fn into_output(self) -> Output {
        Output::Bytes(self)
    }
}

impl IntoOutput for Vec<u8> {
    fn into_output(self) -> Output {
        Output::Bytes(Bytes::from(self))
    }
}

impl IntoOutput for serde_json::Value {
    fn into_output(self) -> Output {
        Output::Json(self)
    }
}

impl<T: Serialize> IntoOutput for Json<T> {
    fn into_output(self) -> Output {
        match serde_json::to_value(&self.0) {
            Ok(value) => Output::Json(value),
            Err(err) => Output::Error(HttpError::from(err)),
        }
    }
}

impl IntoOutput for Blob {
    fn into_output(self) -> Output {
        Output::Blob(self)
    }
}

impl IntoOutput for i128 {
    fn into_output(self) -> Output {
        Output::BigInt(self)
    }
}

impl<B: Into<ResponseBody>> IntoOutput for http::Response<B> {
    fn into_output(self) -> Output {
        Output::Response(self.map(Into::into))
    }
}

macro_rules! impl_json_scalar {
    ($($t:ty),+) => {
        $(
            impl IntoOutput for $t {
                fn into_output(self) -> Output {
                    Output::Json(serde_json::Value::from(self))
                }
            }
        )+
    };
}

impl_json_scalar!(bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);
