//! Response normalizer.
//!
//! [`Normalizer::normalize`] is total: every [`Output`] maps to exactly one
//! [`NormalizedResponse`]. Failures (`NotFound`, `Error`, `Unsupported`,
//! JSON encoding errors) go through the error pipeline in [`crate::errors`].
//!
//! The descriptor written by handlers ([`ResponseState`]) provides the base
//! status, reason phrase and headers. Defaults only fill in what is unset.

use crate::errors::{error_response, sanitize_status_message};
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use junction_core::{
    HttpError, NormalizedResponse, Output, ResponseBody, ResponseState, reason_phrase,
};

const TEXT_HTML: &str = "text/html";
const OCTET_STREAM: &str = "application/octet-stream";
const APPLICATION_JSON: &str = "application/json";

/// Converts stage outputs into wire-ready responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    debug: bool,
}

impl Normalizer {
    /// Create a normalizer. In debug mode JSON is pretty-printed and error
    /// bodies carry a `stack`.
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Whether debug mode is on.
    pub const fn is_debug(&self) -> bool {
        self.debug
    }

    /// Normalize `output` produced for a request on `path`.
    pub fn normalize(&self, output: Output, path: &str, state: &ResponseState) -> NormalizedResponse {
        match output {
            Output::Pass | Output::Empty => empty(state),
            Output::NotFound => self.error(HttpError::not_found(path), state),
            Output::Error(err) => self.error(err, state),
            Output::Unsupported(type_name) => self.error(HttpError::unsupported(type_name), state),
            Output::Text(text) => bytes(state, Bytes::from(text), TEXT_HTML),
            Output::Bytes(data) => bytes(state, data, OCTET_STREAM),
            Output::BigInt(n) => bytes(state, Bytes::from(n.to_string()), APPLICATION_JSON),
            Output::Json(value) => {
                let encoded = if self.debug {
                    serde_json::to_vec_pretty(&value)
                } else {
                    serde_json::to_vec(&value)
                };
                match encoded {
                    Ok(encoded) => bytes(state, Bytes::from(encoded), APPLICATION_JSON),
                    Err(err) => self.error(HttpError::from(err), state),
                }
            }
            Output::Blob(blob) => {
                let mut response = bytes(state, blob.bytes, OCTET_STREAM);
                if let Some(value) = blob
                    .content_type
                    .and_then(|ct| HeaderValue::try_from(ct).ok())
                {
                    response.headers.insert(header::CONTENT_TYPE, value);
                }
                response
            }
            Output::Stream(stream) => {
                let mut response = base(state);
                response.body = ResponseBody::Stream(stream);
                response
            }
            Output::Response(native) => native_response(state, native),
        }
    }

    /// Run an error through the error pipeline.
    pub fn error(&self, error: HttpError, state: &ResponseState) -> NormalizedResponse {
        error_response(error, state, self.debug)
    }
}

fn base(state: &ResponseState) -> NormalizedResponse {
    let status = state.status.unwrap_or(StatusCode::OK);
    let status_text = match &state.status_text {
        Some(text) => sanitize_status_message(text),
        None => reason_phrase(status).to_string(),
    };
    NormalizedResponse {
        status,
        status_text,
        headers: state.headers.clone(),
        body: ResponseBody::Empty,
        error: None,
    }
}

fn empty(state: &ResponseState) -> NormalizedResponse {
    match state.status {
        Some(_) => base(state),
        None => {
            let mut response = base(state);
            response.status = StatusCode::NO_CONTENT;
            response.status_text = reason_phrase(StatusCode::NO_CONTENT).to_string();
            response.headers.remove(header::CONTENT_LENGTH);
            response
        }
    }
}

fn bytes(state: &ResponseState, body: Bytes, default_type: &'static str) -> NormalizedResponse {
    let mut response = base(state);
    set_default(
        &mut response.headers,
        header::CONTENT_TYPE,
        HeaderValue::from_static(default_type),
    );
    set_default(
        &mut response.headers,
        header::CONTENT_LENGTH,
        HeaderValue::from(body.len()),
    );
    response.body = ResponseBody::Bytes(body);
    response
}

fn native_response(state: &ResponseState, native: http::Response<ResponseBody>) -> NormalizedResponse {
    let (parts, body) = native.into_parts();
    let status_text = parts
        .extensions
        .get::<hyper::ext::ReasonPhrase>()
        .map(|phrase| sanitize_status_message(&String::from_utf8_lossy(phrase.as_bytes())))
        .unwrap_or_else(|| reason_phrase(parts.status).to_string());

    let mut headers = state.headers.clone();
    for (name, value) in &parts.headers {
        if name == header::SET_COOKIE {
            headers.append(name.clone(), value.clone());
        } else {
            headers.insert(name.clone(), value.clone());
        }
    }
    if let ResponseBody::Bytes(data) = &body {
        set_default(&mut headers, header::CONTENT_LENGTH, HeaderValue::from(data.len()));
    }

    NormalizedResponse {
        status: parts.status,
        status_text,
        headers,
        body,
        error: None,
    }
}

fn set_default(headers: &mut HeaderMap, name: header::HeaderName, value: HeaderValue) {
    headers.entry(name).or_insert(value);
}

// ============================================================================
// Tests
// ============================================================================
