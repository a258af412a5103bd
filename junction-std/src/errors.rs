//! Error pipeline: turns an [`HttpError`] into a JSON response.
//!
//! The wire body is
//!
//! ```json
//! { "statusCode": 404, "statusMessage": "Cannot find any path matching /x.", "data": ... }
//! ```
//!
//! `stack` (the error message followed by its source chain) is only
//! included in debug mode, where the body is also pretty-printed.

use bytes::Bytes;
use http::{HeaderValue, header};
use junction_core::{HttpError, NormalizedResponse, ResponseBody, ResponseState, reason_phrase};
use serde::Serialize;

/// The JSON body of an error response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Numeric status code.
    pub status_code: u16,
    /// Sanitized status message.
    pub status_message: String,
    /// Application payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Message and source chain, debug mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

impl ErrorBody {
    /// Build the body of `error`.
    pub fn new(error: &HttpError, debug: bool) -> Self {
        Self {
            status_code: error.status_code().as_u16(),
            status_message: status_message_of(error),
            data: error.data().cloned(),
            stack: debug.then(|| error.chain()),
        }
    }
}

/// The reason phrase for `error`: its status message, or the canonical one.
pub fn status_message_of(error: &HttpError) -> String {
    let message = error
        .status_message()
        .unwrap_or_else(|| reason_phrase(error.status_code()));
    sanitize_status_message(message)
}

/// Keep only characters valid in an HTTP reason phrase (tab and visible
/// ASCII plus space).
pub fn sanitize_status_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| *c == '\t' || (' '..='~').contains(c))
        .collect()
}

/// Render `error` as a normalized response.
///
/// Headers already written into `state` are kept; `content-type` is forced
/// to `application/json`.
pub fn error_response(error: HttpError, state: &ResponseState, debug: bool) -> NormalizedResponse {
    let body = ErrorBody::new(&error, debug);
    let encoded = if debug {
        serde_json::to_vec_pretty(&body)
    } else {
        serde_json::to_vec(&body)
    };
    // `ErrorBody` only holds strings, numbers and JSON values.
    let encoded = encoded.unwrap_or_else(|_| {
        format!(
            "{{\"statusCode\":{},\"statusMessage\":\"\"}}",
            body.status_code
        )
        .into_bytes()
    });

    let mut headers = state.headers.clone();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(encoded.len()));

    NormalizedResponse {
        status: error.status_code(),
        status_text: body.status_message,
        headers,
        body: ResponseBody::Bytes(Bytes::from(encoded)),
        error: Some(error),
    }
}
