//! Error types for envelope operations.
//!
//! - [`PayloadError`]: raised lazily when a payload is requested
//! - [`StatusError`]: an unsuccessful status, with the whole envelope kept
//! - [`TransportError`]: reading the body failed before an envelope existed

use std::fmt;

use bytes::Bytes;
use http::StatusCode;
use response_envelope_core::{Deserializer, DeserializationError};
use serde::de::DeserializeOwned;

use crate::response::ResponseEnvelope;

/// Requesting a payload failed.
///
/// Never raised when an envelope is built, only when a payload is asked for.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PayloadError {
    /// The response legitimately has no body (`204`, `304`, `HEAD`, an empty
    /// `DELETE` reply, ...).
    #[error("response with status {status} carries no content")]
    NoContent { status: StatusCode },

    /// A body was expected for this status and method but none arrived.
    #[error("expected a response body for status {status}, got none")]
    EmptyBody { status: StatusCode },

    /// The body did not match the requested type.
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
}

impl PayloadError {
    /// True for [`PayloadError::NoContent`].
    pub fn is_no_content(&self) -> bool {
        matches!(self, PayloadError::NoContent { .. })
    }

    /// The underlying deserialization error, if that is what failed.
    pub fn as_deserialization(&self) -> Option<&DeserializationError> {
        match self {
            PayloadError::Deserialization(e) => Some(e),
            _ => None,
        }
    }

    /// The raw body that failed to decode.
    pub fn raw_body(&self) -> Option<&Bytes> {
        self.as_deserialization().map(|e| e.body())
    }
}

/// A response with a `4xx` or `5xx` status.
///
/// Returned by [`ResponseEnvelope::error_for_status`]. The envelope travels with
/// the error, so status, headers and body stay available and the error body
/// can still be decoded into a typed error model.
///
/// # Example
///
/// ```ignore
/// match envelope.error_for_status() {
///     Ok(ok) => ok.typed::<User>().into_payload(),
///     Err(err) => {
///         let api: ApiError = err.error_payload()?;
///         eprintln!("{} failed: {}", err.status(), api.message);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct StatusError<D = response_envelope_core::JsonDeserializer> {
    envelope: ResponseEnvelope<D>,
}

impl<D> StatusError<D> {
    pub(crate) fn new(envelope: ResponseEnvelope<D>) -> Self {
        Self { envelope }
    }

    /// The unsuccessful status.
    pub fn status(&self) -> StatusCode {
        self.envelope.status()
    }

    /// The full envelope.
    pub fn envelope(&self) -> &ResponseEnvelope<D> {
        &self.envelope
    }

    /// Take the envelope back.
    pub fn into_envelope(self) -> ResponseEnvelope<D> {
        self.envelope
    }
}

impl<D: Deserializer> StatusError<D> {
    /// Decode the error body into an error model.
    pub fn error_payload<E: DeserializeOwned>(&self) -> Result<E, PayloadError> {
        self.envelope.deserialize()
    }
}

impl<D> fmt::Display for StatusError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.envelope.status();
        if status.is_client_error() {
            write!(f, "client error: HTTP status {status}")
        } else {
            write!(f, "server error: HTTP status {status}")
        }
    }
}

impl<D: fmt::Debug> std::error::Error for StatusError<D> {}

/// Reading the response body failed.
///
/// Produced only by [`ResponseEnvelope::from_http_response`]; an envelope is
/// never built for an incomplete exchange.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TransportError {
    /// The body stream returned an error.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The body exceeded the configured limit.
    #[error("response body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use response_envelope_core::{ContentType, DeserializationErrorKind};

    #[test]
    fn test_payload_error_accessors() {
        let no_content = PayloadError::NoContent {
            status: StatusCode::NO_CONTENT,
        };
        assert!(no_content.is_no_content());
        assert!(no_content.raw_body().is_none());

        let inner = DeserializationError::data("missing field `id`")
            .with_body(Bytes::from_static(b"{}"))
            .with_content_type(ContentType::json());
        let err = PayloadError::from(inner);
        assert!(!err.is_no_content());
        assert_eq!(err.raw_body().map(|b| b.as_ref()), Some(&b"{}"[..]));
        assert_eq!(
            err.as_deserialization().map(|e| e.kind()),
            Some(DeserializationErrorKind::Data)
        );
    }

    #[test]
    fn test_status_error_display() {
        let err = StatusError::new(ResponseEnvelope::new(
            StatusCode::NOT_FOUND,
            http::HeaderMap::new(),
            Bytes::new(),
        ));
        assert_eq!(err.to_string(), "client error: HTTP status 404 Not Found");

        let err = StatusError::new(ResponseEnvelope::new(
            StatusCode::BAD_GATEWAY,
            http::HeaderMap::new(),
            Bytes::new(),
        ));
        assert_eq!(err.to_string(), "server error: HTTP status 502 Bad Gateway");
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::BodyTooLarge { limit: 16 };
        assert_eq!(err.to_string(), "response body exceeds the 16 byte limit");
    }
}
