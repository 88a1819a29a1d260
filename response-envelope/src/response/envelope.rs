use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use response_envelope_core::{
    BoxedDecoder, ContentType, Decode, DeserializationError, Deserializer, JsonDeserializer,
};
use serde::de::DeserializeOwned;

use super::{Metadata, PageFormat, PagedResponseEnvelope, TypedResponseEnvelope};
use crate::{PayloadError, StatusError};

/// The complete result of one HTTP exchange.
///
/// Status, headers and body are captured once and never change. Reading a
/// payload decodes the stored bytes without consuming them, so an envelope can
/// be decoded any number of times, into different types, or not at all.
///
/// Envelopes can be built for any status, including `4xx` and `5xx`.
///
/// # Example
///
/// ```
/// use response_envelope::{Bytes, ResponseEnvelope, StatusCode};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ApiError {
///     code: String,
/// }
///
/// let envelope = ResponseEnvelope::builder(StatusCode::NOT_FOUND)
///     .header_static("content-type", "application/json")
///     .body(Bytes::from_static(br#"{"code":"not_found"}"#))
///     .build();
///
/// assert_eq!(envelope.status_code(), 404);
/// let err: ApiError = envelope.deserialize().unwrap();
/// assert_eq!(err.code, "not_found");
/// assert_eq!(envelope.raw_body().as_ref(), br#"{"code":"not_found"}"#);
/// ```
pub struct ResponseEnvelope<D = JsonDeserializer> {
    status: StatusCode,
    method: Method,
    headers: Metadata,
    body: Bytes,
    content_type: ContentType,
    deserializer: Arc<D>,
}

impl ResponseEnvelope<JsonDeserializer> {
    /// Create an envelope for a `GET` exchange with the default JSON codec.
    ///
    /// The content-type hint is read from `headers`, falling back to
    /// `application/json`.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self::builder(status).headers(headers).body(body).build()
    }

    /// Start building an envelope.
    pub fn builder(status: StatusCode) -> ResponseEnvelopeBuilder<JsonDeserializer> {
        ResponseEnvelopeBuilder::new(status)
    }

    /// Create an envelope from the parts of an `http::Response` and its body.
    pub fn from_parts(method: Method, parts: http::response::Parts, body: Bytes) -> Self {
        Self::builder(parts.status)
            .method(method)
            .headers(parts.headers)
            .body(body)
            .build()
    }

    /// Create an envelope from a fully buffered `http::Response`.
    pub fn from_http(method: Method, response: http::Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self::from_parts(method, parts, body)
    }
}

impl<D> ResponseEnvelope<D> {
    /// The HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The HTTP status as an integer.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// The method of the request that produced this response.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The response headers.
    pub fn headers(&self) -> &Metadata {
        &self.headers
    }

    /// The exact bytes received. Empty for bodyless responses.
    pub fn raw_body(&self) -> &Bytes {
        &self.body
    }

    /// The content-type hint handed to deserializers.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The default codec of this envelope.
    pub fn deserializer(&self) -> &D {
        &self.deserializer
    }

    /// `2xx`
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `4xx`
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// `5xx`
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Whether the method and status call for a response body.
    ///
    /// `HEAD` requests, `1xx`, `204 No Content`, `205 Reset Content` and
    /// `304 Not Modified` never carry one. A successful `DELETE` may answer
    /// without a body, so an empty body is accepted there as well.
    pub fn expects_body(&self) -> bool {
        if self.method == Method::HEAD || self.status.is_informational() {
            return false;
        }
        if matches!(
            self.status,
            StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT | StatusCode::NOT_MODIFIED
        ) {
            return false;
        }
        !(self.method == Method::DELETE && self.status.is_success() && self.body.is_empty())
    }

    /// Reject empty bodies before they reach a decoder.
    pub(crate) fn check_body(&self) -> Result<(), PayloadError> {
        if !self.body.is_empty() {
            return Ok(());
        }
        if self.expects_body() {
            Err(PayloadError::EmptyBody {
                status: self.status,
            })
        } else {
            Err(PayloadError::NoContent {
                status: self.status,
            })
        }
    }

    /// Decode the body with a one-off decoder, bypassing the default codec.
    ///
    /// The decoder always runs, even on an empty body, so it can produce a
    /// value from headers alone (a `201` with only a `Location`, say).
    pub fn deserialize_with<T, C>(&self, decoder: &C) -> Result<T, PayloadError>
    where
        C: Decode<T> + ?Sized,
    {
        decoder
            .decode(&self.body, &self.content_type)
            .map_err(|e| self.decode_failed(e))
    }

    pub(crate) fn decode_failed(&self, err: DeserializationError) -> PayloadError {
        // Custom decoders may not attach the body or hint themselves.
        let err = if err.body().is_empty() {
            err.with_body(self.body.clone())
        } else {
            err
        };
        let err = if err.content_type().essence() == ContentType::OCTET_STREAM {
            err.with_content_type(self.content_type.clone())
        } else {
            err
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            status = self.status.as_u16(),
            content_type = %self.content_type,
            body_len = self.body.len(),
            kind = %err.kind(),
            "response body deserialization failed"
        );
        PayloadError::Deserialization(err)
    }

    /// Turn a `4xx`/`5xx` envelope into a [`StatusError`].
    pub fn error_for_status(self) -> Result<Self, StatusError<D>> {
        if self.status.is_client_error() || self.status.is_server_error() {
            Err(StatusError::new(self))
        } else {
            Ok(self)
        }
    }

    /// Decompose into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, Metadata, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Replace the default codec.
    pub fn with_deserializer<D2>(self, deserializer: D2) -> ResponseEnvelope<D2> {
        ResponseEnvelope {
            status: self.status,
            method: self.method,
            headers: self.headers,
            body: self.body,
            content_type: self.content_type,
            deserializer: Arc::new(deserializer),
        }
    }

    /// Wrap with a typed payload that uses a custom decoder.
    pub fn typed_with<T, C>(self, decoder: C) -> TypedResponseEnvelope<T, D>
    where
        C: Decode<T> + 'static,
    {
        TypedResponseEnvelope::with_boxed(self, BoxedDecoder::new(decoder), true)
    }
}

impl<D: Deserializer> ResponseEnvelope<D> {
    /// Decode the body with this envelope's codec.
    ///
    /// Nothing is cached: each call decodes the stored bytes again, so the
    /// same envelope can be read as several types.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        self.check_body()?;
        self.deserializer
            .deserialize(&self.body, &self.content_type)
            .map_err(|e| self.decode_failed(e))
    }

    /// Wrap with a typed payload decoded by this envelope's codec.
    pub fn typed<T>(self) -> TypedResponseEnvelope<T, D>
    where
        T: DeserializeOwned + 'static,
    {
        let decoder = BoxedDecoder::from_deserializer(Arc::clone(&self.deserializer));
        TypedResponseEnvelope::with_boxed(self, decoder, false)
    }

    /// Decode one page of a collection laid out in the OData style.
    pub fn paged<T: DeserializeOwned>(self) -> Result<PagedResponseEnvelope<T, D>, PayloadError> {
        self.paged_with_format(&PageFormat::default())
    }

    /// Decode one page of a collection with the given field names.
    pub fn paged_with_format<T: DeserializeOwned>(
        self,
        format: &PageFormat,
    ) -> Result<PagedResponseEnvelope<T, D>, PayloadError> {
        PagedResponseEnvelope::from_envelope(self, format)
    }
}

impl<D> Clone for ResponseEnvelope<D> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            method: self.method.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            content_type: self.content_type.clone(),
            deserializer: Arc::clone(&self.deserializer),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for ResponseEnvelope<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseEnvelope")
            .field("status", &self.status)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("content_type", &self.content_type.to_string())
            .field("deserializer", &self.deserializer)
            .finish()
    }
}

/// Builder for [`ResponseEnvelope`].
///
/// # Example
///
/// ```
/// use response_envelope::{ResponseEnvelope, StatusCode, TextDeserializer};
///
/// let envelope = ResponseEnvelope::builder(StatusCode::OK)
///     .header_static("content-type", "text/plain")
///     .body("hello")
///     .deserializer(TextDeserializer)
///     .build();
///
/// let text: String = envelope.deserialize().unwrap();
/// assert_eq!(text, "hello");
/// ```
#[derive(Debug)]
pub struct ResponseEnvelopeBuilder<D = JsonDeserializer> {
    status: StatusCode,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
    content_type: Option<ContentType>,
    default_content_type: ContentType,
    deserializer: D,
}

impl ResponseEnvelopeBuilder<JsonDeserializer> {
    /// Create a builder for a `GET` exchange with the default JSON codec.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            method: Method::GET,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            content_type: None,
            default_content_type: ContentType::json(),
            deserializer: JsonDeserializer,
        }
    }
}

impl<D> ResponseEnvelopeBuilder<D> {
    /// Set the request method (default `GET`).
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Append a header from static strings.
    ///
    /// Invalid names or values are skipped.
    pub fn header_static(self, name: &'static str, value: &'static str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => self.header(name, value),
            _ => self,
        }
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Force the content-type hint, ignoring the `Content-Type` header.
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Hint used when the headers carry no usable `Content-Type`.
    pub fn default_content_type(mut self, content_type: ContentType) -> Self {
        self.default_content_type = content_type;
        self
    }

    /// Set the default codec.
    pub fn deserializer<D2>(self, deserializer: D2) -> ResponseEnvelopeBuilder<D2> {
        ResponseEnvelopeBuilder {
            status: self.status,
            method: self.method,
            headers: self.headers,
            body: self.body,
            content_type: self.content_type,
            default_content_type: self.default_content_type,
            deserializer,
        }
    }

    /// Build the envelope. Never fails.
    pub fn build(self) -> ResponseEnvelope<D> {
        let content_type = self
            .content_type
            .or_else(|| ContentType::from_headers(&self.headers))
            .unwrap_or(self.default_content_type);

        ResponseEnvelope {
            status: self.status,
            method: self.method,
            headers: Metadata::new(self.headers),
            body: self.body,
            content_type,
            deserializer: Arc::new(self.deserializer),
        }
    }
}
