//! Lossless HTTP response envelopes.
//!
//! An envelope keeps everything a call returned: the status, every header,
//! and the raw body bytes. The typed payload is produced from those bytes
//! only when asked for, with a deserializer the caller can swap out.
//!
//! ## Features
//!
//! - Status, headers and raw body always available, even after decoding
//! - Lazy payload materialization, cached after the first success
//! - Pluggable deserializers: JSON by default, form, text and
//!   content-type negotiation included, closures and custom types accepted
//! - Per-call decoder overrides that win over the content-type hint
//! - Paged collections with next and delta continuation links
//! - Bodies collected from any `http_body::Body` with a size limit
//!
//! ## Example
//!
//! ```
//! use response_envelope::{Bytes, ResponseEnvelope, StatusCode};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! let envelope = ResponseEnvelope::builder(StatusCode::OK)
//!     .header_static("content-type", "application/json")
//!     .header_static("etag", "\"v1\"")
//!     .body(Bytes::from_static(br#"{"name":"ada"}"#))
//!     .build();
//!
//! assert_eq!(envelope.headers().get("ETag"), Some("\"v1\""));
//!
//! let user = envelope.typed::<User>();
//! assert!(!user.is_materialized());
//! assert_eq!(user.payload().unwrap().name, "ada");
//! assert!(user.is_materialized());
//!
//! // The raw bytes are still there.
//! assert_eq!(user.raw_body().as_ref(), br#"{"name":"ada"}"#);
//! ```
//!
//! ## Error Responses
//!
//! Non-2xx responses are envelopes too. Decode them into an error model
//! with the same machinery:
//!
//! ```
//! use response_envelope::{Bytes, ResponseEnvelope, StatusCode};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ApiError {
//!     code: String,
//! }
//!
//! let envelope = ResponseEnvelope::new(
//!     StatusCode::NOT_FOUND,
//!     Default::default(),
//!     Bytes::from_static(br#"{"code":"not_found"}"#),
//! );
//!
//! let err = envelope.error_for_status().unwrap_err();
//! assert_eq!(err.status(), StatusCode::NOT_FOUND);
//! assert_eq!(err.error_payload::<ApiError>().unwrap().code, "not_found");
//! ```
//!
//! ## Collecting From HTTP
//!
//! ```ignore
//! use response_envelope::{EnvelopeOptions, Method, ResponseEnvelope};
//!
//! let response = client.request(request).await?;
//! let envelope = ResponseEnvelope::from_http_response(
//!     Method::GET,
//!     response,
//!     &EnvelopeOptions::new().max_body_bytes(1 << 20),
//! )
//! .await?;
//! ```

mod collect;
mod error;
pub mod options;
pub mod response;

pub use error::{PayloadError, StatusError, TransportError};
pub use options::{DEFAULT_MAX_BODY_BYTES, EnvelopeOptions};
pub use response::{
    Continuation, Metadata, Page, PageFormat, PagedResponseEnvelope, PayloadState,
    ResponseEnvelope, ResponseEnvelopeBuilder, TypedResponseEnvelope,
};

pub use response_envelope_core::{
    BoxedDecoder, ContentType, Decode, DeserializationError, DeserializationErrorKind,
    Deserializer, FnDecoder, FormDeserializer, Formatted, InvalidContentType, JsonDeserializer,
    NegotiatedDeserializer, TextDeserializer,
};

pub use bytes::Bytes;
pub use http::{HeaderMap, Method, StatusCode};
