//! Deserialization errors.
//!
//! [`DeserializationError`] keeps the raw body and the content-type hint so a
//! failed decode never loses what the server actually sent.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use crate::ContentType;

/// Classification of a deserialization failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeserializationErrorKind {
    /// The body is not syntactically valid for the content type.
    Syntax,
    /// The body parsed but does not match the target type
    /// (wrong types, missing required fields).
    Data,
    /// The body ended before a complete value was read.
    Eof,
    /// The body is not valid text in the expected encoding.
    Encoding,
    /// No deserializer handles the content type.
    UnsupportedContentType,
    /// Raised by a caller-supplied decoder.
    Custom,
}

impl DeserializationErrorKind {
    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Data => "data",
            Self::Eof => "eof",
            Self::Encoding => "encoding",
            Self::UnsupportedContentType => "unsupported_content_type",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for DeserializationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The body could not be turned into the requested type.
///
/// # Example
///
/// ```
/// use response_envelope_core::{ContentType, Deserializer, JsonDeserializer};
///
/// let err = JsonDeserializer
///     .deserialize::<u32>(b"{not json", &ContentType::json())
///     .unwrap_err();
///
/// assert_eq!(err.body().as_ref(), b"{not json");
/// assert_eq!(err.content_type().essence(), "application/json");
/// ```
#[derive(Clone, Debug, thiserror::Error)]
#[error("failed to deserialize {content_type} body ({kind}): {message}")]
pub struct DeserializationError {
    kind: DeserializationErrorKind,
    message: String,
    body: Bytes,
    content_type: ContentType,
}

impl DeserializationError {
    /// Create a new error with a kind and message.
    ///
    /// The body and content type default to empty / `application/octet-stream`
    /// and are normally filled in with [`with_body`](Self::with_body) and
    /// [`with_content_type`](Self::with_content_type).
    pub fn new<S: Into<String>>(kind: DeserializationErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            body: Bytes::new(),
            content_type: ContentType::octet_stream(),
        }
    }

    /// Create a [`Custom`](DeserializationErrorKind::Custom) error.
    pub fn custom<S: Into<String>>(message: S) -> Self {
        Self::new(DeserializationErrorKind::Custom, message)
    }

    /// Create a [`Data`](DeserializationErrorKind::Data) error.
    pub fn data<S: Into<String>>(message: S) -> Self {
        Self::new(DeserializationErrorKind::Data, message)
    }

    /// Create an error for a content type nobody can decode.
    pub fn unsupported(content_type: &ContentType) -> Self {
        Self::new(
            DeserializationErrorKind::UnsupportedContentType,
            format!("no deserializer for {}", content_type.essence()),
        )
        .with_content_type(content_type.clone())
    }

    /// Classify a `serde_json` error.
    pub fn from_json(err: serde_json::Error) -> Self {
        use serde_json::error::Category;

        let kind = match err.classify() {
            Category::Syntax => DeserializationErrorKind::Syntax,
            Category::Data => DeserializationErrorKind::Data,
            Category::Eof => DeserializationErrorKind::Eof,
            Category::Io => DeserializationErrorKind::Custom,
        };
        Self::new(kind, err.to_string())
    }

    /// Attach the raw body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach the content-type hint.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Get the failure kind.
    pub fn kind(&self) -> DeserializationErrorKind {
        self.kind
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the raw body that failed to decode.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Get the content-type hint the decoder was given.
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }
}
