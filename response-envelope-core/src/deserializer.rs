//! Body deserializers.
//!
//! Two capabilities are provided:
//!
//! - [`Deserializer`]: a format (JSON, form, text, ...) that can decode a body
//!   into *any* [`DeserializeOwned`] type. Envelopes carry one of these as
//!   their default codec.
//! - [`Decode<T>`]: an object-safe decoder for one target type. This is the
//!   custom override slot; [`BoxedDecoder`] stores it type-erased.
//!
//! # Example
//!
//! ```
//! use response_envelope_core::{BoxedDecoder, ContentType, Decode, DeserializationError};
//!
//! // A decoder that ignores the body entirely.
//! let sentinel = BoxedDecoder::from_fn(|_body: &[u8], _hint: &ContentType| {
//!     Ok::<_, DeserializationError>(42_u32)
//! });
//!
//! assert_eq!(sentinel.decode(b"anything", &ContentType::json()).unwrap(), 42);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::de::value::{Error as ValueError, StrDeserializer};

use crate::{ContentType, DeserializationError, DeserializationErrorKind};

/// A body format that can produce any deserializable type.
///
/// Implementations must be pure: decoding the same bytes into the same type
/// twice yields equal values.
///
/// # Example
///
/// ```ignore
/// use response_envelope_core::{ContentType, DeserializationError, Deserializer};
/// use serde::de::DeserializeOwned;
///
/// #[derive(Debug)]
/// struct YamlDeserializer;
///
/// impl Deserializer for YamlDeserializer {
///     fn name(&self) -> &'static str { "yaml" }
///
///     fn deserialize<T: DeserializeOwned>(
///         &self,
///         body: &[u8],
///         hint: &ContentType,
///     ) -> Result<T, DeserializationError> {
///         // ... serde_yaml::from_slice(body)
///     }
/// }
/// ```
pub trait Deserializer: fmt::Debug + Send + Sync + 'static {
    /// Short format name used in diagnostics (e.g. "json").
    fn name(&self) -> &'static str;

    /// Decode `body` into `T`.
    ///
    /// Errors should carry the body and hint; use
    /// [`DeserializationError::with_body`] and
    /// [`DeserializationError::with_content_type`].
    fn deserialize<T: DeserializeOwned>(
        &self,
        body: &[u8],
        hint: &ContentType,
    ) -> Result<T, DeserializationError>;
}

impl<D: Deserializer> Deserializer for Arc<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn deserialize<T: DeserializeOwned>(
        &self,
        body: &[u8],
        hint: &ContentType,
    ) -> Result<T, DeserializationError> {
        (**self).deserialize(body, hint)
    }
}

/// Decoder for a single target type.
///
/// Unlike [`Deserializer`] this trait is object-safe, so a caller can hand an
/// envelope any strategy for `T` without changing the envelope's type.
pub trait Decode<T>: Send + Sync {
    /// Decode `body` into `T`.
    fn decode(&self, body: &[u8], hint: &ContentType) -> Result<T, DeserializationError>;
}

/// A type-erased, cheaply clonable [`Decode<T>`].
pub struct BoxedDecoder<T>(Arc<dyn Decode<T>>);

impl<T> BoxedDecoder<T> {
    /// Box any decoder.
    pub fn new<C>(decoder: C) -> Self
    where
        C: Decode<T> + 'static,
    {
        BoxedDecoder(Arc::new(decoder))
    }

    /// Box a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[u8], &ContentType) -> Result<T, DeserializationError> + Send + Sync + 'static,
        T: 'static,
    {
        Self::new(FnDecoder(f))
    }

    /// Use a [`Deserializer`] format for `T`.
    pub fn from_deserializer<D>(deserializer: D) -> Self
    where
        D: Deserializer,
        T: DeserializeOwned + 'static,
    {
        Self::new(Formatted::new(deserializer))
    }
}

impl<T> Clone for BoxedDecoder<T> {
    fn clone(&self) -> Self {
        BoxedDecoder(Arc::clone(&self.0))
    }
}

impl<T> Decode<T> for BoxedDecoder<T> {
    fn decode(&self, body: &[u8], hint: &ContentType) -> Result<T, DeserializationError> {
        self.0.decode(body, hint)
    }
}

impl<T> fmt::Debug for BoxedDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxedDecoder")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

/// [`Decode<T>`] backed by a closure.
#[derive(Clone)]
pub struct FnDecoder<F>(pub F);

impl<T, F> Decode<T> for FnDecoder<F>
where
    F: Fn(&[u8], &ContentType) -> Result<T, DeserializationError> + Send + Sync,
{
    fn decode(&self, body: &[u8], hint: &ContentType) -> Result<T, DeserializationError> {
        (self.0)(body, hint)
    }
}

/// [`Decode<T>`] backed by a [`Deserializer`] format.
pub struct Formatted<D, T> {
    deserializer: D,
    _marker: PhantomData<fn() -> T>,
}

impl<D, T> Formatted<D, T> {
    /// Pin `deserializer` to the target type `T`.
    pub fn new(deserializer: D) -> Self {
        Self {
            deserializer,
            _marker: PhantomData,
        }
    }
}

impl<D, T> Decode<T> for Formatted<D, T>
where
    D: Deserializer,
    T: DeserializeOwned,
{
    fn decode(&self, body: &[u8], hint: &ContentType) -> Result<T, DeserializationError> {
        self.deserializer.deserialize(body, hint)
    }
}

/// JSON bodies via `serde_json`. The default codec.
///
/// The hint is not consulted: the body is assumed to be JSON. Unknown fields
/// are ignored and missing `Option` fields default to `None`, following
/// serde's defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl Deserializer for JsonDeserializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn deserialize<T: DeserializeOwned>(
        &self,
        body: &[u8],
        hint: &ContentType,
    ) -> Result<T, DeserializationError> {
        serde_json::from_slice(body).map_err(|e| {
            DeserializationError::from_json(e)
                .with_body(body.to_vec())
                .with_content_type(hint.clone())
        })
    }
}

/// `application/x-www-form-urlencoded` bodies via `serde_qs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormDeserializer;

impl Deserializer for FormDeserializer {
    fn name(&self) -> &'static str {
        "form"
    }

    fn deserialize<T: DeserializeOwned>(
        &self,
        body: &[u8],
        hint: &ContentType,
    ) -> Result<T, DeserializationError> {
        let text = utf8(body, hint)?;
        serde_qs::from_str(text).map_err(|e| {
            DeserializationError::data(format!("form decoding failed: {e}"))
                .with_body(body.to_vec())
                .with_content_type(hint.clone())
        })
    }
}

/// Plain-text bodies, decoded into string-like targets (`String`, `Box<str>`,
/// newtypes deserialized from a string, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDeserializer;

impl Deserializer for TextDeserializer {
    fn name(&self) -> &'static str {
        "text"
    }

    fn deserialize<T: DeserializeOwned>(
        &self,
        body: &[u8],
        hint: &ContentType,
    ) -> Result<T, DeserializationError> {
        let text = utf8(body, hint)?;
        T::deserialize(StrDeserializer::<ValueError>::new(text)).map_err(|e| {
            DeserializationError::data(format!("text decoding failed: {e}"))
                .with_body(body.to_vec())
                .with_content_type(hint.clone())
        })
    }
}

/// Picks a format from the content-type hint.
///
/// - JSON types (including `+json` suffixes): [`JsonDeserializer`]
/// - `application/x-www-form-urlencoded`: [`FormDeserializer`]
/// - other `text/*`: [`TextDeserializer`]
/// - anything else: an
///   [`UnsupportedContentType`](DeserializationErrorKind::UnsupportedContentType) error
#[derive(Debug, Clone, Copy, Default)]
pub struct NegotiatedDeserializer;

impl Deserializer for NegotiatedDeserializer {
    fn name(&self) -> &'static str {
        "negotiated"
    }

    fn deserialize<T: DeserializeOwned>(
        &self,
        body: &[u8],
        hint: &ContentType,
    ) -> Result<T, DeserializationError> {
        if hint.is_json() {
            JsonDeserializer.deserialize(body, hint)
        } else if hint.is_form() {
            FormDeserializer.deserialize(body, hint)
        } else if hint.is_text() {
            TextDeserializer.deserialize(body, hint)
        } else {
            Err(DeserializationError::unsupported(hint).with_body(body.to_vec()))
        }
    }
}

fn utf8<'a>(body: &'a [u8], hint: &ContentType) -> Result<&'a str, DeserializationError> {
    if let Some(charset) = hint.charset() {
        if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("us-ascii") {
            return Err(DeserializationError::new(
                DeserializationErrorKind::Encoding,
                format!("unsupported charset {charset:?}"),
            )
            .with_body(body.to_vec())
            .with_content_type(hint.clone()));
        }
    }

    std::str::from_utf8(body).map_err(|e| {
        DeserializationError::new(DeserializationErrorKind::Encoding, e.to_string())
            .with_body(body.to_vec())
            .with_content_type(hint.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
        #[serde(default)]
        nickname: Option<String>,
    }

    #[test]
    fn test_json_permissive() {
        let body = br#"{"id":1,"name":"ada","unknown":true}"#;
        let user: User = JsonDeserializer
            .deserialize(body, &ContentType::json())
            .unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "ada".into(),
                nickname: None
            }
        );
    }

    #[test]
    fn test_json_missing_required_field() {
        let err = JsonDeserializer
            .deserialize::<User>(br#"{"id":1}"#, &ContentType::json())
            .unwrap_err();
        assert_eq!(err.kind(), DeserializationErrorKind::Data);
        assert!(err.message().contains("name"));
        assert_eq!(err.body().as_ref(), br#"{"id":1}"#);
    }

    #[test]
    fn test_json_is_deterministic() {
        let body = br#"{"id":7,"name":"grace","nickname":"amazing"}"#;
        let a: User = JsonDeserializer.deserialize(body, &ContentType::json()).unwrap();
        let b: User = JsonDeserializer.deserialize(body, &ContentType::json()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_form() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Token {
            access_token: String,
            expires_in: u32,
        }

        let token: Token = FormDeserializer
            .deserialize(b"access_token=abc&expires_in=3600", &ContentType::form())
            .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn test_text() {
        let text: String = TextDeserializer
            .deserialize(b"hello", &ContentType::text())
            .unwrap();
        assert_eq!(text, "hello");

        let err = TextDeserializer
            .deserialize::<String>(b"\xff\xfe", &ContentType::text())
            .unwrap_err();
        assert_eq!(err.kind(), DeserializationErrorKind::Encoding);
    }

    #[test]
    fn test_text_rejects_foreign_charset() {
        let hint = ContentType::parse("text/plain; charset=iso-8859-1").unwrap();
        let err = TextDeserializer.deserialize::<String>(b"abc", &hint).unwrap_err();
        assert_eq!(err.kind(), DeserializationErrorKind::Encoding);
    }

    #[test]
    fn test_negotiated_dispatch() {
        let json = ContentType::parse("application/problem+json").unwrap();
        let value: serde_json::Value = NegotiatedDeserializer
            .deserialize(br#"{"title":"x"}"#, &json)
            .unwrap();
        assert_eq!(value["title"], "x");

        let text: String = NegotiatedDeserializer
            .deserialize(b"plain", &ContentType::text())
            .unwrap();
        assert_eq!(text, "plain");

        let png = ContentType::parse("image/png").unwrap();
        let err = NegotiatedDeserializer
            .deserialize::<String>(b"\x89PNG", &png)
            .unwrap_err();
        assert_eq!(err.kind(), DeserializationErrorKind::UnsupportedContentType);
        assert_eq!(err.body().as_ref(), b"\x89PNG");
    }

    #[test]
    fn test_boxed_decoder_from_deserializer() {
        let decoder = BoxedDecoder::<User>::from_deserializer(JsonDeserializer);
        let user = decoder
            .decode(br#"{"id":2,"name":"linus"}"#, &ContentType::json())
            .unwrap();
        assert_eq!(user.id, 2);

        let cloned = decoder.clone();
        assert!(format!("{cloned:?}").contains("User"));
    }

    #[test]
    fn test_boxed_decoder_from_fn_sees_hint() {
        let decoder = BoxedDecoder::from_fn(|body: &[u8], hint: &ContentType| {
            Ok(format!("{}:{}", hint.essence(), body.len()))
        });
        assert_eq!(
            decoder.decode(b"abc", &ContentType::text()).unwrap(),
            "text/plain:3"
        );
    }
}
