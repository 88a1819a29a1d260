use std::fmt;
use std::ops::Deref;

use once_cell::sync::OnceCell;
use response_envelope_core::{BoxedDecoder, Decode, JsonDeserializer};

use super::ResponseEnvelope;
use crate::PayloadError;

/// Where a typed envelope is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadState {
    /// Only the raw bytes are available.
    Raw,
    /// The payload has been decoded and cached.
    Materialized,
}

/// A [`ResponseEnvelope`] with a payload of type `T`, decoded on first use.
///
/// The first successful [`payload`](Self::payload) call decodes the body and
/// caches the result; later calls return the cached value without running the
/// decoder again. A failed decode caches nothing, so the call can be retried
/// (for example with [`payload_with`](Self::payload_with) and a corrected
/// decoder).
///
/// The envelope derefs to [`ResponseEnvelope`], so status, headers and raw
/// body are read the same way and the body can still be decoded into other
/// types.
///
/// Concurrent callers are safe: exactly one of them runs the decoder, the
/// others wait for it and observe the same value.
///
/// # Example
///
/// ```
/// use response_envelope::{Bytes, ResponseEnvelope, StatusCode};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let typed = ResponseEnvelope::new(
///     StatusCode::OK,
///     Default::default(),
///     Bytes::from_static(br#"{"name":"ada"}"#),
/// )
/// .typed::<User>();
///
/// assert!(!typed.is_materialized());
/// assert_eq!(typed.payload().unwrap().name, "ada");
/// assert!(typed.is_materialized());
/// assert_eq!(typed.status_code(), 200);
/// ```
pub struct TypedResponseEnvelope<T, D = JsonDeserializer> {
    envelope: ResponseEnvelope<D>,
    decoder: BoxedDecoder<T>,
    // Set once a caller supplies its own decoder; it then sees empty bodies too.
    custom: bool,
    payload: OnceCell<T>,
}

impl<T, D> TypedResponseEnvelope<T, D> {
    pub(crate) fn with_boxed(
        envelope: ResponseEnvelope<D>,
        decoder: BoxedDecoder<T>,
        custom: bool,
    ) -> Self {
        Self {
            envelope,
            decoder,
            custom,
            payload: OnceCell::new(),
        }
    }

    /// Get the payload, decoding it on the first call.
    pub fn payload(&self) -> Result<&T, PayloadError> {
        self.payload
            .get_or_try_init(|| materialize(&self.envelope, &self.decoder, self.custom))
    }

    /// Get the payload, decoding with `decoder` if nothing is cached yet.
    ///
    /// A cached payload is returned as is; `decoder` only runs while the
    /// envelope is still [`Raw`](PayloadState::Raw).
    pub fn payload_with<C>(&self, decoder: &C) -> Result<&T, PayloadError>
    where
        C: Decode<T> + ?Sized,
    {
        self.payload
            .get_or_try_init(|| materialize(&self.envelope, decoder, true))
    }

    /// Like [`payload`](Self::payload), but a legitimately bodyless response
    /// yields `Ok(None)` instead of [`PayloadError::NoContent`].
    pub fn payload_opt(&self) -> Result<Option<&T>, PayloadError> {
        match self.payload() {
            Ok(payload) => Ok(Some(payload)),
            Err(PayloadError::NoContent { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Consume the envelope and return the payload.
    ///
    /// Reuses the cached payload when there is one.
    pub fn into_payload(self) -> Result<T, PayloadError> {
        let Self {
            envelope,
            decoder,
            custom,
            payload,
        } = self;
        match payload.into_inner() {
            Some(payload) => Ok(payload),
            None => materialize(&envelope, &decoder, custom),
        }
    }

    /// Replace the decoder used by [`payload`](Self::payload).
    ///
    /// Has no effect on a payload that is already cached.
    pub fn set_decoder<C>(&mut self, decoder: C)
    where
        C: Decode<T> + 'static,
    {
        self.decoder = BoxedDecoder::new(decoder);
        self.custom = true;
    }

    /// Builder-style [`set_decoder`](Self::set_decoder).
    pub fn with_decoder<C>(mut self, decoder: C) -> Self
    where
        C: Decode<T> + 'static,
    {
        self.set_decoder(decoder);
        self
    }

    /// The current lifecycle state.
    pub fn state(&self) -> PayloadState {
        if self.payload.get().is_some() {
            PayloadState::Materialized
        } else {
            PayloadState::Raw
        }
    }

    /// True once a payload is cached.
    pub fn is_materialized(&self) -> bool {
        self.state() == PayloadState::Materialized
    }

    /// The untyped envelope.
    pub fn envelope(&self) -> &ResponseEnvelope<D> {
        &self.envelope
    }

    /// Drop the payload and return the untyped envelope.
    pub fn into_envelope(self) -> ResponseEnvelope<D> {
        self.envelope
    }

    /// Split into the envelope and the cached payload, if any.
    pub fn into_parts(self) -> (ResponseEnvelope<D>, Option<T>) {
        (self.envelope, self.payload.into_inner())
    }
}

fn materialize<T, D, C>(
    envelope: &ResponseEnvelope<D>,
    decoder: &C,
    custom: bool,
) -> Result<T, PayloadError>
where
    C: Decode<T> + ?Sized,
{
    if !custom {
        envelope.check_body()?;
    }
    let payload = envelope.deserialize_with(decoder)?;
    #[cfg(feature = "tracing")]
    tracing::debug!(
        status = envelope.status_code(),
        payload = std::any::type_name::<T>(),
        "response payload materialized"
    );
    Ok(payload)
}

impl<T, D> Deref for TypedResponseEnvelope<T, D> {
    type Target = ResponseEnvelope<D>;

    fn deref(&self) -> &Self::Target {
        &self.envelope
    }
}

impl<T, D> AsRef<ResponseEnvelope<D>> for TypedResponseEnvelope<T, D> {
    fn as_ref(&self) -> &ResponseEnvelope<D> {
        &self.envelope
    }
}

impl<T, D> From<TypedResponseEnvelope<T, D>> for ResponseEnvelope<D> {
    fn from(typed: TypedResponseEnvelope<T, D>) -> Self {
        typed.envelope
    }
}

impl<T: fmt::Debug, D: fmt::Debug> fmt::Debug for TypedResponseEnvelope<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedResponseEnvelope")
            .field("envelope", &self.envelope)
            .field("decoder", &self.decoder)
            .field("payload", &self.payload.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use response_envelope_core::{ContentType, DeserializationError};
    use serde::Deserialize;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    fn ok(body: &'static str) -> ResponseEnvelope {
        ResponseEnvelope::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(body.as_bytes()))
    }

    fn counting_decoder(calls: Arc<AtomicUsize>) -> BoxedDecoder<User> {
        BoxedDecoder::from_fn(move |body: &[u8], _: &ContentType| {
            calls.fetch_add(1, Ordering::SeqCst);
            serde_json::from_slice(body).map_err(DeserializationError::from_json)
        })
    }

    #[test]
    fn test_lazy_until_requested() {
        let calls = Arc::new(AtomicUsize::new(0));
        let typed = ok(r#"{"id":1,"name":"ada"}"#).typed_with(counting_decoder(calls.clone()));

        assert_eq!(typed.state(), PayloadState::Raw);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(typed.status_code(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(typed.payload().unwrap().name, "ada");
        assert_eq!(typed.state(), PayloadState::Materialized);
    }

    #[test]
    fn test_payload_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let typed = ok(r#"{"id":1,"name":"ada"}"#).typed_with(counting_decoder(calls.clone()));

        let first = typed.payload().unwrap() as *const User;
        let second = typed.payload().unwrap() as *const User;
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_sentinel_decoder_bypasses_default_codec() {
        let sentinel = User {
            id: 0,
            name: "sentinel".into(),
        };
        let expected = sentinel.clone();

        let typed = ok("this is not json")
            .typed::<User>()
            .with_decoder(BoxedDecoder::from_fn(move |_: &[u8], _: &ContentType| {
                Ok(sentinel.clone())
            }));

        assert_eq!(typed.payload().unwrap(), &expected);
    }

    #[test]
    fn test_failure_then_retry_with_corrected_decoder() {
        let typed = ok("id=4;name=grace").typed::<User>();

        let err = typed.payload().unwrap_err();
        assert!(err.as_deserialization().is_some());
        assert_eq!(typed.state(), PayloadState::Raw);
        assert_eq!(typed.raw_body().as_ref(), b"id=4;name=grace");

        let corrected = BoxedDecoder::from_fn(|body: &[u8], _: &ContentType| {
            let text = std::str::from_utf8(body)
                .map_err(|e| DeserializationError::custom(e.to_string()))?;
            let mut user = User {
                id: 0,
                name: String::new(),
            };
            for pair in text.split(';') {
                match pair.split_once('=') {
                    Some(("id", v)) => {
                        user.id = v.parse().map_err(|_| DeserializationError::data("bad id"))?
                    }
                    Some(("name", v)) => user.name = v.to_string(),
                    _ => return Err(DeserializationError::data("bad pair")),
                }
            }
            Ok(user)
        });

        let user = typed.payload_with(&corrected).unwrap();
        assert_eq!(user.id, 4);
        assert_eq!(user.name, "grace");
        assert!(typed.is_materialized());
    }

    #[test]
    fn test_custom_decoder_runs_on_empty_created_reply() {
        let typed = ResponseEnvelope::builder(StatusCode::CREATED)
            .method(Method::POST)
            .build()
            .typed_with(BoxedDecoder::from_fn(|_: &[u8], _: &ContentType| Ok(7_u32)));

        assert_eq!(typed.payload().unwrap(), &7);
        assert!(typed.is_materialized());
    }

    #[test]
    fn test_default_codec_rejects_empty_created_reply() {
        let typed = ResponseEnvelope::builder(StatusCode::CREATED)
            .method(Method::POST)
            .build()
            .typed::<User>();

        assert!(matches!(typed.payload(), Err(PayloadError::EmptyBody { .. })));
    }

    #[test]
    fn test_custom_decoder_error_carries_envelope_hint() {
        let typed = ResponseEnvelope::builder(StatusCode::OK)
            .header_static("content-type", "application/vnd.acme+json")
            .body("{}")
            .build()
            .typed_with(BoxedDecoder::from_fn(|_: &[u8], _: &ContentType| {
                Err::<User, _>(DeserializationError::custom("nope"))
            }));

        let err = typed.payload().unwrap_err();
        let inner = err.as_deserialization().unwrap();
        assert_eq!(inner.content_type().essence(), "application/vnd.acme+json");
        assert_eq!(inner.body().as_ref(), b"{}");
        assert_eq!(inner.message(), "nope");
    }

    #[test]
    fn test_retry_after_set_decoder() {
        let mut typed = ok("garbage").typed::<User>();
        assert!(typed.payload().is_err());

        typed.set_decoder(BoxedDecoder::from_fn(|_: &[u8], _: &ContentType| {
            Ok(User {
                id: 1,
                name: "fixed".into(),
            })
        }));
        assert_eq!(typed.payload().unwrap().name, "fixed");
    }

    #[test]
    fn test_other_target_types_after_materialize() {
        let typed = ok(r#"{"id":1,"name":"ada"}"#).typed::<User>();
        typed.payload().unwrap();

        let value: serde_json::Value = typed.deserialize().unwrap();
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn test_concurrent_materialize_runs_decoder_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slow = {
            let calls = calls.clone();
            BoxedDecoder::from_fn(move |body: &[u8], _: &ContentType| {
                calls.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                serde_json::from_slice::<User>(body).map_err(DeserializationError::from_json)
            })
        };
        let typed = ok(r#"{"id":8,"name":"race"}"#).typed_with(slow);

        let seen: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| typed.payload().unwrap() as *const User as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(typed.payload().unwrap().id, 8);
    }

    #[test]
    fn test_payload_opt_for_no_content() {
        let typed = ResponseEnvelope::builder(StatusCode::NO_CONTENT)
            .method(Method::DELETE)
            .build()
            .typed::<User>();
        assert_eq!(typed.payload_opt().unwrap(), None);
        assert_eq!(typed.state(), PayloadState::Raw);
    }

    #[test]
    fn test_payload_opt_still_reports_empty_body() {
        let typed = ok("").typed::<User>();
        assert!(matches!(typed.payload_opt(), Err(PayloadError::EmptyBody { .. })));
    }

    #[test]
    fn test_into_payload_reuses_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let typed = ok(r#"{"id":2,"name":"bo"}"#).typed_with(counting_decoder(calls.clone()));
        typed.payload().unwrap();

        let user = typed.into_payload().unwrap();
        assert_eq!(user.name, "bo");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_parts_and_envelope() {
        let typed = ok(r#"{"id":2,"name":"bo"}"#).typed::<User>();
        let (envelope, cached) = typed.into_parts();
        assert!(cached.is_none());

        let typed = envelope.typed::<User>();
        typed.payload().unwrap();
        let (_, cached) = typed.into_parts();
        assert_eq!(cached.map(|u| u.id), Some(2));
    }
}
