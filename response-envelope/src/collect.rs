//! Building envelopes from streaming `http::Response` bodies.
//!
//! The body is buffered completely before the envelope exists, so an envelope
//! always describes a finished exchange. Failures while reading are reported
//! as [`TransportError`].

use http::{Method, Response};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use response_envelope_core::JsonDeserializer;

use crate::{EnvelopeOptions, ResponseEnvelope, TransportError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

impl ResponseEnvelope<JsonDeserializer> {
    /// Buffer a response body and wrap the result.
    ///
    /// `method` is the method of the request that produced `response`; it
    /// decides whether an empty body is legitimate. The body is limited to
    /// [`EnvelopeOptions::max_body_bytes`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let response = http_client.request(request).await?;
    /// let envelope = ResponseEnvelope::from_http_response(
    ///     Method::GET,
    ///     response,
    ///     &EnvelopeOptions::default(),
    /// )
    /// .await?;
    /// ```
    pub async fn from_http_response<B>(
        method: Method,
        response: Response<B>,
        options: &EnvelopeOptions,
    ) -> Result<Self, TransportError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = response.into_parts();

        let bytes = match options.get_max_body_bytes() {
            Some(limit) => Limited::new(body, limit)
                .collect()
                .await
                .map_err(|e| {
                    if e.is::<LengthLimitError>() {
                        TransportError::BodyTooLarge { limit }
                    } else {
                        TransportError::Body(e.to_string())
                    }
                })?
                .to_bytes(),
            None => body
                .collect()
                .await
                .map_err(|e| {
                    let e: BoxError = e.into();
                    TransportError::Body(e.to_string())
                })?
                .to_bytes(),
        };

        let envelope = Self::builder(parts.status)
            .method(method)
            .headers(parts.headers)
            .default_content_type(options.get_default_content_type().clone())
            .body(bytes)
            .build();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            status = envelope.status_code(),
            method = %envelope.method(),
            content_type = %envelope.content_type(),
            body_len = envelope.raw_body().len(),
            "response envelope captured"
        );

        Ok(envelope)
    }
}
