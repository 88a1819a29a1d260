//! Envelope construction options.
//!
//! [`EnvelopeOptions`] configures how an envelope is built from an
//! `http::Response`: the fallback content-type hint, how much body to buffer,
//! and how paged collections are laid out.

use response_envelope_core::ContentType;

use crate::response::PageFormat;

/// Default limit for buffered response bodies (4 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Options for building envelopes.
///
/// # Example
///
/// ```
/// use response_envelope::{ContentType, EnvelopeOptions, PageFormat};
///
/// let options = EnvelopeOptions::new()
///     .default_content_type(ContentType::text())
///     .max_body_bytes(64 * 1024)
///     .page_format(PageFormat::plain());
///
/// assert_eq!(options.get_max_body_bytes(), Some(64 * 1024));
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeOptions {
    /// Hint used when the response has no usable `Content-Type`.
    default_content_type: ContentType,
    /// Upper bound on the buffered body; `None` disables the limit.
    max_body_bytes: Option<usize>,
    /// Field names for paged collections.
    page_format: PageFormat,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            default_content_type: ContentType::json(),
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
            page_format: PageFormat::default(),
        }
    }
}

impl EnvelopeOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content-type hint used when the response does not declare one.
    pub fn default_content_type(mut self, content_type: ContentType) -> Self {
        self.default_content_type = content_type;
        self
    }

    /// Limit the number of body bytes buffered into an envelope.
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }

    /// Buffer bodies of any size.
    pub fn unlimited_body(mut self) -> Self {
        self.max_body_bytes = None;
        self
    }

    /// Set the paged collection layout.
    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.page_format = format;
        self
    }

    /// Get the fallback content-type hint.
    pub fn get_default_content_type(&self) -> &ContentType {
        &self.default_content_type
    }

    /// Get the body limit.
    pub fn get_max_body_bytes(&self) -> Option<usize> {
        self.max_body_bytes
    }

    /// Get the paged collection layout.
    pub fn get_page_format(&self) -> &PageFormat {
        &self.page_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EnvelopeOptions::default();
        assert!(options.get_default_content_type().is_json());
        assert_eq!(options.get_max_body_bytes(), Some(DEFAULT_MAX_BODY_BYTES));
        assert_eq!(options.get_page_format(), &PageFormat::odata());
    }

    #[test]
    fn test_unlimited_body() {
        let options = EnvelopeOptions::new().max_body_bytes(10).unlimited_body();
        assert_eq!(options.get_max_body_bytes(), None);
    }
}
