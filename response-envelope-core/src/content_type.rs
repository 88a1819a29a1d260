//! Content-type hints.
//!
//! A [`ContentType`] is the parsed form of a `Content-Type` header value. It is
//! handed to deserializers as a hint; custom decoders are free to ignore it.

use std::fmt;

use http::HeaderMap;
use http::header::CONTENT_TYPE;

/// A parsed media type such as `application/json; charset=utf-8`.
///
/// The essence (`type/subtype`) is lowercased. Parameters are kept in order
/// with lowercased names and unquoted values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    essence: String,
    params: Vec<(String, String)>,
}

impl ContentType {
    /// `application/json`
    pub const JSON: &'static str = "application/json";
    /// `application/x-www-form-urlencoded`
    pub const FORM: &'static str = "application/x-www-form-urlencoded";
    /// `text/plain`
    pub const TEXT: &'static str = "text/plain";
    /// `application/octet-stream`
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    /// Parse a header value.
    ///
    /// Returns `None` when the value has no `type/subtype` essence.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let essence = parts.next()?.trim().to_ascii_lowercase();

        let (ty, subtype) = essence.split_once('/')?;
        if ty.is_empty() || subtype.is_empty() || subtype.contains('/') {
            return None;
        }

        let params = parts
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                let name = name.trim().to_ascii_lowercase();
                if name.is_empty() {
                    return None;
                }
                let value = value.trim().trim_matches('"').to_string();
                Some((name, value))
            })
            .collect();

        Some(Self { essence, params })
    }

    /// Read the hint from a header map.
    ///
    /// Returns `None` if the header is missing, not valid UTF-8, or unparsable.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
    }

    /// `application/json`.
    pub fn json() -> Self {
        Self::from_static(Self::JSON)
    }

    /// `application/x-www-form-urlencoded`.
    pub fn form() -> Self {
        Self::from_static(Self::FORM)
    }

    /// `text/plain`.
    pub fn text() -> Self {
        Self::from_static(Self::TEXT)
    }

    /// `application/octet-stream`, used when nothing better is known.
    pub fn octet_stream() -> Self {
        Self::from_static(Self::OCTET_STREAM)
    }

    fn from_static(essence: &'static str) -> Self {
        Self {
            essence: essence.to_string(),
            params: Vec::new(),
        }
    }

    /// The lowercased `type/subtype`.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// The top-level type, e.g. `application`.
    pub fn type_(&self) -> &str {
        self.essence.split('/').next().unwrap_or_default()
    }

    /// The subtype including any structured suffix, e.g. `problem+json`.
    pub fn subtype(&self) -> &str {
        self.essence.split('/').nth(1).unwrap_or_default()
    }

    /// Look up a parameter by (case-insensitive) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `charset` parameter, if present.
    pub fn charset(&self) -> Option<&str> {
        self.param("charset")
    }

    /// True for `application/json`, `text/json` and any `+json` suffix
    /// (`application/problem+json`, `application/vnd.api+json`, ...).
    pub fn is_json(&self) -> bool {
        matches!(self.essence.as_str(), Self::JSON | "text/json")
            || self.subtype().ends_with("+json")
    }

    /// True for `application/x-www-form-urlencoded`.
    pub fn is_form(&self) -> bool {
        self.essence == Self::FORM
    }

    /// True for any `text/*` type that is not JSON.
    pub fn is_text(&self) -> bool {
        self.type_() == "text" && !self.is_json()
    }
}

impl Default for ContentType {
    fn default() -> Self {
        Self::json()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)?;
        for (name, value) in &self.params {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ContentType {
    type Err = InvalidContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidContentType(s.to_string()))
    }
}

/// Error returned when a string is not a media type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid content type: {0:?}")]
pub struct InvalidContentType(String);
