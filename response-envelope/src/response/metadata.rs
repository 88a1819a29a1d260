use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

/// Read-only view of response headers.
///
/// Lookups are case-insensitive and a name may carry several values, in the
/// order the server sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    headers: HeaderMap,
}

impl Metadata {
    /// Wrap a received header map.
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// No headers at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// First value of `key` as text.
    ///
    /// A value with bytes outside visible ASCII reads as absent here; use
    /// [`get_bytes`](Self::get_bytes) to see it anyway.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// First value of `key`, undecoded.
    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.headers.get(key).map(|v| v.as_bytes())
    }

    /// Every textual value of `key`, in arrival order. Non-ASCII values are skipped.
    pub fn get_all(&self, key: &str) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(key)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }

    /// Whether the server sent `key` at all.
    pub fn contains(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// Borrow the raw map for lookups this type does not cover.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }

    /// Iterate over every (name, value) pair, repeated names included.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter()
    }

    /// Distinct names, each once.
    pub fn names(&self) -> impl Iterator<Item = &HeaderName> {
        self.headers.keys()
    }

    /// True for a reply that carried no headers.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Number of values stored, counting repeated names.
    pub fn len(&self) -> usize {
        self.headers.len()
    }
}

impl From<HeaderMap> for Metadata {
    fn from(headers: HeaderMap) -> Self {
        Self::new(headers)
    }
}

impl From<Metadata> for HeaderMap {
    fn from(metadata: Metadata) -> Self {
        metadata.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        Metadata::new(headers)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let metadata = sample();
        assert_eq!(metadata.get("X-Request-ID"), Some("abc"));
        assert!(metadata.contains("X-REQUEST-ID"));
        assert_eq!(metadata.get("missing"), None);
    }

    #[test]
    fn test_multiple_values_keep_order() {
        let metadata = sample();
        let cookies: Vec<_> = metadata.get_all("Set-Cookie").collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.names().count(), 2);
    }

    #[test]
    fn test_non_ascii_value_is_skipped_by_get() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(b"\xfa").unwrap());
        let metadata = Metadata::new(headers);
        assert_eq!(metadata.get("x-bin"), None);
        assert_eq!(metadata.get_bytes("x-bin"), Some(&b"\xfa"[..]));
    }
}
