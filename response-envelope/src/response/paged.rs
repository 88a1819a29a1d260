use std::borrow::Cow;
use std::ops::Deref;

use response_envelope_core::{DeserializationError, Deserializer, JsonDeserializer};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::ResponseEnvelope;
use crate::PayloadError;

/// Field names of a paged collection body.
///
/// The default is the OData layout:
///
/// ```json
/// {
///   "value": [ ... ],
///   "@odata.nextLink": "https://host/users?$skiptoken=..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFormat {
    items_field: Cow<'static, str>,
    next_link_field: Cow<'static, str>,
    delta_link_field: Cow<'static, str>,
}

impl PageFormat {
    /// Custom field names.
    pub fn new(
        items_field: impl Into<Cow<'static, str>>,
        next_link_field: impl Into<Cow<'static, str>>,
        delta_link_field: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            items_field: items_field.into(),
            next_link_field: next_link_field.into(),
            delta_link_field: delta_link_field.into(),
        }
    }

    /// `value`, `@odata.nextLink`, `@odata.deltaLink`.
    pub fn odata() -> Self {
        Self::new("value", "@odata.nextLink", "@odata.deltaLink")
    }

    /// `items`, `nextLink`, `deltaLink`.
    pub fn plain() -> Self {
        Self::new("items", "nextLink", "deltaLink")
    }

    /// Name of the array holding the page items.
    pub fn items_field(&self) -> &str {
        &self.items_field
    }

    /// Name of the next-page link.
    pub fn next_link_field(&self) -> &str {
        &self.next_link_field
    }

    /// Name of the delta link.
    pub fn delta_link_field(&self) -> &str {
        &self.delta_link_field
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::odata()
    }
}

/// One decoded page: items plus continuation links.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_link: Option<String>,
    pub delta_link: Option<String>,
}

impl<T> Page<T> {
    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_link: None,
            delta_link: None,
        }
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Pull a page out of a decoded JSON value.
    ///
    /// Unknown fields are ignored. A missing items field is an error; `null`
    /// or empty links count as absent.
    pub fn from_value(value: Value, format: &PageFormat) -> Result<Self, DeserializationError> {
        let Value::Object(mut object) = value else {
            return Err(DeserializationError::data("page body is not a JSON object"));
        };

        let items = object.remove(format.items_field()).ok_or_else(|| {
            DeserializationError::data(format!("missing field `{}`", format.items_field()))
        })?;
        let items = serde_json::from_value(items).map_err(DeserializationError::from_json)?;

        Ok(Self {
            items,
            next_link: take_link(&mut object, format.next_link_field())?,
            delta_link: take_link(&mut object, format.delta_link_field())?,
        })
    }
}

fn take_link(
    object: &mut Map<String, Value>,
    field: &str,
) -> Result<Option<String>, DeserializationError> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(link)) if link.is_empty() => Ok(None),
        Some(Value::String(link)) => Ok(Some(link)),
        Some(_) => Err(DeserializationError::data(format!(
            "field `{field}` is not a string"
        ))),
    }
}

/// How to continue after the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation<'a> {
    /// Fetch the next page of the same collection.
    Next(&'a str),
    /// The collection is complete; this link fetches later changes.
    Delta(&'a str),
    /// Nothing further.
    End,
}

impl<'a> Continuation<'a> {
    /// The link to follow, if any.
    pub fn link(&self) -> Option<&'a str> {
        match *self {
            Continuation::Next(link) | Continuation::Delta(link) => Some(link),
            Continuation::End => None,
        }
    }
}

/// One page of a collection, kept alongside the envelope it came from.
///
/// This type never fetches anything. A pager elsewhere follows
/// [`next_link`](Self::next_link) or [`delta_link`](Self::delta_link) and
/// produces the next `PagedResponseEnvelope`.
///
/// At most one link is set: a page carrying both is rejected when built.
///
/// # Example
///
/// ```
/// use response_envelope::{Bytes, Continuation, ResponseEnvelope, StatusCode};
///
/// let page = ResponseEnvelope::new(
///     StatusCode::OK,
///     Default::default(),
///     Bytes::from_static(br#"{"value":[1,2],"@odata.nextLink":"https://host/n?page=2"}"#),
/// )
/// .paged::<u32>()
/// .unwrap();
///
/// assert_eq!(page.items(), &[1, 2]);
/// assert_eq!(page.continuation(), Continuation::Next("https://host/n?page=2"));
/// ```
#[derive(Debug, Clone)]
pub struct PagedResponseEnvelope<T, D = JsonDeserializer> {
    envelope: ResponseEnvelope<D>,
    items: Vec<T>,
    next_link: Option<String>,
    delta_link: Option<String>,
}

impl<T, D> PagedResponseEnvelope<T, D> {
    /// Combine an envelope with a page decoded elsewhere (for example by a
    /// custom decoder).
    pub fn from_page(envelope: ResponseEnvelope<D>, page: Page<T>) -> Result<Self, PayloadError> {
        if page.next_link.is_some() && page.delta_link.is_some() {
            let err = DeserializationError::data("page carries both a next link and a delta link")
                .with_body(envelope.raw_body().clone())
                .with_content_type(envelope.content_type().clone());
            return Err(envelope.decode_failed(err));
        }

        Ok(Self {
            envelope,
            items: page.items,
            next_link: page.next_link,
            delta_link: page.delta_link,
        })
    }

    /// Items of this page.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take the items, dropping the envelope.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Link to the next page.
    pub fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }

    /// Link for delta sync.
    pub fn delta_link(&self) -> Option<&str> {
        self.delta_link.as_deref()
    }

    /// Which link, if any, continues the collection.
    pub fn continuation(&self) -> Continuation<'_> {
        match (&self.next_link, &self.delta_link) {
            (Some(next), _) => Continuation::Next(next),
            (None, Some(delta)) => Continuation::Delta(delta),
            (None, None) => Continuation::End,
        }
    }

    /// True when there is no next page (a delta link may still be present).
    pub fn is_last_page(&self) -> bool {
        self.next_link.is_none()
    }

    /// The envelope this page was decoded from.
    pub fn envelope(&self) -> &ResponseEnvelope<D> {
        &self.envelope
    }

    /// Split into the envelope and the page.
    pub fn into_parts(self) -> (ResponseEnvelope<D>, Page<T>) {
        (
            self.envelope,
            Page {
                items: self.items,
                next_link: self.next_link,
                delta_link: self.delta_link,
            },
        )
    }
}

impl<T: DeserializeOwned, D: Deserializer> PagedResponseEnvelope<T, D> {
    /// Decode a page from an envelope using its codec.
    pub fn from_envelope(
        envelope: ResponseEnvelope<D>,
        format: &PageFormat,
    ) -> Result<Self, PayloadError> {
        let value: Value = envelope.deserialize()?;
        let page = Page::from_value(value, format).map_err(|e| {
            envelope.decode_failed(
                e.with_body(envelope.raw_body().clone())
                    .with_content_type(envelope.content_type().clone()),
            )
        })?;
        Self::from_page(envelope, page)
    }
}

impl<T, D> Deref for PagedResponseEnvelope<T, D> {
    type Target = ResponseEnvelope<D>;

    fn deref(&self) -> &Self::Target {
        &self.envelope
    }
}

impl<'a, T, D> IntoIterator for &'a PagedResponseEnvelope<T, D> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use response_envelope_core::{ContentType, DeserializationErrorKind};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u64,
    }

    fn envelope(body: &'static str) -> ResponseEnvelope {
        ResponseEnvelope::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(body.as_bytes()))
    }

    #[test]
    fn test_odata_next_page() {
        let page = envelope(
            r#"{"@odata.context":"x","value":[{"id":1},{"id":2}],
                "@odata.nextLink":"https://h/users?skip=2"}"#,
        )
        .paged::<User>()
        .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page.items()[1], User { id: 2 });
        assert_eq!(page.next_link(), Some("https://h/users?skip=2"));
        assert_eq!(page.delta_link(), None);
        assert!(!page.is_last_page());
        assert_eq!(page.continuation().link(), Some("https://h/users?skip=2"));
        assert_eq!(page.status_code(), 200);
    }

    #[test]
    fn test_delta_link_on_last_page() {
        let page = envelope(r#"{"value":[],"@odata.deltaLink":"https://h/users/delta?token=z"}"#)
            .paged::<User>()
            .unwrap();

        assert!(page.is_empty());
        assert!(page.is_last_page());
        assert_eq!(
            page.continuation(),
            Continuation::Delta("https://h/users/delta?token=z")
        );
    }

    #[test]
    fn test_end_of_collection() {
        let page = envelope(r#"{"value":[{"id":3}],"@odata.nextLink":null}"#)
            .paged::<User>()
            .unwrap();
        assert_eq!(page.continuation(), Continuation::End);
        assert_eq!(page.into_items(), vec![User { id: 3 }]);
    }

    #[test]
    fn test_both_links_rejected() {
        let err = envelope(r#"{"value":[],"@odata.nextLink":"a","@odata.deltaLink":"b"}"#)
            .paged::<User>()
            .unwrap_err();
        let inner = err.as_deserialization().unwrap();
        assert_eq!(inner.kind(), DeserializationErrorKind::Data);
        assert!(inner.body_text().contains("deltaLink"));
    }

    #[test]
    fn test_plain_format() {
        let page = envelope(r#"{"items":[{"id":5}],"nextLink":"/users?cursor=abc"}"#)
            .paged_with_format::<User>(&PageFormat::plain())
            .unwrap();
        assert_eq!(page.next_link(), Some("/users?cursor=abc"));

        let ids: Vec<u64> = (&page).into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![5]);
    }

    #[test]
    fn test_missing_items_field() {
        let err = envelope(r#"{"data":[]}"#).paged::<User>().unwrap_err();
        let inner = err.as_deserialization().unwrap();
        assert!(inner.message().contains("`value`"));
        assert_eq!(inner.body().as_ref(), br#"{"data":[]}"#);
        assert_eq!(inner.content_type(), &ContentType::json());
    }

    #[test]
    fn test_bad_item_shape() {
        let err = envelope(r#"{"value":[{"id":"one"}]}"#).paged::<User>().unwrap_err();
        assert_eq!(
            err.as_deserialization().map(|e| e.kind()),
            Some(DeserializationErrorKind::Data)
        );
    }

    #[test]
    fn test_non_string_link() {
        let err = envelope(r#"{"value":[],"@odata.nextLink":7}"#)
            .paged::<User>()
            .unwrap_err();
        assert!(err.to_string().contains("@odata.nextLink"));
    }

    #[test]
    fn test_from_page_with_custom_decoded_page() {
        let page = PagedResponseEnvelope::from_page(
            envelope("ignored"),
            Page {
                items: vec!["a", "b"],
                next_link: Some("next".into()),
                delta_link: None,
            },
        )
        .unwrap();
        assert_eq!(page.items(), &["a", "b"]);

        let (env, page) = page.into_parts();
        assert_eq!(env.raw_body().as_ref(), b"ignored");
        assert_eq!(page.next_link.as_deref(), Some("next"));
        assert_eq!(Page::last(vec![1]).next_link, None);
    }
}
