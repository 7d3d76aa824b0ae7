//! Name matching over raw bulk listings.
//!
//! A listing is kept as the exact text returned by the control plane. Matching
//! walks its `items` array and hands out [`Candidate`]s, which are spans into
//! the shared listing rather than copies, so many concurrent queries can read
//! one fetch without locking.
//!
//! Query text is always matched literally. Characters such as `*`, `?` or `"`
//! carry no special meaning.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{Error, Result};

/// The unmodified JSON text of one bulk listing, `{"items": [...]}`.
///
/// Cloning is cheap; every clone shares the same buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct RawListing {
    text: Arc<str>,
}

impl RawListing {
    /// Wraps listing text as returned by the control plane.
    #[must_use]
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    /// The listing text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length of the listing in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the listing text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Debug for RawListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawListing")
            .field("len", &self.text.len())
            .finish()
    }
}

impl From<String> for RawListing {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for RawListing {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// How a name query is compared against `metadata.name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatchQuery {
    /// The name equals the query text.
    Exact(String),
    /// The name contains the query text anywhere; case-sensitive.
    Substring(String),
}

impl MatchQuery {
    /// The query text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Exact(text) | Self::Substring(text) => text,
        }
    }

    /// Tests a resource name against this query.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(text) => name == text,
            Self::Substring(text) => name.contains(text.as_str()),
        }
    }
}

/// Which part of a matching item is returned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Projection {
    /// The whole item document.
    #[default]
    WholeDocument,
    /// Only the `metadata.selfLink` value, as JSON text. Items without one are skipped.
    SelfLinkOnly,
}

/// A read-only span of a [`RawListing`] holding one matched JSON value.
#[derive(Clone)]
pub struct Candidate {
    listing: RawListing,
    span: Range<usize>,
}

impl Candidate {
    /// The JSON text of the matched value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.listing.as_str()[self.span.clone()]
    }

    /// Byte range of the value inside its listing.
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Candidate").field(&self.as_str()).finish()
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Returns the items of `listing` whose `metadata.name` satisfies `query`.
///
/// No match yields an empty vector. Items whose metadata cannot be read are
/// treated as non-matching.
///
/// # Errors
///
/// Returns [`Error::Listing`] if the listing is not a JSON object or its
/// `items` is neither an array nor null.
pub fn extract(
    listing: &RawListing,
    query: &MatchQuery,
    projection: Projection,
) -> Result<Vec<Candidate>> {
    let candidates = entries(listing)?
        .into_iter()
        .filter(|entry| query.matches(&entry.name))
        .filter_map(|entry| {
            let value = match projection {
                Projection::WholeDocument => Some(entry.document),
                Projection::SelfLinkOnly => entry.self_link,
            }?;

            Some(Candidate {
                listing: listing.clone(),
                span: span_of(listing.as_str(), value),
            })
        })
        .collect();

    Ok(candidates)
}

/// Identifying fields of one listing item, borrowed from the listing.
#[derive(Debug)]
pub(crate) struct Entry<'a> {
    pub(crate) name: Cow<'a, str>,
    pub(crate) namespace: Option<&'a RawValue>,
    pub(crate) self_link: Option<&'a RawValue>,
    pub(crate) document: &'a RawValue,
}

impl Entry<'_> {
    /// The decoded `metadata.namespace`, or `None` if absent or not a string.
    pub(crate) fn namespace(&self) -> Option<String> {
        self.namespace
            .and_then(|raw| serde_json::from_str::<Option<String>>(raw.get()).ok())
            .flatten()
    }

    /// The decoded `metadata.selfLink` value, if the item carries one.
    pub(crate) fn self_link(&self) -> Result<Option<String>> {
        self.self_link
            .map(|raw| serde_json::from_str::<String>(raw.get()).map_err(Error::Decode))
            .transpose()
    }
}

#[derive(Deserialize)]
struct Probe<'a> {
    #[serde(borrow, default)]
    metadata: Option<ProbeMeta<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeMeta<'a> {
    #[serde(borrow, default)]
    name: Option<Cow<'a, str>>,
    #[serde(borrow, default)]
    namespace: Option<&'a RawValue>,
    #[serde(borrow, default)]
    self_link: Option<&'a RawValue>,
}

/// Checks that the listing is an object whose `items`, if present, is an array.
pub(crate) fn validate(listing: &RawListing) -> Result<()> {
    items(listing).map(drop)
}

/// The elements of the listing's `items` array.
///
/// A missing or null `items` is an empty listing. Anything other than a JSON
/// object at the top level is rejected.
fn items(listing: &RawListing) -> Result<Vec<&RawValue>> {
    let fields: HashMap<Cow<'_, str>, &RawValue> =
        serde_json::from_str(listing.as_str()).map_err(Error::Listing)?;

    let Some(items) = fields.get("items").copied() else {
        return Ok(Vec::new());
    };

    let items: Option<Vec<&RawValue>> =
        serde_json::from_str(items.get()).map_err(Error::Listing)?;

    Ok(items.unwrap_or_default())
}

/// Walks the `items` array, reading each item's identifying metadata.
///
/// Only a string `metadata.name` is required. Other metadata is kept raw so a
/// mistyped field never hides an item from matching.
pub(crate) fn entries(listing: &RawListing) -> Result<Vec<Entry<'_>>> {
    let items = items(listing)?;
    let mut entries = Vec::with_capacity(items.len());

    for (index, document) in items.into_iter().enumerate() {
        let probe: Probe<'_> = match serde_json::from_str(document.get()) {
            Ok(probe) => probe,
            Err(e) => {
                tracing::trace!(index, "skipping listing item with unreadable metadata: {e}");
                continue;
            }
        };

        let Some(ProbeMeta {
            name: Some(name),
            namespace,
            self_link,
        }) = probe.metadata
        else {
            tracing::trace!(index, "skipping listing item without metadata.name");
            continue;
        };

        entries.push(Entry {
            name,
            namespace,
            self_link,
            document,
        });
    }

    Ok(entries)
}

/// Byte range of `part` within `base`; `part` must have been borrowed from `base`.
fn span_of(base: &str, part: &RawValue) -> Range<usize> {
    let text = part.get();
    let start = text.as_ptr().addr() - base.as_ptr().addr();
    start..start + text.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "kind": "PodList",
        "items": [
            {"metadata": {"name": "web-1", "namespace": "default", "selfLink": "/api/v1/namespaces/default/pods/web-1"}},
            {"metadata": {"name": "web-2", "namespace": "default"}},
            {"metadata": {"name": "db-1", "namespace": "data", "selfLink": "/api/v1/namespaces/data/pods/db-1"}}
        ]
    }"#;

    fn names(candidates: &[Candidate]) -> Vec<String> {
        candidates
            .iter()
            .map(|c| {
                let value: serde_json::Value = serde_json::from_str(c.as_str()).unwrap();
                value["metadata"]["name"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn substring_matches_anywhere_in_name() {
        let listing = RawListing::from(LISTING);
        let found = extract(
            &listing,
            &MatchQuery::Substring("web".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert_eq!(names(&found), ["web-1", "web-2"]);
    }

    #[test]
    fn substring_is_case_sensitive() {
        let listing = RawListing::from(LISTING);
        let found = extract(
            &listing,
            &MatchQuery::Substring("WEB".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn exact_requires_equality() {
        let listing = RawListing::from(LISTING);
        let found = extract(
            &listing,
            &MatchQuery::Exact("web-1".into()),
            Projection::WholeDocument,
        )
        .unwrap();
        assert_eq!(names(&found), ["web-1"]);

        let none = extract(
            &listing,
            &MatchQuery::Exact("web".into()),
            Projection::WholeDocument,
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn query_text_is_literal() {
        let listing = RawListing::from(LISTING);

        for query in ["*", "web-*", "*1", "web?1", "\"", "\\"] {
            let found = extract(
                &listing,
                &MatchQuery::Substring(query.into()),
                Projection::WholeDocument,
            )
            .unwrap();
            assert!(found.is_empty(), "{query} matched {found:?}");
        }
    }

    #[test]
    fn empty_substring_matches_everything() {
        let listing = RawListing::from(LISTING);
        let found = extract(
            &listing,
            &MatchQuery::Substring(String::new()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert_eq!(found.len(), 3);
    }

    #[test]
    fn self_link_projection_skips_items_without_link() {
        let listing = RawListing::from(LISTING);
        let found = extract(
            &listing,
            &MatchQuery::Substring("-1".into()),
            Projection::SelfLinkOnly,
        )
        .unwrap();

        let links: Vec<_> = found.iter().map(Candidate::as_str).collect();
        assert_eq!(
            links,
            [
                "\"/api/v1/namespaces/default/pods/web-1\"",
                "\"/api/v1/namespaces/data/pods/db-1\""
            ]
        );
    }

    #[test]
    fn candidates_are_spans_of_the_listing() {
        let listing = RawListing::from(LISTING);
        let found = extract(
            &listing,
            &MatchQuery::Exact("db-1".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        let candidate = &found[0];
        assert_eq!(&LISTING[candidate.span()], candidate.as_str());
        assert!(candidate.as_str().starts_with('{'));
        assert!(candidate.as_str().ends_with('}'));
        assert_eq!(listing.as_str(), LISTING);
    }

    #[test]
    fn empty_items_yield_no_candidates() {
        let listing = RawListing::from(r#"{"items": []}"#);
        let found = extract(
            &listing,
            &MatchQuery::Substring("web".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn missing_items_is_treated_as_empty() {
        let listing = RawListing::from(r#"{"kind": "PodList"}"#);
        let found = extract(
            &listing,
            &MatchQuery::Substring("web".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn malformed_listing_is_an_error() {
        let listing = RawListing::from(r#"{"items": [{"metadata": "#);
        let err = extract(
            &listing,
            &MatchQuery::Substring("web".into()),
            Projection::WholeDocument,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Listing(_)));
    }

    #[test]
    fn items_with_unreadable_metadata_do_not_match() {
        let listing = RawListing::from(
            r#"{"items": [
                {"metadata": {"name": 7}},
                {"spec": {}},
                42,
                {"metadata": {"name": "web-3"}}
            ]}"#,
        );
        let found = extract(
            &listing,
            &MatchQuery::Substring(String::new()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert_eq!(names(&found), ["web-3"]);
    }

    #[test]
    fn mistyped_metadata_does_not_hide_a_matching_name() {
        let listing = RawListing::from(
            r#"{"items": [
                {"metadata": {"name": "web-1", "namespace": 5, "selfLink": false}},
                {"metadata": {"name": "web-2"}}
            ]}"#,
        );
        let found = extract(
            &listing,
            &MatchQuery::Exact("web-1".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert_eq!(names(&found), ["web-1"]);
        assert!(matches!(
            crate::record::normalize(&found[0]),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn null_items_is_treated_as_empty() {
        let listing = RawListing::from(r#"{"kind": "PodList", "items": null}"#);
        let found = extract(
            &listing,
            &MatchQuery::Substring(String::new()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn listing_must_be_an_object() {
        for text in ["[[]]", "[]", "null", "\"items\""] {
            let err = extract(
                &RawListing::from(text),
                &MatchQuery::Substring(String::new()),
                Projection::WholeDocument,
            )
            .unwrap_err();

            assert!(matches!(err, Error::Listing(_)), "{text}");
        }
    }

    #[test]
    fn items_must_be_an_array() {
        let listing = RawListing::from(r#"{"items": {"metadata": {"name": "web-1"}}}"#);

        assert!(matches!(validate(&listing), Err(Error::Listing(_))));
    }

    #[test]
    fn escaped_names_are_decoded_before_matching() {
        let listing = RawListing::from(r#"{"items": [{"metadata": {"name": "caf\u00e9"}}]}"#);
        let found = extract(
            &listing,
            &MatchQuery::Exact("café".into()),
            Projection::WholeDocument,
        )
        .unwrap();

        assert_eq!(found.len(), 1);
    }

    #[test]
    fn validate_checks_listing_shape() {
        assert!(validate(&RawListing::from(LISTING)).is_ok());
        assert!(matches!(
            validate(&RawListing::from("nope")),
            Err(Error::Listing(_))
        ));
    }

    #[test]
    fn entries_expose_namespace_and_link() {
        let listing = RawListing::from(LISTING);
        let entries = entries(&listing).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].namespace().as_deref(), Some("default"));
        assert_eq!(
            entries[0].self_link().unwrap().as_deref(),
            Some("/api/v1/namespaces/default/pods/web-1")
        );
        assert_eq!(entries[1].self_link().unwrap(), None);
    }

    #[test]
    fn non_string_namespace_reads_as_absent() {
        let listing = RawListing::from(
            r#"{"items": [{"metadata": {"name": "a", "namespace": 5}}, {"metadata": {"name": "b", "namespace": null}}]}"#,
        );
        let entries = entries(&listing).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].namespace(), None);
        assert_eq!(entries[1].namespace(), None);
    }
}
