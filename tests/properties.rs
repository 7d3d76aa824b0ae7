//! Property-based tests using proptest
//!
//! These tests check the name matching contract of the extractor and the
//! stability of normalization over randomized listings.

use kube_sift::{MatchQuery, Projection, RawListing, Record, extract, normalize};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Generate an arbitrary resource document with a name and some common fields
fn arb_item() -> impl Strategy<Value = Value> {
    (
        "[a-z][a-z0-9-]{0,20}", // name
        prop_oneof!["default", "kube-system", "web"],
        prop::option::of(0..10i32), // replicas
        prop_oneof!["Running", "Pending", "Failed"],
        any::<bool>(),
    )
        .prop_map(|(name, namespace, replicas, phase, ready)| {
            json!({
                "metadata": {
                    "name": name,
                    "namespace": namespace,
                    "labels": {"app": "demo"}
                },
                "spec": {"replicas": replicas, "containers": [{"name": "app", "image": "img"}]},
                "status": {
                    "phase": phase,
                    "containerStatuses": [{"name": "app", "ready": ready, "restartCount": 0}]
                }
            })
        })
}

/// Generate a listing of items
fn arb_listing() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(arb_item(), 0..40)
}

fn listing_of(items: &[Value]) -> RawListing {
    RawListing::from(json!({ "items": items }).to_string())
}

fn item_name(item: &Value) -> &str {
    item["metadata"]["name"].as_str().unwrap()
}

fn candidate_names(listing: &RawListing, query: &MatchQuery) -> Vec<String> {
    extract(listing, query, Projection::WholeDocument)
        .unwrap()
        .iter()
        .map(|c| {
            let value: Value = serde_json::from_str(c.as_str()).unwrap();
            item_name(&value).to_string()
        })
        .collect()
}

proptest! {
    /// Exact queries return exactly the items whose name equals the query
    #[test]
    fn exact_match_returns_equal_names(items in arb_listing(), pick in any::<prop::sample::Index>()) {
        let listing = listing_of(&items);
        let query = if items.is_empty() {
            "absent".to_string()
        } else {
            item_name(&items[pick.index(items.len())]).to_string()
        };

        let found = candidate_names(&listing, &MatchQuery::Exact(query.clone()));
        let expected: Vec<String> = items
            .iter()
            .map(item_name)
            .filter(|n| *n == query)
            .map(String::from)
            .collect();

        prop_assert_eq!(found, expected);
    }

    /// Substring queries return exactly the items whose name contains the query
    #[test]
    fn substring_match_returns_containing_names(items in arb_listing(), query in "[a-z0-9-]{0,3}") {
        let listing = listing_of(&items);

        let found = candidate_names(&listing, &MatchQuery::Substring(query.clone()));
        let expected: Vec<String> = items
            .iter()
            .map(item_name)
            .filter(|n| n.contains(query.as_str()))
            .map(String::from)
            .collect();

        prop_assert_eq!(found, expected);
    }

    /// Substring matching never matches across letter case
    #[test]
    fn substring_match_is_case_sensitive(items in arb_listing(), query in "[A-Z]{1,3}") {
        let listing = listing_of(&items);

        let found = candidate_names(&listing, &MatchQuery::Substring(query));

        prop_assert!(found.is_empty());
    }

    /// Normalizing the serialized output of a normalization yields the same record
    #[test]
    fn normalize_is_idempotent(items in arb_listing()) {
        let listing = listing_of(&items);
        let candidates = extract(&listing, &MatchQuery::Substring(String::new()), Projection::WholeDocument).unwrap();

        for candidate in &candidates {
            let first = normalize(candidate).unwrap();
            let second = Record::from_json(&first.to_json().unwrap()).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
