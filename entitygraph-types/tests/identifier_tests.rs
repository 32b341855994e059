use entitygraph_types::{ContentIdentifier, Error, NamespaceResolver};
use proptest::prelude::*;
use std::collections::HashSet;

fn resolver() -> NamespaceResolver {
    NamespaceResolver::with_defaults()
}

// ── Derivation ───────────────────────────────────────────────────

#[test]
fn identifier_is_sha256_hex() {
    let id = ContentIdentifier::from_canonical("https://schema.org/name", "Ada");
    assert_eq!(id.as_str().len(), 64);
    assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn identifier_of_empty_input_is_sha256_of_empty_string() {
    let id = ContentIdentifier::from_canonical("", "");
    assert_eq!(
        id.as_str(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn prefixed_and_uri_forms_yield_same_identifier() {
    let r = resolver();
    let a = ContentIdentifier::derive(&r, "sdo.name", "Ada").unwrap();
    let b = ContentIdentifier::derive(&r, "https://schema.org/name", "Ada").unwrap();
    assert_eq!(a, b);
    assert_eq!(a, ContentIdentifier::from_canonical("https://schema.org/name", "Ada"));
}

#[test]
fn derive_rejects_unknown_predicate() {
    let err = ContentIdentifier::derive(&resolver(), "zzz.name", "Ada").unwrap_err();
    assert!(matches!(err, Error::InvalidPredicate { .. }));
    assert!(!err.is_identity());
}

#[test]
fn concatenation_without_separator_collides() {
    // Documented trade-off: no separator between predicate and value.
    let a = ContentIdentifier::from_canonical("https://schema.org/ab", "c");
    let b = ContentIdentifier::from_canonical("https://schema.org/a", "bc");
    assert_eq!(a, b);
}

#[test]
fn display_and_serde_are_the_digest() {
    let id = ContentIdentifier::from_canonical("https://schema.org/name", "Ada");
    assert_eq!(id.to_string(), id.as_str());
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_str()));
    let parsed: ContentIdentifier = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn test_corpus_values_are_distinct() {
    let r = resolver();
    let values = ["Ada", "ada", "Ada ", "math", "physics", "", "0.9", "0.95"];
    let ids: HashSet<_> = values
        .iter()
        .map(|v| ContentIdentifier::derive(&r, "sdo.keywords", v).unwrap())
        .collect();
    assert_eq!(ids.len(), values.len());
}

// ── Determinism ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn derive_is_deterministic(value in ".{0,64}") {
        let r = resolver();
        let a = ContentIdentifier::derive(&r, "sdo.name", &value).unwrap();
        let b = ContentIdentifier::derive(&r, "sdo.name", &value).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn different_values_yield_different_identifiers(v1 in "[a-z]{1,16}", v2 in "[a-z]{1,16}") {
        prop_assume!(v1 != v2);
        let a = ContentIdentifier::from_canonical("https://schema.org/name", &v1);
        let b = ContentIdentifier::from_canonical("https://schema.org/name", &v2);
        prop_assert_ne!(a, b);
    }
}
