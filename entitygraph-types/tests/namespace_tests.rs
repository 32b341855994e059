use entitygraph_types::{Error, NamespaceEntry, NamespaceResolver};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn resolver() -> NamespaceResolver {
    NamespaceResolver::with_defaults()
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn defaults_include_schema_org_and_eav() {
    let r = resolver();
    assert_eq!(r.base_uri("sdo"), Some("https://schema.org/"));
    assert!(r.base_uri("eav").is_some());
    assert_eq!(r.base_uri("nope"), None);
}

#[test]
fn register_rejects_duplicate_prefix() {
    let mut r = resolver();
    let err = r.register("sdo", "https://example.org/other/").unwrap_err();
    assert_eq!(err, Error::DuplicatePrefix("sdo".into()));
}

#[test]
fn register_rejects_duplicate_namespace() {
    let mut r = resolver();
    let err = r.register("schema", "https://schema.org/").unwrap_err();
    assert_eq!(err, Error::DuplicateNamespace("https://schema.org/".into()));
}

#[test]
fn register_rejects_prefix_with_separator() {
    let mut r = NamespaceResolver::new();
    assert!(matches!(
        r.register("ex.ample", "https://example.org/"),
        Err(Error::InvalidPredicate { .. })
    ));
    assert!(matches!(
        r.register("", "https://example.org/"),
        Err(Error::InvalidPredicate { .. })
    ));
}

#[test]
fn register_rejects_relative_base() {
    let mut r = NamespaceResolver::new();
    assert!(r.register("ex", "example/").is_err());
}

#[test]
fn from_entries_builds_resolver() {
    let r = NamespaceResolver::from_entries(vec![
        NamespaceEntry::new("ex", "https://example.org/"),
        NamespaceEntry::new("exv", "https://example.org/vocab#"),
    ])
    .unwrap();
    assert_eq!(r.entries().len(), 2);
    // longest base first
    assert_eq!(r.entries()[0].prefix, "exv");
}

#[test]
fn from_entries_propagates_duplicates() {
    let result = NamespaceResolver::from_entries(vec![
        NamespaceEntry::new("ex", "https://example.org/"),
        NamespaceEntry::new("ex", "https://example.com/"),
    ]);
    assert!(matches!(result, Err(Error::DuplicatePrefix(_))));
}

// ── to_prefixed / to_uri ─────────────────────────────────────────

#[test]
fn to_prefixed_compacts_uri() {
    assert_eq!(resolver().to_prefixed("https://schema.org/name").unwrap(), "sdo.name");
}

#[test]
fn to_prefixed_uses_longest_match() {
    let mut r = NamespaceResolver::new();
    r.register("ex", "https://example.org/").unwrap();
    r.register("exv", "https://example.org/vocab/").unwrap();

    assert_eq!(r.to_prefixed("https://example.org/vocab/label").unwrap(), "exv.label");
    assert_eq!(r.to_prefixed("https://example.org/thing").unwrap(), "ex.thing");
}

#[test]
fn to_prefixed_unknown_namespace() {
    let err = resolver().to_prefixed("https://unknown.example/name").unwrap_err();
    assert_eq!(err, Error::UnknownNamespace("https://unknown.example/name".into()));
    assert!(err.is_identity());
}

#[test]
fn to_prefixed_rejects_bare_namespace() {
    assert!(matches!(
        resolver().to_prefixed("https://schema.org/"),
        Err(Error::InvalidPredicate { .. })
    ));
}

#[test]
fn to_uri_expands_prefixed() {
    assert_eq!(resolver().to_uri("sdo.keywords").unwrap(), "https://schema.org/keywords");
}

#[test]
fn to_uri_splits_on_first_separator() {
    assert_eq!(resolver().to_uri("sdo.a.b").unwrap(), "https://schema.org/a.b");
}

#[test]
fn to_uri_unknown_prefix() {
    let err = resolver().to_uri("zzz.name").unwrap_err();
    assert_eq!(err, Error::UnknownPrefix("zzz.name".into()));
    assert!(err.is_identity());
}

#[test]
fn to_uri_requires_separator_and_local_name() {
    assert!(matches!(resolver().to_uri("sdo"), Err(Error::InvalidPredicate { .. })));
    assert!(matches!(resolver().to_uri("sdo."), Err(Error::InvalidPredicate { .. })));
}

// ── resolve / is_known_predicate ─────────────────────────────────

#[test]
fn resolve_accepts_both_forms() {
    let r = resolver();
    let from_uri = r.resolve("https://schema.org/name").unwrap();
    let from_prefixed = r.resolve("sdo.name").unwrap();

    assert_eq!(from_uri, from_prefixed);
    assert_eq!(from_uri.prefixed(), "sdo.name");
    assert_eq!(from_uri.uri(), "https://schema.org/name");
    assert_eq!(from_uri.prefix(), "sdo");
    assert_eq!(from_uri.local_name(), "name");
    assert_eq!(from_uri.to_string(), "sdo.name");
}

#[test]
fn is_known_predicate() {
    let r = resolver();
    assert!(r.is_known_predicate("sdo.name"));
    assert!(r.is_known_predicate("http://purl.org/dc/terms/title"));
    assert!(!r.is_known_predicate("https://unknown.example/x"));
    assert!(!r.is_known_predicate("nope.x"));
}

#[test]
fn canonical_uri_validates_uris() {
    let r = resolver();
    assert_eq!(r.canonical_uri("sdo.name").unwrap(), "https://schema.org/name");
    assert_eq!(
        r.canonical_uri("https://schema.org/name").unwrap(),
        "https://schema.org/name"
    );
    assert!(r.canonical_uri("https://unknown.example/x").is_err());
}

// ── Round-trip law ───────────────────────────────────────────────

fn local_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_.-]{0,30}").unwrap()
}

proptest! {
    #[test]
    fn prefixed_round_trip(index in 0usize..10, local in local_name_strategy()) {
        let r = resolver();
        let entries = r.entries();
        let entry = &entries[index % entries.len()];
        let uri = format!("{}{}", entry.base_uri, local);

        let prefixed = r.to_prefixed(&uri).unwrap();
        let back = r.to_uri(&prefixed).unwrap();
        prop_assert_eq!(r.to_prefixed(&back).unwrap(), prefixed);
    }
}
