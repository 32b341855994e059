//! Namespace registration and predicate resolution.
//!
//! Predicates travel in two shapes: full URIs (`https://schema.org/name`) on
//! the outside and compact `prefix.localName` keys (`sdo.name`) on the remote
//! API paths. The resolver maps between the two using the longest registered
//! base URI, so the mapping is stable for every registered predicate.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Separator between prefix and local name in a prefixed key.
pub const PREFIX_SEPARATOR: char = '.';

/// Namespaces every resolver built with [`NamespaceResolver::with_defaults`] knows.
const DEFAULT_NAMESPACES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("sdo", "https://schema.org/"),
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("eav", "https://w3id.org/entitygraph/eav#"),
];

/// A single prefix ↔ base URI registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub prefix: String,
    pub base_uri: String,
}

impl NamespaceEntry {
    pub fn new(prefix: impl Into<String>, base_uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base_uri: base_uri.into(),
        }
    }
}

/// A predicate that is known to resolve against a [`NamespaceResolver`].
///
/// Only the resolver can build one, which keeps unresolvable predicates out
/// of every container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredicateKey {
    prefixed: String,
    uri: String,
}

impl PredicateKey {
    /// The `prefix.localName` form used in API paths and registry keys.
    pub fn prefixed(&self) -> &str {
        &self.prefixed
    }

    /// The full predicate URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The namespace prefix.
    pub fn prefix(&self) -> &str {
        self.prefixed
            .split_once(PREFIX_SEPARATOR)
            .map_or(self.prefixed.as_str(), |(prefix, _)| prefix)
    }

    /// The local name after the prefix separator.
    pub fn local_name(&self) -> &str {
        self.prefixed
            .split_once(PREFIX_SEPARATOR)
            .map_or("", |(_, local)| local)
    }
}

impl fmt::Display for PredicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefixed)
    }
}

/// Bidirectional prefix ↔ namespace map.
#[derive(Debug, Clone, Default)]
pub struct NamespaceResolver {
    /// prefix -> base URI
    by_prefix: HashMap<String, String>,
    /// (base URI, prefix), sorted longest base first for greedy matching.
    by_base: Vec<(String, String)>,
}

impl NamespaceResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with the common RDF vocabularies plus the `eav`
    /// namespace used for detail predicates.
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        for (prefix, base) in DEFAULT_NAMESPACES {
            resolver.insert(prefix, base);
        }
        resolver
    }

    /// Builds a resolver from a list of entries.
    pub fn from_entries(entries: impl IntoIterator<Item = NamespaceEntry>) -> Result<Self> {
        let mut resolver = Self::new();
        for entry in entries {
            resolver.register(entry.prefix, entry.base_uri)?;
        }
        Ok(resolver)
    }

    /// Registers a namespace. Prefixes and base URIs must both be unique.
    pub fn register(&mut self, prefix: impl Into<String>, base_uri: impl Into<String>) -> Result<()> {
        let prefix = prefix.into();
        let base_uri = base_uri.into();

        if prefix.is_empty() || prefix.contains(PREFIX_SEPARATOR) || prefix.contains(':') {
            return Err(Error::InvalidPredicate {
                predicate: prefix,
                reason: "prefix must be non-empty and contain neither '.' nor ':'".into(),
            });
        }
        if !base_uri.contains(':') {
            return Err(Error::InvalidPredicate {
                predicate: base_uri,
                reason: "base URI must be absolute".into(),
            });
        }
        if self.by_prefix.contains_key(&prefix) {
            return Err(Error::DuplicatePrefix(prefix));
        }
        if self.by_base.iter().any(|(base, _)| *base == base_uri) {
            return Err(Error::DuplicateNamespace(base_uri));
        }

        self.insert(&prefix, &base_uri);
        Ok(())
    }

    fn insert(&mut self, prefix: &str, base_uri: &str) {
        self.by_prefix.insert(prefix.to_string(), base_uri.to_string());
        self.by_base.push((base_uri.to_string(), prefix.to_string()));
        self.by_base.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    }

    /// All registered entries, longest base URI first.
    pub fn entries(&self) -> Vec<NamespaceEntry> {
        self.by_base
            .iter()
            .map(|(base, prefix)| NamespaceEntry::new(prefix.clone(), base.clone()))
            .collect()
    }

    /// Returns the base URI registered for a prefix.
    pub fn base_uri(&self, prefix: &str) -> Option<&str> {
        self.by_prefix.get(prefix).map(String::as_str)
    }

    /// Compacts a full URI into its `prefix.localName` form.
    pub fn to_prefixed(&self, uri: &str) -> Result<String> {
        let (base, prefix) = self
            .by_base
            .iter()
            .find(|(base, _)| uri.starts_with(base.as_str()))
            .ok_or_else(|| Error::UnknownNamespace(uri.to_string()))?;

        let local = &uri[base.len()..];
        if local.is_empty() {
            return Err(Error::InvalidPredicate {
                predicate: uri.to_string(),
                reason: "URI has no local name after its namespace".into(),
            });
        }
        Ok(format!("{prefix}{PREFIX_SEPARATOR}{local}"))
    }

    /// Expands a `prefix.localName` key into its full URI.
    pub fn to_uri(&self, prefixed: &str) -> Result<String> {
        let (prefix, local) = prefixed.split_once(PREFIX_SEPARATOR).ok_or_else(|| {
            Error::InvalidPredicate {
                predicate: prefixed.to_string(),
                reason: "expected prefix.localName".into(),
            }
        })?;
        if local.is_empty() {
            return Err(Error::InvalidPredicate {
                predicate: prefixed.to_string(),
                reason: "empty local name".into(),
            });
        }
        let base = self
            .by_prefix
            .get(prefix)
            .ok_or_else(|| Error::UnknownPrefix(prefixed.to_string()))?;
        Ok(format!("{base}{local}"))
    }

    /// Resolves either form into a [`PredicateKey`].
    ///
    /// Input containing `:` is treated as a URI, anything else as a prefixed key.
    pub fn resolve(&self, input: &str) -> Result<PredicateKey> {
        if is_uri(input) {
            let prefixed = self.to_prefixed(input)?;
            Ok(PredicateKey {
                prefixed,
                uri: input.to_string(),
            })
        } else {
            let uri = self.to_uri(input)?;
            // Normalize through the URI so the prefixed form is the canonical
            // (longest-match) one.
            let prefixed = self.to_prefixed(&uri)?;
            Ok(PredicateKey { prefixed, uri })
        }
    }

    /// Returns the full URI for either form.
    pub fn canonical_uri(&self, input: &str) -> Result<String> {
        if is_uri(input) {
            // Validate membership even though the URI is already canonical.
            self.to_prefixed(input)?;
            Ok(input.to_string())
        } else {
            self.to_uri(input)
        }
    }

    /// Whether the input (either form) resolves to a registered namespace.
    pub fn is_known_predicate(&self, input: &str) -> bool {
        self.resolve(input).is_ok()
    }
}

fn is_uri(input: &str) -> bool {
    input.contains(':')
}
