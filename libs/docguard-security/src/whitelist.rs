//! Document whitelist attached to the execution context for lookup reads.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Header carrying the encoded whitelist to nodes that only see headers.
pub const DOCUMENT_WHITELIST_HEADER: &str = "docguard.dls_whitelist";

/// Error decoding a whitelist carried as a header value.
#[derive(Debug, thiserror::Error)]
#[error("malformed document whitelist header: {0}")]
pub struct WhitelistParseError(#[from] serde_json::Error);

/// A single `(collection, id)` document reference.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// Documents that may be read without re-applying document-level restrictions.
///
/// Only documents referenced by lookup queries inside restriction rules end up
/// here: the engine must be able to read them while evaluating those very
/// rules. The set is built per rewrite and attached to the
/// [`ExecutionContext`](crate::ExecutionContext) for one downstream call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentWhitelist {
    /// Whitelisted ids keyed by collection.
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl DocumentWhitelist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the whitelist extended by one document.
    #[must_use]
    pub fn with(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.insert(collection, id);
        self
    }

    /// Adds a document. Returns `false` if it was already present.
    pub fn insert(&mut self, collection: impl Into<String>, id: impl Into<String>) -> bool {
        self.entries
            .entry(collection.into())
            .or_default()
            .insert(id.into())
    }

    #[must_use]
    pub fn is_whitelisted(&self, collection: &str, id: &str) -> bool {
        self.entries
            .get(collection)
            .is_some_and(|ids| ids.contains(id))
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Encodes the whitelist so it can travel as a request header.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        // A map of string sets always serializes.
        serde_json::to_string(&self.entries).unwrap_or_default()
    }

    /// Decodes a whitelist previously produced by [`Self::to_header_value`].
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistParseError`] if the value is not a valid encoding.
    pub fn parse_header_value(value: &str) -> Result<Self, WhitelistParseError> {
        let mut entries: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(value)?;
        entries.retain(|_, ids| !ids.is_empty());
        Ok(Self { entries })
    }
}

impl FromIterator<DocumentRef> for DocumentWhitelist {
    fn from_iter<I: IntoIterator<Item = DocumentRef>>(iter: I) -> Self {
        let mut whitelist = Self::new();
        whitelist.extend(iter);
        whitelist
    }
}

impl Extend<DocumentRef> for DocumentWhitelist {
    fn extend<I: IntoIterator<Item = DocumentRef>>(&mut self, iter: I) {
        for DocumentRef { collection, id } in iter {
            self.insert(collection, id);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn whitelisted_only_for_exact_pair() {
        let wl = DocumentWhitelist::new().with("lookup", "user-1");

        assert!(wl.is_whitelisted("lookup", "user-1"));
        assert!(!wl.is_whitelisted("lookup", "user-2"));
        assert!(!wl.is_whitelisted("other", "user-1"));
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut wl = DocumentWhitelist::new();
        assert!(wl.insert("a", "1"));
        assert!(!wl.insert("a", "1"));
        assert_eq!(wl.len(), 1);
    }

    #[test]
    fn header_value_survives_transport() {
        let wl = DocumentWhitelist::new()
            .with("lookup", "user-1")
            .with("groups", "g:7");

        let parsed = DocumentWhitelist::parse_header_value(&wl.to_header_value()).unwrap();
        assert_eq!(parsed, wl);
    }

    #[test]
    fn lookup_is_keyed_by_collection() {
        let wl: DocumentWhitelist = [
            DocumentRef::new("users", "alice"),
            DocumentRef::new("users", "bob"),
            DocumentRef::new("groups", "alice"),
        ]
        .into_iter()
        .collect();

        assert_eq!(wl.len(), 3);
        assert!(wl.is_whitelisted("users", "bob"));
        assert!(wl.is_whitelisted("groups", "alice"));
        assert!(!wl.is_whitelisted("groups", "bob"));
        assert!(!wl.is_whitelisted("teams", "alice"));
    }

    #[test]
    fn empty_collections_are_dropped_on_decode() {
        let parsed = DocumentWhitelist::parse_header_value(r#"{"users":[]}"#).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn garbage_header_is_rejected() {
        let err = DocumentWhitelist::parse_header_value("lookup/user-1").unwrap_err();
        assert!(err.to_string().starts_with("malformed document whitelist header"));
    }
}
