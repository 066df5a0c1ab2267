//! Document-level restriction model.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::query::Query;

static UNRESTRICTED: DlsRestriction = DlsRestriction {
    queries: Vec::new(),
};

/// Document-level restriction for one collection.
///
/// Either unrestricted, or a non-empty set of queries of which at least one
/// must match for a document to be visible. An empty query set *is* the
/// unrestricted state; there is no way to build an unsatisfiable restriction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DlsRestriction {
    queries: Vec<Query>,
}

impl DlsRestriction {
    #[must_use]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Restriction from a list of queries. No queries means unrestricted.
    #[must_use]
    pub fn restricted(queries: Vec<Query>) -> Self {
        Self { queries }
    }

    #[inline]
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.queries.is_empty()
    }

    /// The restriction queries (OR-ed). Empty when unrestricted.
    #[inline]
    #[must_use]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    #[must_use]
    pub fn contains_lookup_query(&self) -> bool {
        self.queries.iter().any(Query::contains_lookup)
    }
}

/// Concrete collection name → restriction, built once per request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexMap {
    map: BTreeMap<String, DlsRestriction>,
}

impl IndexMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, collection: impl Into<String>, restriction: DlsRestriction) -> Self {
        self.map.insert(collection.into(), restriction);
        self
    }

    pub fn insert(&mut self, collection: impl Into<String>, restriction: DlsRestriction) {
        self.map.insert(collection.into(), restriction);
    }

    #[must_use]
    pub fn get(&self, collection: &str) -> Option<&DlsRestriction> {
        self.map.get(collection)
    }

    /// Restriction for `collection`; absent entries are unrestricted.
    #[must_use]
    pub fn restriction_for(&self, collection: &str) -> &DlsRestriction {
        self.map.get(collection).unwrap_or(&UNRESTRICTED)
    }

    /// Whether any of `collections` carries a restriction.
    #[must_use]
    pub fn has_restrictions<'a>(&self, collections: impl IntoIterator<Item = &'a String>) -> bool {
        collections
            .into_iter()
            .any(|c| !self.restriction_for(c).is_unrestricted())
    }

    /// Whether any restriction in the map dereferences another document.
    #[must_use]
    pub fn contains_lookup_query(&self) -> bool {
        self.map.values().any(DlsRestriction::contains_lookup_query)
    }
}

impl FromIterator<(String, DlsRestriction)> for IndexMap {
    fn from_iter<I: IntoIterator<Item = (String, DlsRestriction)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Concrete collections a request may touch, as produced by the resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIndices {
    local: BTreeSet<String>,
    remote: BTreeSet<String>,
    local_all: bool,
}

impl ResolvedIndices {
    /// Scope made of explicitly named local collections.
    #[must_use]
    pub fn local<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            local: collections.into_iter().map(Into::into).collect(),
            remote: BTreeSet::new(),
            local_all: false,
        }
    }

    /// Scope produced by the "all collections" wildcard.
    #[must_use]
    pub fn local_all<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            local_all: true,
            ..Self::local(collections)
        }
    }

    /// Adds remote (`cluster:collection`) names to the scope.
    #[must_use]
    pub fn with_remote<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote.extend(collections.into_iter().map(Into::into));
        self
    }

    /// Union of all concrete local collections.
    #[inline]
    #[must_use]
    pub fn local_union(&self) -> &BTreeSet<String> {
        &self.local
    }

    #[inline]
    #[must_use]
    pub fn remote(&self) -> &BTreeSet<String> {
        &self.remote
    }

    #[inline]
    #[must_use]
    pub fn is_local_all(&self) -> bool {
        self.local_all
    }

    /// Number of local and remote collections in scope.
    #[must_use]
    pub fn scope_len(&self) -> usize {
        self.local.len() + self.remote.len()
    }
}
