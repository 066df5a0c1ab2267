//! Read request shapes, responses and filter outcomes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::query::Query;

/// Context header recording the DLS mode chosen for a logical request.
pub const DLS_MODE_HEADER: &str = "docguard.dls_mode";

/// How document-level restrictions are enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlsMode {
    /// Rewrite read requests with a composite filter query.
    FilterLevel,
    /// Leave enforcement to the storage layer.
    LuceneLevel,
    /// Filter level only when a restriction needs a lookup query.
    #[default]
    Adaptive,
}

impl DlsMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FilterLevel => "filter_level",
            Self::LuceneLevel => "lucene_level",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for DlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filter_level" => Ok(Self::FilterLevel),
            "lucene_level" => Ok(Self::LuceneLevel),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(format!("unknown DLS mode: {other}")),
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// Terms aggregation attached to a search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAggregation {
    pub name: String,
    pub field: String,
    pub min_doc_count: u64,
}

/// Search over one or more collections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Target collection names or patterns.
    pub collections: Vec<String>,
    /// User query; `None` matches everything.
    pub query: Option<Query>,
    #[serde(default)]
    pub aggregations: Vec<TermsAggregation>,
    #[serde(default)]
    pub profile: bool,
    pub request_cache: Option<bool>,
    /// Alias the coordinating cluster prefixes local collection names with.
    pub local_cluster_alias: Option<String>,
    pub size: Option<usize>,
}

impl SearchRequest {
    #[must_use]
    pub fn new<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collections: collections.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }
}

/// Fetch of a single document by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub collection: String,
    pub id: String,
    pub realtime: bool,
}

impl GetRequest {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            realtime: true,
        }
    }
}

/// One entry of a [`MultiGetRequest`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGetItem {
    pub collection: String,
    pub id: String,
}

impl MultiGetItem {
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// Batched fetch by id, possibly spanning several collections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGetRequest {
    pub items: Vec<MultiGetItem>,
    pub realtime: bool,
}

impl MultiGetRequest {
    #[must_use]
    pub fn new(items: Vec<MultiGetItem>) -> Self {
        Self {
            items,
            realtime: true,
        }
    }
}

/// Shard planning request issued by cross-cluster coordinators.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardResolutionRequest {
    pub collections: Vec<String>,
}

/// Read request shapes the filter understands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReadRequest {
    Search(SearchRequest),
    Get(GetRequest),
    MultiGet(MultiGetRequest),
    ShardResolution(ShardResolutionRequest),
}

impl ReadRequest {
    /// Collection names or patterns handed to the index resolver.
    #[must_use]
    pub fn target_patterns(&self) -> Vec<String> {
        match self {
            Self::Search(r) => r.collections.clone(),
            Self::Get(r) => vec![r.collection.clone()],
            Self::MultiGet(r) => {
                let mut names: Vec<String> =
                    r.items.iter().map(|i| i.collection.clone()).collect();
                names.sort();
                names.dedup();
                names
            }
            Self::ShardResolution(r) => r.collections.clone(),
        }
    }
}

// ── Responses ───────────────────────────────────────────────────────

/// A single search hit as returned by the query engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub collection: String,
    pub id: String,
    pub version: i64,
    pub seq_no: i64,
    pub primary_term: u64,
    pub source: Option<serde_json::Value>,
    /// Stored fields, metadata fields (`_`-prefixed) included.
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total_hits: u64,
}

/// Version metadata of a found document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub version: i64,
    pub seq_no: i64,
    pub primary_term: u64,
}

/// Result of a single-document fetch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetResult {
    pub collection: String,
    pub id: String,
    pub found: bool,
    /// `None` for documents that were not found.
    pub version: Option<DocumentVersion>,
    pub source: Option<serde_json::Value>,
    #[serde(default)]
    pub document_fields: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata_fields: BTreeMap<String, serde_json::Value>,
}

impl GetResult {
    /// The not-found sentinel: no version, no source, no fields.
    #[must_use]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            found: false,
            version: None,
            source: None,
            document_fields: BTreeMap::new(),
            metadata_fields: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiGetResponse {
    /// One item per requested document, in request order.
    pub items: Vec<GetResult>,
}

/// Caller-facing response of an intercepted request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReadResponse {
    Search(SearchResponse),
    Get(GetResult),
    MultiGet(MultiGetResponse),
}

/// What the filter decided for a request.
///
/// `Err` values returned alongside this type are intercepted failures: the
/// filter owns the request and the error is the caller's final answer.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOutcome {
    /// The original request proceeds unmodified (request preparation aside).
    PassThrough(ReadRequest),
    /// The filter executed the request itself; this is the final response.
    Intercepted(ReadResponse),
}

impl FilterOutcome {
    #[must_use]
    pub fn is_intercepted(&self) -> bool {
        matches!(self, Self::Intercepted(_))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_header_text() {
        for mode in [DlsMode::FilterLevel, DlsMode::LuceneLevel, DlsMode::Adaptive] {
            assert_eq!(mode.to_string().parse::<DlsMode>(), Ok(mode));
        }
        assert!("lucene".parse::<DlsMode>().is_err());
    }

    #[test]
    fn multi_get_targets_each_collection_once() {
        let req = ReadRequest::MultiGet(MultiGetRequest::new(vec![
            MultiGetItem::new("orders", "1"),
            MultiGetItem::new("logs", "7"),
            MultiGetItem::new("orders", "2"),
        ]));
        assert_eq!(req.target_patterns(), vec!["logs", "orders"]);
    }

    #[test]
    fn not_found_carries_no_version() {
        let r = GetResult::not_found("orders", "1");
        assert!(!r.found);
        assert!(r.version.is_none());
        assert!(r.source.is_none());
    }
}
