#![allow(clippy::unwrap_used, clippy::expect_used)]
//! In-memory collaborators for exercising the filter without a search cluster.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dls_filter_sdk::{
    COLLECTION_FIELD, DlsFilterClient, DlsFilterError, FilterOutcome, IndexMap, IndexResolver,
    Query, QueryEngineClient, QueryEngineError, ReadRequest, ResolvedIndices, RestrictionStore,
    SearchHit, SearchRequest, SearchResponse, TermsLookup,
};
use docguard_security::{DocumentWhitelist, ExecutionContext};
use parking_lot::Mutex;
use serde_json::Value;

/// A document held by [`InMemoryQueryEngine`].
#[derive(Clone, Debug)]
pub struct StoredDocument {
    pub collection: String,
    pub id: String,
    pub version: i64,
    pub source: Value,
    pub fields: BTreeMap<String, Value>,
}

impl StoredDocument {
    #[must_use]
    pub fn new(collection: &str, id: &str, source: Value) -> Self {
        Self {
            collection: collection.to_owned(),
            id: id.to_owned(),
            version: 1,
            source,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_owned(), value);
        self
    }
}

/// A search the engine received, with the context state it saw.
#[derive(Clone, Debug)]
pub struct DispatchedSearch {
    pub request: SearchRequest,
    pub marker: Option<String>,
    pub whitelist: Option<DocumentWhitelist>,
}

/// Query engine evaluating [`Query`] trees against an in-memory document list.
///
/// Lookup queries may only read documents whitelisted in the calling
/// context; any other lookup fails the search.
#[derive(Default)]
pub struct InMemoryQueryEngine {
    documents: Vec<StoredDocument>,
    failure: Option<QueryEngineError>,
    reverse_hits: bool,
    dispatched: Mutex<Vec<DispatchedSearch>>,
    reentrant: Mutex<Option<Arc<dyn DlsFilterClient>>>,
    reentrant_outcomes: Mutex<Vec<Result<FilterOutcome, String>>>,
}

impl InMemoryQueryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(mut self, document: StoredDocument) -> Self {
        self.documents.push(document);
        self
    }

    /// Every search fails with `error`.
    #[must_use]
    pub fn failing_with(mut self, error: QueryEngineError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Returns hits in reverse storage order.
    #[must_use]
    pub fn reversing_hits(mut self) -> Self {
        self.reverse_hits = true;
        self
    }

    /// Makes every search call back into `client` with a copy of the calling
    /// context, the way a lookup resolution re-enters the read path.
    pub fn call_back_into(&self, client: Arc<dyn DlsFilterClient>) {
        *self.reentrant.lock() = Some(client);
    }

    #[must_use]
    pub fn dispatched(&self) -> Vec<DispatchedSearch> {
        self.dispatched.lock().clone()
    }

    #[must_use]
    pub fn reentrant_outcomes(&self) -> Vec<Result<FilterOutcome, String>> {
        self.reentrant_outcomes.lock().clone()
    }

    fn visible_name(request: &SearchRequest, collection: &str) -> String {
        match &request.local_cluster_alias {
            Some(alias) => format!("{alias}:{collection}"),
            None => collection.to_owned(),
        }
    }

    fn targets(request: &SearchRequest, doc: &StoredDocument) -> bool {
        request.collections.is_empty()
            || request
                .collections
                .iter()
                .any(|c| c == "*" || c == "_all" || *c == doc.collection)
    }

    fn matches(
        &self,
        ctx: &ExecutionContext,
        request: &SearchRequest,
        doc: &StoredDocument,
        query: &Query,
    ) -> Result<bool, QueryEngineError> {
        Ok(match query {
            Query::Term { field, value } if field == COLLECTION_FIELD => {
                value.as_str() == Some(Self::visible_name(request, &doc.collection).as_str())
            }
            Query::Term { field, value } => field_values(&doc.source, field).contains(value),
            Query::Ids { values } => values.contains(&doc.id),
            Query::Lookup { field, lookup } => {
                let terms = self.lookup_terms(ctx, field, lookup)?;
                field_values(&doc.source, field)
                    .iter()
                    .any(|v| terms.contains(v))
            }
            Query::And(clauses) => {
                for clause in clauses {
                    if !self.matches(ctx, request, doc, clause)? {
                        return Ok(false);
                    }
                }
                true
            }
            Query::Or {
                clauses,
                minimum_match,
            } => {
                let mut matched = 0;
                for clause in clauses {
                    if self.matches(ctx, request, doc, clause)? {
                        matched += 1;
                    }
                }
                matched >= *minimum_match
            }
        })
    }

    fn lookup_terms(
        &self,
        ctx: &ExecutionContext,
        field: &str,
        lookup: &TermsLookup,
    ) -> Result<Vec<Value>, QueryEngineError> {
        if !ctx.is_whitelisted(&lookup.collection, &lookup.id) {
            return Err(QueryEngineError::Internal(format!(
                "lookup of {}/{} is not whitelisted",
                lookup.collection, lookup.id
            )));
        }
        let path = lookup.path.as_deref().unwrap_or(field);
        Ok(self
            .documents
            .iter()
            .find(|d| d.collection == lookup.collection && d.id == lookup.id)
            .map(|d| field_values(&d.source, path))
            .unwrap_or_default())
    }
}

fn field_values(source: &Value, field: &str) -> Vec<Value> {
    match source.get(field) {
        Some(Value::Array(values)) => values.clone(),
        Some(value) => vec![value.clone()],
        None => Vec::new(),
    }
}

#[async_trait]
impl QueryEngineClient for InMemoryQueryEngine {
    async fn search(
        &self,
        ctx: &ExecutionContext,
        request: SearchRequest,
    ) -> Result<SearchResponse, QueryEngineError> {
        self.dispatched.lock().push(DispatchedSearch {
            request: request.clone(),
            marker: ctx.filter_level_marker().map(ToOwned::to_owned),
            whitelist: ctx.document_whitelist().cloned(),
        });

        let reentrant = self.reentrant.lock().clone();
        if let Some(client) = reentrant {
            let mut nested = ctx.clone();
            let outcome = client
                .filter(
                    &mut nested,
                    dls_filter_sdk::actions::SEARCH,
                    ReadRequest::Search(request.clone()),
                )
                .await
                .map_err(|e| e.to_string());
            self.reentrant_outcomes.lock().push(outcome);
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let mut hits = Vec::new();
        for doc in self.documents.iter().filter(|d| Self::targets(&request, d)) {
            let visible = match &request.query {
                Some(query) => self.matches(ctx, &request, doc, query)?,
                None => true,
            };
            if visible {
                hits.push(SearchHit {
                    collection: doc.collection.clone(),
                    id: doc.id.clone(),
                    version: doc.version,
                    seq_no: doc.version - 1,
                    primary_term: 1,
                    source: Some(doc.source.clone()),
                    fields: doc.fields.clone(),
                });
            }
        }

        let total_hits = hits.len() as u64;
        if self.reverse_hits {
            hits.reverse();
        }
        if let Some(size) = request.size {
            hits.truncate(size);
        }
        Ok(SearchResponse { hits, total_hits })
    }
}

/// Resolver returning the same scope for every request.
pub struct FixedResolver(pub ResolvedIndices);

#[async_trait]
impl IndexResolver for FixedResolver {
    async fn resolve(
        &self,
        _ctx: &ExecutionContext,
        _patterns: &[String],
    ) -> Result<ResolvedIndices, DlsFilterError> {
        Ok(self.0.clone())
    }
}

/// Restriction store returning the same map for every request.
pub struct FixedRestrictions(pub IndexMap);

#[async_trait]
impl RestrictionStore for FixedRestrictions {
    async fn restrictions_for(
        &self,
        _ctx: &ExecutionContext,
        _resolved: &ResolvedIndices,
    ) -> Result<IndexMap, DlsFilterError> {
        Ok(self.0.clone())
    }
}
