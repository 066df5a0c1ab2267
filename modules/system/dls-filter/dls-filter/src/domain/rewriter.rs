//! Request rewriter and responder.
//!
//! Executes a restricted read as a single filtered search and translates the
//! result into the response shape the caller asked for. Every dispatch runs
//! with the compiled document whitelist attached to the context; the
//! pre-dispatch context is restored afterwards whatever the outcome.

use std::collections::{BTreeMap, BTreeSet};

use dls_filter_sdk::{
    DlsFilterError, GetRequest, GetResult, IndexMap, MultiGetRequest, MultiGetResponse, Query,
    QueryEngineClient, ReadRequest, ReadResponse, ResolvedIndices, SearchRequest, SearchResponse,
    ShardResolutionRequest,
};
use docguard_security::{DocumentWhitelist, ExecutionContext};

use super::compiler::{self, CompiledRestrictions};
use super::translate;

/// Rewrites one request under the restrictions compiled for its scope.
pub struct Rewriter<'a> {
    engine: &'a dyn QueryEngineClient,
    resolved: &'a ResolvedIndices,
    restrictions: &'a IndexMap,
    compiled: CompiledRestrictions,
}

impl<'a> Rewriter<'a> {
    #[must_use]
    pub fn new(
        engine: &'a dyn QueryEngineClient,
        resolved: &'a ResolvedIndices,
        restrictions: &'a IndexMap,
        compiled: CompiledRestrictions,
    ) -> Self {
        Self {
            engine,
            resolved,
            restrictions,
            compiled,
        }
    }

    /// Executes `request` with the composite filter applied.
    ///
    /// # Errors
    ///
    /// See [`dls_filter_sdk::DlsFilterClient::filter`].
    pub async fn rewrite(
        &self,
        ctx: &mut ExecutionContext,
        request: ReadRequest,
    ) -> Result<ReadResponse, DlsFilterError> {
        match request {
            ReadRequest::Search(search) => self.search(ctx, search).await.map(ReadResponse::Search),
            ReadRequest::Get(get) => self.get(ctx, get).await.map(ReadResponse::Get),
            ReadRequest::MultiGet(mget) => {
                self.multi_get(ctx, mget).await.map(ReadResponse::MultiGet)
            }
            ReadRequest::ShardResolution(shards) => Err(Self::shard_resolution(&shards)),
        }
    }

    async fn search(
        &self,
        ctx: &mut ExecutionContext,
        mut request: SearchRequest,
    ) -> Result<SearchResponse, DlsFilterError> {
        let alias = request.local_cluster_alias.as_deref();
        let recompiled;
        let compiled = if alias == self.compiled.cluster_alias.as_deref() {
            &self.compiled
        } else {
            recompiled = compiler::compile(self.resolved, self.restrictions, alias)?
                .ok_or_else(|| {
                    tracing::error!(?alias, "restrictions vanished when recompiling for cluster alias");
                    DlsFilterError::Internal
                })?;
            &recompiled
        };

        request.query = Some(compiled.filter.and_with(request.query.take()));
        self.dispatch(ctx, &compiled.whitelist, request).await
    }

    async fn get(
        &self,
        ctx: &mut ExecutionContext,
        get: GetRequest,
    ) -> Result<GetResult, DlsFilterError> {
        let query = Query::and(vec![
            Query::ids([get.id.clone()]),
            self.compiled.filter.query().clone(),
        ]);
        let request = SearchRequest::new([get.collection.clone()]).with_query(query);

        let response = self.dispatch(ctx, &self.compiled.whitelist, request).await?;

        match response.total_hits {
            0 => Ok(GetResult::not_found(get.collection, get.id)),
            1 => response
                .hits
                .into_iter()
                .next()
                .map(translate::hit_to_get_result)
                .ok_or_else(|| {
                    tracing::error!(
                        collection = %get.collection,
                        id = %get.id,
                        "search reported one hit but returned none"
                    );
                    DlsFilterError::Internal
                }),
            n => {
                tracing::error!(
                    collection = %get.collection,
                    id = %get.id,
                    total_hits = n,
                    "unexpected hit count for document fetch"
                );
                Err(DlsFilterError::Internal)
            }
        }
    }

    async fn multi_get(
        &self,
        ctx: &mut ExecutionContext,
        mget: MultiGetRequest,
    ) -> Result<MultiGetResponse, DlsFilterError> {
        if mget.items.is_empty() {
            return Ok(MultiGetResponse::default());
        }

        let mut ids_by_collection: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for item in &mget.items {
            ids_by_collection
                .entry(item.collection.as_str())
                .or_default()
                .insert(item.id.as_str());
        }

        let requested = ids_by_collection.values().map(BTreeSet::len).sum::<usize>();
        let collections: Vec<String> = ids_by_collection.keys().map(|c| (*c).to_owned()).collect();

        let id_query = if ids_by_collection.len() == 1 {
            Query::ids(ids_by_collection.values().flatten().copied())
        } else {
            Query::or(
                ids_by_collection
                    .iter()
                    .map(|(collection, ids)| {
                        Query::and(vec![
                            Query::collection(*collection),
                            Query::ids(ids.iter().copied()),
                        ])
                    })
                    .collect(),
            )
        };

        let request = SearchRequest {
            size: Some(requested),
            ..SearchRequest::new(collections)
        }
        .with_query(Query::and(vec![
            id_query,
            self.compiled.filter.query().clone(),
        ]));

        let response = self.dispatch(ctx, &self.compiled.whitelist, request).await?;
        Ok(translate::reassociate(&mget.items, response.hits))
    }

    fn shard_resolution(request: &ShardResolutionRequest) -> DlsFilterError {
        tracing::debug!(
            collections = ?request.collections,
            "refusing shard resolution under filter-level DLS"
        );
        DlsFilterError::Unsupported(
            "shard resolution for cross-cluster search is not supported with filter-level DLS"
                .to_owned(),
        )
    }

    async fn dispatch(
        &self,
        ctx: &mut ExecutionContext,
        whitelist: &DocumentWhitelist,
        request: SearchRequest,
    ) -> Result<SearchResponse, DlsFilterError> {
        let stored = ctx.stash();
        ctx.apply_document_whitelist(whitelist.clone());

        tracing::trace!(
            collections = ?request.collections,
            query = ?request.query,
            whitelisted = whitelist.len(),
            "dispatching filtered search"
        );
        let result = self.engine.search(ctx, request).await;

        ctx.restore(stored);

        result.map_err(|e| {
            tracing::error!(error = %e, "filtered search failed");
            DlsFilterError::Downstream(e)
        })
    }
}
