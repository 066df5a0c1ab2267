//! Filter-level DLS service.

use std::sync::Arc;

use dls_filter_sdk::{
    DLS_MODE_HEADER, DlsFilterError, DlsMode, FilterOutcome, IndexMap, IndexResolver,
    QueryEngineClient, ReadRequest, RestrictionStore,
};
use docguard_security::ExecutionContext;
use tracing::{debug, warn};

use super::classifier::{self, Classification};
use super::compiler;
use super::prepare::prepare;
use super::rewriter::Rewriter;
use crate::config::DlsFilterConfig;

/// Decides, per read request, whether it passes through or is executed with a
/// document-level filter, and performs the rewrite when needed.
pub struct Service {
    config: DlsFilterConfig,
    resolver: Arc<dyn IndexResolver>,
    restrictions: Arc<dyn RestrictionStore>,
    engine: Arc<dyn QueryEngineClient>,
}

impl Service {
    #[must_use]
    pub fn new(
        config: DlsFilterConfig,
        resolver: Arc<dyn IndexResolver>,
        restrictions: Arc<dyn RestrictionStore>,
        engine: Arc<dyn QueryEngineClient>,
    ) -> Self {
        Self {
            config,
            resolver,
            restrictions,
            engine,
        }
    }

    /// Filters one read request.
    ///
    /// # Errors
    ///
    /// See [`dls_filter_sdk::DlsFilterClient::filter`].
    #[tracing::instrument(skip_all, fields(action, request_id = %ctx.request_id()))]
    pub async fn filter(
        &self,
        ctx: &mut ExecutionContext,
        action: &str,
        mut request: ReadRequest,
    ) -> Result<FilterOutcome, DlsFilterError> {
        tracing::Span::current().record("action", action);

        if !self.config.enabled || ctx.is_filter_level_applied() {
            return Ok(FilterOutcome::PassThrough(request));
        }

        let resolved = self
            .resolver
            .resolve(ctx, &request.target_patterns())
            .await?;
        let restrictions = self.restrictions.restrictions_for(ctx, &resolved).await?;

        if !restrictions.has_restrictions(resolved.local_union()) {
            return Ok(FilterOutcome::PassThrough(request));
        }

        prepare(&mut request, self.config.force_min_doc_count_to_one)?;

        if self.effective_mode(ctx, &restrictions) != DlsMode::FilterLevel {
            return Ok(FilterOutcome::PassThrough(request));
        }

        if let Classification::Skip(_) = classifier::classify(ctx, action) {
            return Ok(FilterOutcome::PassThrough(request));
        }

        let Some(compiled) = compiler::compile(&resolved, &restrictions, None)? else {
            return Ok(FilterOutcome::PassThrough(request));
        };
        debug!(
            filter = ?compiled.filter.query(),
            scoped = compiled.filter.requires_index_scoping(),
            whitelisted = compiled.whitelist.len(),
            "compiled filter-level DLS query"
        );

        Rewriter::new(self.engine.as_ref(), &resolved, &restrictions, compiled)
            .rewrite(ctx, request)
            .await
            .map(FilterOutcome::Intercepted)
    }

    /// Resolves the configured mode to `FilterLevel` or `LuceneLevel`.
    ///
    /// In adaptive mode a filter-level decision is recorded in the context so
    /// later hops of the same logical request keep it. Any other recorded
    /// value is ignored and the mode is recomputed from the restrictions.
    fn effective_mode(&self, ctx: &mut ExecutionContext, restrictions: &IndexMap) -> DlsMode {
        if self.config.mode != DlsMode::Adaptive {
            return self.config.mode;
        }

        let recorded = ctx.header(DLS_MODE_HEADER).map(str::parse::<DlsMode>);
        if let Some(Ok(DlsMode::FilterLevel)) = recorded {
            return DlsMode::FilterLevel;
        }

        if !restrictions.contains_lookup_query() {
            return DlsMode::LuceneLevel;
        }

        if let Some(previous) = ctx.put_header(DLS_MODE_HEADER, DlsMode::FilterLevel.as_str()) {
            warn!(
                recorded = %previous,
                computed = %DlsMode::FilterLevel,
                "DLS mode recorded for this request differs from computed mode; switching to filter level"
            );
        }
        DlsMode::FilterLevel
    }
}
