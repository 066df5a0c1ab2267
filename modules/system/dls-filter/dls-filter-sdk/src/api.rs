//! Public API and collaborator traits.

use async_trait::async_trait;
use docguard_security::ExecutionContext;

use crate::error::{DlsFilterError, QueryEngineError};
use crate::models::{FilterOutcome, ReadRequest, SearchRequest, SearchResponse};
use crate::restriction::{IndexMap, ResolvedIndices};

/// Public API of the DLS filter.
///
/// ```ignore
/// let dls = hub.get::<dyn DlsFilterClient>()?;
///
/// let outcome = dls.filter(&mut ctx, actions::SEARCH, request).await?;
/// ```
#[async_trait]
pub trait DlsFilterClient: Send + Sync {
    /// Decide whether `request` passes through or is executed with a
    /// document-level filter applied.
    ///
    /// # Errors
    ///
    /// Any error is an intercepted failure and is the caller's final answer:
    /// - `Denied` / `Unsupported` for requests DLS cannot serve
    /// - `Compile` if restriction rules could not be compiled
    /// - `Internal` for invariant violations
    /// - `Downstream` for query engine failures, unchanged
    async fn filter(
        &self,
        ctx: &mut ExecutionContext,
        action: &str,
        request: ReadRequest,
    ) -> Result<FilterOutcome, DlsFilterError>;
}

/// Expands collection patterns and aliases to concrete collections.
#[async_trait]
pub trait IndexResolver: Send + Sync {
    async fn resolve(
        &self,
        ctx: &ExecutionContext,
        patterns: &[String],
    ) -> Result<ResolvedIndices, DlsFilterError>;
}

/// Supplies the DLS restrictions that apply to the caller.
///
/// Queried once per request; results are not cached across requests.
#[async_trait]
pub trait RestrictionStore: Send + Sync {
    async fn restrictions_for(
        &self,
        ctx: &ExecutionContext,
        resolved: &ResolvedIndices,
    ) -> Result<IndexMap, DlsFilterError>;
}

/// The downstream search engine.
///
/// The context passed in carries the filter-level marker and the attached
/// document whitelist, so calls the engine makes back into the read path
/// see both.
#[async_trait]
pub trait QueryEngineClient: Send + Sync {
    async fn search(
        &self,
        ctx: &ExecutionContext,
        request: SearchRequest,
    ) -> Result<SearchResponse, QueryEngineError>;
}
