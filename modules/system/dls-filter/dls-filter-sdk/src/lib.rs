#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! DLS filter SDK
//!
//! This crate provides the public API for the `dls-filter` module:
//!
//! - [`DlsFilterClient`] - Public API trait for the read path
//! - [`IndexResolver`], [`RestrictionStore`], [`QueryEngineClient`] - Collaborator traits
//! - [`Query`] - Composable restriction / search query model
//! - [`DlsRestriction`], [`IndexMap`], [`ResolvedIndices`] - Restriction model
//! - [`ReadRequest`], [`ReadResponse`], [`FilterOutcome`] - Request shapes and results
//! - [`DlsFilterError`], [`QueryEngineError`] - Error types
//!
//! ## Usage
//!
//! ```ignore
//! use dls_filter_sdk::{DlsFilterClient, FilterOutcome};
//!
//! match dls.filter(&mut ctx, action, request).await? {
//!     FilterOutcome::PassThrough(request) => engine.execute(request).await,
//!     FilterOutcome::Intercepted(response) => Ok(response),
//! }
//! ```

pub mod actions;
pub mod api;
pub mod error;
pub mod models;
pub mod query;
pub mod restriction;

// Re-export main types at crate root
pub use api::{DlsFilterClient, IndexResolver, QueryEngineClient, RestrictionStore};
pub use error::{DlsFilterError, QueryEngineError};
pub use models::{
    DLS_MODE_HEADER, DlsMode, DocumentVersion, FilterOutcome, GetRequest, GetResult, MultiGetItem,
    MultiGetRequest, MultiGetResponse, ReadRequest, ReadResponse, SearchHit, SearchRequest,
    SearchResponse, ShardResolutionRequest, TermsAggregation,
};
pub use query::{COLLECTION_FIELD, Query, TermsLookup};
pub use restriction::{DlsRestriction, IndexMap, ResolvedIndices};
