#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Request-scoped security primitives shared by the docguard modules.
//!
//! - [`ExecutionContext`] - per-request key/value store carrying the
//!   filter-level marker, the attached [`DocumentWhitelist`] and ambient
//!   attributes
//! - [`DocumentWhitelist`] - `(collection, id)` pairs allowed to bypass
//!   restriction re-evaluation

pub mod context;
pub mod whitelist;

pub use context::{ExecutionContext, ExecutionContextBuilder, StoredContext};
pub use whitelist::{DOCUMENT_WHITELIST_HEADER, DocumentRef, DocumentWhitelist, WhitelistParseError};
