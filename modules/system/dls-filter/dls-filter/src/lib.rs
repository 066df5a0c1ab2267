#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Filter-level document-level security.
//!
//! Rewrites permitted read requests so that only documents the caller may see
//! are returned:
//!
//! 1. [`domain::classifier`] decides whether rewriting applies at all
//! 2. [`domain::compiler`] folds the per-collection restrictions into one
//!    composite filter plus a document whitelist
//! 3. [`domain::rewriter`] executes the rewritten request and translates the
//!    result back into the caller's response shape
//!
//! [`domain::Service`] wires the steps together behind
//! [`dls_filter_sdk::DlsFilterClient`].

pub mod config;
pub mod domain;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use config::DlsFilterConfig;
pub use domain::{DlsFilterLocalClient, Service};
