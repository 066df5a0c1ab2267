#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static DLS plugin.
//!
//! Serves a fixed collection catalogue as [`dls_filter_sdk::IndexResolver`]
//! and fixed restriction rules as [`dls_filter_sdk::RestrictionStore`].

pub mod config;
pub mod domain;

pub use config::StaticDlsPluginConfig;
pub use domain::Service;
