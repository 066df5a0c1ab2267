//! Domain layer for the DLS filter.

pub mod classifier;
pub mod compiler;
pub mod local_client;
pub(crate) mod prepare;
pub mod rewriter;
pub mod service;
pub(crate) mod translate;

pub use local_client::DlsFilterLocalClient;
pub use service::Service;
