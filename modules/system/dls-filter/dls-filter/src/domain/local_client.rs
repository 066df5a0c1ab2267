//! Local (in-process) client for the DLS filter.

use std::sync::Arc;

use async_trait::async_trait;
use dls_filter_sdk::{DlsFilterClient, DlsFilterError, FilterOutcome, ReadRequest};
use docguard_security::ExecutionContext;

use super::Service;

/// Local client wrapping the filter service.
pub struct DlsFilterLocalClient {
    svc: Arc<Service>,
}

impl DlsFilterLocalClient {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self { svc }
    }
}

fn log_failure(action: &str, e: DlsFilterError) -> DlsFilterError {
    match &e {
        DlsFilterError::Denied(_) | DlsFilterError::Unsupported(_) => {
            tracing::debug!(action, error = %e, "read request rejected by DLS filter");
        }
        _ => tracing::error!(action, error = ?e, "DLS filter call failed"),
    }
    e
}

#[async_trait]
impl DlsFilterClient for DlsFilterLocalClient {
    async fn filter(
        &self,
        ctx: &mut ExecutionContext,
        action: &str,
        request: ReadRequest,
    ) -> Result<FilterOutcome, DlsFilterError> {
        self.svc
            .filter(ctx, action, request)
            .await
            .map_err(|e| log_failure(action, e))
    }
}
