use async_trait::async_trait;
use dls_filter_sdk::{DlsFilterError, IndexMap, IndexResolver, ResolvedIndices, RestrictionStore};
use docguard_security::ExecutionContext;

use super::service::Service;

#[async_trait]
impl IndexResolver for Service {
    async fn resolve(
        &self,
        _ctx: &ExecutionContext,
        patterns: &[String],
    ) -> Result<ResolvedIndices, DlsFilterError> {
        Service::resolve(self, patterns).map_err(|e| DlsFilterError::Resolution(e.to_string()))
    }
}

#[async_trait]
impl RestrictionStore for Service {
    async fn restrictions_for(
        &self,
        ctx: &ExecutionContext,
        resolved: &ResolvedIndices,
    ) -> Result<IndexMap, DlsFilterError> {
        Ok(Service::restrictions_for(self, ctx.subject_id(), resolved))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{RestrictionConfig, StaticDlsPluginConfig};
    use dls_filter_sdk::Query;
    use uuid::Uuid;

    fn owner() -> Uuid {
        Uuid::parse_str("33333333-3333-3333-3333-333333333333").unwrap()
    }

    fn service() -> Service {
        let cfg = StaticDlsPluginConfig {
            collections: vec!["orders".to_owned(), "logs".to_owned()],
            restrictions: vec![RestrictionConfig {
                collection: "orders".to_owned(),
                subject_id: Some(owner()),
                queries: vec![Query::term("region", "EU")],
            }],
        };
        Service::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn resolver_and_store_serve_configured_rules() {
        let service = service();
        let resolver: &dyn IndexResolver = &service;
        let store: &dyn RestrictionStore = &service;
        let ctx = ExecutionContext::builder().subject_id(owner()).build();

        let resolved = resolver.resolve(&ctx, &["*".to_owned()]).await.unwrap();
        let restrictions = store.restrictions_for(&ctx, &resolved).await.unwrap();

        assert!(resolved.is_local_all());
        assert!(restrictions.has_restrictions(resolved.local_union()));
        assert!(restrictions.restriction_for("logs").is_unrestricted());
    }

    #[tokio::test]
    async fn other_subjects_are_unrestricted() {
        let service = service();
        let store: &dyn RestrictionStore = &service;
        let ctx = ExecutionContext::default();
        let resolved = ResolvedIndices::local(["orders"]);

        let restrictions = store.restrictions_for(&ctx, &resolved).await.unwrap();

        assert!(!restrictions.has_restrictions(resolved.local_union()));
    }

    #[tokio::test]
    async fn malformed_pattern_is_a_resolution_error() {
        let service = service();
        let resolver: &dyn IndexResolver = &service;

        let err = resolver
            .resolve(&ExecutionContext::default(), &["orders-[".to_owned()])
            .await
            .unwrap_err();

        assert!(matches!(err, DlsFilterError::Resolution(_)));
    }
}
