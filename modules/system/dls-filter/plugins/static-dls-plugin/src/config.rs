use dls_filter_sdk::Query;
use serde::Deserialize;
use uuid::Uuid;

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticDlsPluginConfig {
    /// Local collections known to the resolver.
    pub collections: Vec<String>,

    /// Restriction rules.
    pub restrictions: Vec<RestrictionConfig>,
}

/// A single restriction rule in the plugin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestrictionConfig {
    /// Collection name or glob pattern the rule applies to.
    pub collection: String,

    /// Subject the rule applies to. Applies to every subject when absent.
    #[serde(default)]
    pub subject_id: Option<Uuid>,

    /// Queries of which at least one must match for a document to be visible.
    pub queries: Vec<Query>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn config_parses_rules() {
        let yaml = r#"
collections: [orders, logs, users]
restrictions:
  - collection: "orders*"
    subject_id: "00000000-0000-0000-0000-000000000001"
    queries:
      - term:
          field: region
          value: EU
      - lookup:
          field: team
          lookup:
            collection: users
            id: alice
            path: teams
"#;

        let parsed: Result<StaticDlsPluginConfig, _> = serde_saphyr::from_str(yaml);
        let cfg = match parsed {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        };

        assert_eq!(cfg.collections, vec!["orders", "logs", "users"]);
        assert_eq!(cfg.restrictions.len(), 1);
        let rule = &cfg.restrictions[0];
        assert_eq!(rule.collection, "orders*");
        assert!(rule.subject_id.is_some());
        assert_eq!(rule.queries[0], Query::term("region", "EU"));
        assert!(rule.queries[1].contains_lookup());
    }

    #[test]
    fn config_allows_empty_document() {
        let parsed: Result<StaticDlsPluginConfig, _> = serde_saphyr::from_str("{}");
        let cfg = match parsed {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        };
        assert!(cfg.collections.is_empty());
        assert!(cfg.restrictions.is_empty());
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let yaml = r"
collections: [orders]
field_masks: []
";
        let parsed: Result<StaticDlsPluginConfig, _> = serde_saphyr::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn rule_requires_queries() {
        let yaml = r"
restrictions:
  - collection: orders
";
        let parsed: Result<StaticDlsPluginConfig, _> = serde_saphyr::from_str(yaml);
        assert!(parsed.is_err());
    }
}
