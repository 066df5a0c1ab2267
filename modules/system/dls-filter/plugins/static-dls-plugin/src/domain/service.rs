//! Service implementation for the static DLS plugin.

use std::collections::BTreeSet;

use dls_filter_sdk::{DlsRestriction, IndexMap, Query, ResolvedIndices};
use glob::Pattern;
use uuid::Uuid;

use crate::config::StaticDlsPluginConfig;

/// Patterns selecting every local collection.
const ALL_PATTERNS: [&str; 2] = ["*", "_all"];

/// Invalid plugin configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid collection pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("restriction on `{0}` has no queries")]
    EmptyRestriction(String),

    #[error("collection `{0}` is listed more than once")]
    DuplicateCollection(String),
}

struct Rule {
    collection: Pattern,
    subject_id: Option<Uuid>,
    queries: Vec<Query>,
}

impl Rule {
    fn applies_to(&self, collection: &str, subject_id: Option<Uuid>) -> bool {
        self.collection.matches(collection)
            && self.subject_id.is_none_or(|s| Some(s) == subject_id)
    }
}

/// Static DLS service.
///
/// - resolves names and glob patterns against the configured catalogue;
///   `*` and `_all` select the whole catalogue, `cluster:name` is remote
/// - serves every rule whose collection pattern and subject match
pub struct Service {
    collections: BTreeSet<String>,
    rules: Vec<Rule>,
}

impl Service {
    /// Builds the service from its configuration.
    ///
    /// # Errors
    ///
    /// Fails on invalid glob patterns, rules without queries and duplicate
    /// catalogue entries.
    pub fn from_config(cfg: &StaticDlsPluginConfig) -> anyhow::Result<Self> {
        let mut collections = BTreeSet::new();
        for name in &cfg.collections {
            if !collections.insert(name.clone()) {
                return Err(ConfigError::DuplicateCollection(name.clone()).into());
            }
        }

        let rules = cfg
            .restrictions
            .iter()
            .map(|r| {
                if r.queries.is_empty() {
                    return Err(ConfigError::EmptyRestriction(r.collection.clone()));
                }
                Ok(Rule {
                    collection: compile_pattern(&r.collection)?,
                    subject_id: r.subject_id,
                    queries: r.queries.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            collections = collections.len(),
            rules = rules.len(),
            "static DLS plugin configured"
        );
        Ok(Self { collections, rules })
    }

    /// Expands `patterns` to concrete collections.
    ///
    /// An empty pattern list selects every local collection. A concrete name
    /// missing from the catalogue is kept so that the query engine reports it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for malformed glob patterns.
    pub fn resolve(&self, patterns: &[String]) -> Result<ResolvedIndices, ConfigError> {
        if patterns.is_empty() {
            return Ok(ResolvedIndices::local_all(self.collections.iter().cloned()));
        }

        let mut local = BTreeSet::new();
        let mut remote = BTreeSet::new();
        let mut local_all = false;

        for pattern in patterns {
            if ALL_PATTERNS.contains(&pattern.as_str()) {
                local_all = true;
                local.extend(self.collections.iter().cloned());
            } else if pattern.contains(':') {
                remote.insert(pattern.clone());
            } else if is_wildcard(pattern) {
                let compiled = compile_pattern(pattern)?;
                local.extend(
                    self.collections
                        .iter()
                        .filter(|c| compiled.matches(c))
                        .cloned(),
                );
            } else {
                local.insert(pattern.clone());
            }
        }

        let resolved = if local_all {
            ResolvedIndices::local_all(local)
        } else {
            ResolvedIndices::local(local)
        };
        Ok(resolved.with_remote(remote))
    }

    /// Restrictions of `subject_id` on the local collections of `resolved`.
    #[must_use]
    pub fn restrictions_for(&self, subject_id: Option<Uuid>, resolved: &ResolvedIndices) -> IndexMap {
        resolved
            .local_union()
            .iter()
            .filter_map(|collection| {
                let queries: Vec<Query> = self
                    .rules
                    .iter()
                    .filter(|r| r.applies_to(collection, subject_id))
                    .flat_map(|r| r.queries.iter().cloned())
                    .collect();
                (!queries.is_empty())
                    .then(|| (collection.clone(), DlsRestriction::restricted(queries)))
            })
            .collect()
    }
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn compile_pattern(pattern: &str) -> Result<Pattern, ConfigError> {
    Pattern::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_owned(),
        source,
    })
}
