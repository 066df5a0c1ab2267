//! Configuration for the DLS filter module.

use std::path::Path;

use anyhow::Context as _;
use dls_filter_sdk::DlsMode;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment prefix for overrides, e.g. `DOCGUARD_DLS_MODE=filter_level`.
pub const ENV_PREFIX: &str = "DOCGUARD_DLS_";

/// Module configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DlsFilterConfig {
    /// When `false` every request passes through untouched.
    pub enabled: bool,

    /// Enforcement mode.
    pub mode: DlsMode,

    /// Rewrite `min_doc_count: 0` terms aggregations to `1` instead of
    /// rejecting the search. Zero-count buckets would reveal terms of
    /// hidden documents.
    pub force_min_doc_count_to_one: bool,
}

impl Default for DlsFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: DlsMode::Adaptive,
            force_min_doc_count_to_one: false,
        }
    }
}

impl DlsFilterConfig {
    /// Loads the configuration: defaults, then the optional YAML file, then
    /// `DOCGUARD_DLS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be parsed or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .context("invalid dls-filter configuration")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_applied() {
        let parsed: Result<DlsFilterConfig, _> = serde_saphyr::from_str("{}");
        let cfg = match parsed {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        };

        assert!(cfg.enabled);
        assert_eq!(cfg.mode, DlsMode::Adaptive);
        assert!(!cfg.force_min_doc_count_to_one);
    }

    #[test]
    fn config_parses_mode() {
        let yaml = r"
mode: filter_level
force_min_doc_count_to_one: true
";
        let cfg: DlsFilterConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(cfg.mode, DlsMode::FilterLevel);
        assert!(cfg.force_min_doc_count_to_one);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let yaml = r"
mode: adaptive
field_masking: true
";
        let parsed: Result<DlsFilterConfig, _> = serde_saphyr::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("dls.yaml", "mode: lucene_level\nenabled: false\n")?;
            jail.set_env("DOCGUARD_DLS_MODE", "filter_level");

            let cfg = DlsFilterConfig::load(Some(Path::new("dls.yaml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(cfg.mode, DlsMode::FilterLevel);
            assert!(!cfg.enabled);
            Ok(())
        });
    }

    #[test]
    fn load_without_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let cfg = DlsFilterConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg, DlsFilterConfig::default());
            Ok(())
        });
    }
}
