//! Import normalization settings

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for format detection and country-list splitting
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Country lists longer than this (in characters) that contain the
    /// separator become one aggregate record instead of one per country
    pub aggregate_threshold: usize,
    /// Separator between countries in a corrected-format row
    pub country_separator: char,
    /// Placeholder meaning "no country"
    pub sentinel: String,
    /// Filename tokens of the primary fee export
    pub primary_tokens: Vec<String>,
    /// Filename tokens of the corrected fee exports
    pub corrected_tokens: Vec<String>,
    /// Filename tokens of this tool's own JSON export
    pub catalog_tokens: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            aggregate_threshold: 100,
            country_separator: ',',
            sentinel: "-".to_string(),
            primary_tokens: vec!["feesexport".to_string()],
            corrected_tokens: vec!["feescorrected".to_string(), "feespage".to_string()],
            catalog_tokens: vec!["visa-catalog".to_string()],
        }
    }
}

impl NormalizerConfig {
    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate().map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Save settings to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let groups = [
            ("primary_tokens", &self.primary_tokens),
            ("corrected_tokens", &self.corrected_tokens),
            ("catalog_tokens", &self.catalog_tokens),
        ];
        for (name, tokens) in groups {
            if tokens.iter().any(|t| t.is_empty()) {
                return Err(format!("{} must not contain empty tokens", name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: NormalizerConfig =
            serde_json::from_str(r#"{ "aggregate_threshold": 40 }"#).unwrap();
        assert_eq!(config.aggregate_threshold, 40);
        assert_eq!(config.country_separator, ',');
        assert_eq!(config.sentinel, "-");
        assert_eq!(config.primary_tokens, vec!["feesexport"]);
    }

    #[test]
    fn test_load_rejects_empty_tokens() {
        let path = std::env::temp_dir().join(format!("visa-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "primary_tokens": [""] }"#).unwrap();

        let result = NormalizerConfig::load(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("visa-config-rt-{}.json", std::process::id()));
        let config = NormalizerConfig {
            aggregate_threshold: 120,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = NormalizerConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }
}
