//! Environment configuration, loadable from JSON

use crate::resolver::ResolverOptions;
use crate::unwrap::DEFAULT_MAX_CAUSE_DEPTH;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// How many nested `cause` values are followed when flattening a thrown value
    pub max_cause_depth: usize,
    /// QuickJS heap limit in bytes
    pub memory_limit: Option<usize>,
    /// QuickJS native stack limit in bytes
    pub max_stack_size: Option<usize>,
    /// Extensions that are also bound as script globals
    pub globals: Vec<String>,
    /// Options for the bundled resolvers
    pub resolver: ResolverOptions,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            max_cause_depth: DEFAULT_MAX_CAUSE_DEPTH,
            memory_limit: None,
            max_stack_size: None,
            globals: Vec::new(),
            resolver: ResolverOptions::default(),
        }
    }
}

impl EnvironmentConfig {
    /// # Errors
    /// Returns an error if the JSON is malformed or has unknown fields
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = EnvironmentConfig::from_json("{}").unwrap();
        assert_eq!(config.max_cause_depth, DEFAULT_MAX_CAUSE_DEPTH);
        assert!(config.globals.is_empty());
        assert_eq!(config.resolver.extensions, vec![".js", ".json"]);
    }

    #[test]
    fn test_partial_override() {
        let config = EnvironmentConfig::from_json(
            r#"{
                "maxCauseDepth": 8,
                "globals": ["console"],
                "resolver": { "packageDirs": ["vendor"] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_cause_depth, 8);
        assert_eq!(config.globals, vec!["console"]);
        assert_eq!(config.resolver.package_dirs, vec!["vendor"]);
        assert_eq!(config.resolver.index_files, vec!["index.js", "index.json"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(EnvironmentConfig::from_json(r#"{ "maxDepth": 3 }"#).is_err());
    }
}
