//! Repository layer configuration.
//!
//! # Responsibility
//! - Carry naming-convention and key-generation settings for repositories.
//! - Stay a plain value type: construction sites pass it explicitly.
//!
//! # Invariants
//! - Every field has a usable default; partial deserialization is supported.

use serde::Deserialize;

const DEFAULT_MODELS_NAMESPACE: &str = "models::";
const DEFAULT_REPOSITORIES_NAMESPACE: &str = "repositories::";
const DEFAULT_REPOSITORY_SUFFIX: &str = "Repository";

/// Settings shared by name resolution and repository construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Logical namespace prepended to resolved model names.
    pub models_namespace: String,
    /// Logical namespace prepended to resolved repository names.
    pub repositories_namespace: String,
    /// Suffix appended to entity names when resolving repository names.
    pub repository_suffix: String,
    /// When true, `create` injects a generated v4 uuid as the primary key.
    pub use_uuid: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            models_namespace: DEFAULT_MODELS_NAMESPACE.to_string(),
            repositories_namespace: DEFAULT_REPOSITORIES_NAMESPACE.to_string(),
            repository_suffix: DEFAULT_REPOSITORY_SUFFIX.to_string(),
            use_uuid: false,
        }
    }
}

impl RepoConfig {
    /// Returns a copy with `use_uuid` replaced.
    pub fn with_uuid(mut self, use_uuid: bool) -> Self {
        self.use_uuid = use_uuid;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::RepoConfig;

    #[test]
    fn defaults_match_documented_conventions() {
        let config = RepoConfig::default();
        assert_eq!(config.models_namespace, "models::");
        assert_eq!(config.repositories_namespace, "repositories::");
        assert_eq!(config.repository_suffix, "Repository");
        assert!(!config.use_uuid);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: RepoConfig =
            serde_json::from_str(r#"{"use_uuid": true}"#).expect("partial config should parse");
        assert!(config.use_uuid);
        assert_eq!(config.repository_suffix, "Repository");
    }

    #[test]
    fn with_uuid_replaces_only_key_generation() {
        let config = RepoConfig::default().with_uuid(true);
        assert!(config.use_uuid);
        assert_eq!(config.models_namespace, "models::");
    }
}
