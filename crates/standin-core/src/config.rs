//! Engine configuration.
//!
//! ```
//! use standin_core::config::EngineConfig;
//!
//! let config = EngineConfig::default()
//!     .with_class_name_prefix("Double")
//!     .with_legacy_doc_annotations(false);
//!
//! assert_eq!(config.class_name_prefix, "Double");
//! assert!(!config.legacy_doc_annotations);
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default prefix of generated proxy type names.
pub const DEFAULT_CLASS_NAME_PREFIX: &str = "Standin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix of generated proxy type names (default: "Standin").
    ///
    /// Must be a valid identifier; generated names are
    /// `<prefix>_<ShortName>_<hash>`.
    pub class_name_prefix: String,

    /// Read `@return` annotations from doc comments when a member declares no
    /// return type (default: true).
    ///
    /// This is a legacy compatibility path. Every use emits a deprecation
    /// warning through `tracing`.
    pub legacy_doc_annotations: bool,

    /// Let final members run their original body when called on a proxy
    /// (default: true).
    ///
    /// Final members are never intercepted. When false, calling one fails
    /// with `UnknownMember`.
    pub allow_final_members_passthrough: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            class_name_prefix: DEFAULT_CLASS_NAME_PREFIX.to_string(),
            legacy_doc_annotations: true,
            allow_final_members_passthrough: true,
        }
    }
}

impl EngineConfig {
    /// Create a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a strict configuration: no legacy annotations, no final passthrough.
    pub fn strict() -> Self {
        Self {
            legacy_doc_annotations: false,
            allow_final_members_passthrough: false,
            ..Self::default()
        }
    }

    /// Builder method: set the generated type name prefix.
    pub fn with_class_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_name_prefix = prefix.into();
        self
    }

    /// Builder method: enable or disable doc-comment return annotations.
    pub fn with_legacy_doc_annotations(mut self, enabled: bool) -> Self {
        self.legacy_doc_annotations = enabled;
        self
    }

    /// Builder method: enable or disable calling final members through proxies.
    pub fn with_final_members_passthrough(mut self, enabled: bool) -> Self {
        self.allow_final_members_passthrough = enabled;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).context("Failed to parse engine config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Check that the configuration can produce valid type names.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.class_name_prefix;
        let valid = prefix
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
            && prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(anyhow!(
                "Invalid class_name_prefix '{}': expected an identifier",
                prefix
            ));
        }
        Ok(())
    }
}
