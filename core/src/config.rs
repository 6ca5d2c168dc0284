//! Client configuration.
//!
//! Configured once at startup, then read on every dispatch. All fields have
//! defaults so an empty file is a valid configuration.

use std::path::Path;

use serde::Deserialize;

use crate::error::FetchError;
use crate::timeout::TimeoutSpec;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Default request timeout. Zero or negative disables it.
    pub timeout_ms: TimeoutSpec,
    /// Prefix for relative request targets such as `/api/kubernetes/...`.
    pub base_url: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: TimeoutSpec::DEFAULT,
            base_url: None,
        }
    }
}

impl FetchConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, FetchError> {
        toml::from_str(content).map_err(|e| FetchError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}
