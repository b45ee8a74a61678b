//! Configuration
//!
//! Read from an optional JSON file, then overridden from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PatchbayError, Result};

/// Environment variable overriding [`Config::data_dir`]
pub const DATA_DIR_ENV: &str = "PATCHBAY_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the bank records and current selection
    pub data_dir: PathBuf,

    /// Name of the bank created when the store is empty
    pub default_bank_name: String,

    /// Name of the patch created alongside the default bank
    pub default_patch_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("patchbay-data"),
            default_bank_name: "Default Bank".to_string(),
            default_patch_name: "Empty Patch".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config
            .with_overrides(|key| std::env::var(key).ok())
            .validated()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PatchbayError::Config {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config = serde_json::from_str(&content).map_err(|e| PatchbayError::Config {
            reason: format!("cannot parse {}: {}", path.display(), e),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn validated(self) -> Result<Self> {
        if self.default_bank_name.trim().is_empty() {
            return Err(PatchbayError::Config {
                reason: "default_bank_name must not be empty".to_string(),
            });
        }
        if self.default_patch_name.trim().is_empty() {
            return Err(PatchbayError::Config {
                reason: "default_patch_name must not be empty".to_string(),
            });
        }
        Ok(self)
    }
}
