//! Configuration types.
//!
//! A view is configured from a TOML file. Every field has a default so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::action::BulkActionDef;
use crate::error::ConfigError;

/// Collection view configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Fields the search text is matched against.
    pub searchable_fields: Vec<String>,

    /// Quiet period before search input is applied. 0 applies immediately.
    pub search_debounce_ms: u64,

    /// Initial page size.
    pub page_size: usize,

    /// Page sizes offered to the user.
    pub page_sizes: Vec<usize>,

    /// Bulk actions available on the selection.
    pub actions: Vec<BulkActionDef>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            searchable_fields: vec!["name".to_string()],
            search_debounce_ms: 300,
            page_size: 10,
            page_sizes: vec![10, 25, 50],
            actions: vec![BulkActionDef::new("delete", "Delete").destructive()],
        }
    }
}

impl ViewConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ViewConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validated()
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Clamp page sizes to at least 1 and reject inconsistent settings.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.page_size = self.page_size.max(1);
        self.page_sizes.retain(|&n| n >= 1);

        if let Some(field) = self.searchable_fields.iter().find(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "empty searchable field name: {:?}",
                field
            )));
        }

        let mut seen = HashSet::new();
        for action in &self.actions {
            if action.id.trim().is_empty() {
                return Err(ConfigError::Invalid("action with empty id".to_string()));
            }
            if !seen.insert(action.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate action id '{}'",
                    action.id
                )));
            }
        }

        Ok(self)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("shelf"))
}

/// Get the default config file path.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}
