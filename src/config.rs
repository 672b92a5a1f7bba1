//! Configuration for the harmonization tooling
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (harmonize.toml)
//! - Environment variables (HARMONIZE_*)
//!
//! ## Example config file (harmonize.toml):
//! ```toml
//! [harmonization]
//! path = "./conf/harmonization.json"
//!
//! [check]
//! default_kind = "event"
//! ignore_values = ["0.0.0.0"]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the harmonization tooling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarmonizeConfig {
    /// Where the harmonization schema comes from
    #[serde(default)]
    pub harmonization: HarmonizationSource,

    /// Settings for the check CLI
    #[serde(default)]
    pub check: CheckConfig,
}

/// Harmonization schema source settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarmonizationSource {
    /// Path to the harmonization JSON; the embedded default is used
    /// when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Settings for the check CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Record kind assumed for untagged sample data
    #[serde(default = "default_kind")]
    pub default_kind: String,

    /// Values skipped when replaying sample data
    #[serde(default)]
    pub ignore_values: Vec<String>,
}

fn default_kind() -> String {
    "event".to_string()
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            default_kind: default_kind(),
            ignore_values: Vec::new(),
        }
    }
}

impl HarmonizeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["harmonize.toml", ".harmonize.toml", "config/harmonize.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "harmonize") {
            let xdg_config = config_dir.config_dir().join("harmonize.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (HARMONIZE_*)
        builder = builder.add_source(
            Environment::with_prefix("HARMONIZE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the harmonization schema path (resolves relative paths)
    pub fn harmonization_path(&self) -> Option<PathBuf> {
        let path = self.harmonization.path.as_ref()?;
        if path.is_absolute() {
            Some(path.clone())
        } else {
            Some(
                std::env::current_dir()
                    .unwrap_or_default()
                    .join(path),
            )
        }
    }
}
