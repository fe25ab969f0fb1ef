//! Tool configuration
//!
//! `config.toml` under the discpack home holds default builder options and,
//! optionally, specs that apply to every build:
//!
//! ```toml
//! [options]
//! start_at = 8
//! unspecified_file_handling = "warn"
//!
//! [[specs]]
//! path_spec = "Intro.mp3"
//! num = 8
//! ```

use crate::builder::{BuilderOptions, Spec};
use crate::error::{DiscpackError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use discpack_logging::{discpack_home, logs_dir};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Location of the default configuration file.
pub fn default_config_path() -> PathBuf {
    discpack_home().join(CONFIG_FILE_NAME)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscpackConfig {
    #[serde(default)]
    pub options: BuilderOptions,

    /// Specs registered ahead of any spec file
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<Spec>,
}

impl DiscpackConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DiscpackConfig =
            toml::from_str(&content).map_err(|e| DiscpackError::Config(e.to_string()))?;
        config.options.validate()?;
        Ok(config)
    }

    /// Load the default configuration file, falling back to built-in defaults
    /// when it does not exist.
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            debug!(path = %path.display(), "Loading configuration");
            Self::load(&path)
        } else {
            debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load `path` if given, else the default configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
