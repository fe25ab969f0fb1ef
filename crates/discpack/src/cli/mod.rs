//! CLI commands for discpack

pub mod check;
pub mod config;
pub mod error;
pub mod output;
pub mod plan;

use anyhow::Result;
use discpack::builder::Spec;
use discpack::config::{default_config_path, DiscpackConfig};
use discpack::spec_file::read_specs;
use error::HelpfulError;
use std::path::Path;

/// Load the tool configuration from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<DiscpackConfig> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(HelpfulError::file_not_found(path).into());
        }
    }
    DiscpackConfig::load_or_default(path).map_err(|err| {
        let shown = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        HelpfulError::unreadable(&shown, &err).into()
    })
}

/// Read a spec file, turning failures into helpful errors.
pub fn load_spec_file(path: &Path) -> Result<Vec<Spec>> {
    if !path.exists() {
        return Err(HelpfulError::file_not_found(path).into());
    }
    read_specs(path).map_err(|err| HelpfulError::unreadable(path, &err).into())
}
