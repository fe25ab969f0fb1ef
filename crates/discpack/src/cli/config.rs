//! `discpack config`: show paths and the resolved builder options

use crate::cli::load_config;
use anyhow::Result;
use discpack::config::{default_config_path, discpack_home, logs_dir};
use std::path::Path;

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show resolved configuration in JSON format
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let home = discpack_home();
    let logs = logs_dir();
    let config_file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let config = load_config(config_path)?;
    let options = &config.options;

    if args.json {
        let payload = serde_json::json!({
            "home": home.to_string_lossy(),
            "logs": {
                "path": logs.to_string_lossy(),
                "exists": logs.exists(),
            },
            "config_file": {
                "path": config_file.to_string_lossy(),
                "exists": config_file.exists(),
            },
            "options": options,
            "specs": config.specs.len(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("DISCPACK CONFIGURATION");
        println!("======================");
        println!();
        println!("Home:    {}", home.display());
        println!("Logs:    {}", logs.display());
        println!(
            "Config:  {} ({})",
            config_file.display(),
            if config_file.exists() { "exists" } else { "not found" }
        );
        println!();
        println!("Options:");
        println!("  required:                         {}", options.required);
        println!("  hue:                              {}", options.hue);
        println!("  use_album_art:                    {}", options.use_album_art);
        println!("  license:                          {}", options.license);
        println!(
            "  unspecified_file_handling:        {}",
            options.unspecified_file_handling.as_str()
        );
        println!(
            "  enforce_contiguous_track_numbers: {}",
            options.enforce_contiguous_track_numbers.as_str()
        );
        println!("  strict_file_checking:             {}", options.strict_file_checking);
        println!("  start_at:                         {}", options.start_at);
        println!();
        println!("Configured specs: {}", config.specs.len());
    }

    Ok(())
}
