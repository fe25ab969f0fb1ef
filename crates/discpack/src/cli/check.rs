//! `discpack check`: validate a spec file without touching any audio

use crate::cli::error::HelpfulError;
use crate::cli::{load_config, load_spec_file};
use anyhow::Result;
use discpack::builder::{BuildSession, ConflictValidator};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Arguments for the check command
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Spec file to validate
    #[arg(short = 's', long = "specs")]
    pub spec_file: PathBuf,

    /// Lowest track number to auto-assign
    #[arg(short = 'n', long)]
    pub start_at: Option<u32>,

    /// Also reject specs that might overlap
    #[arg(long)]
    pub strict: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: CheckArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut options = config.options;
    if let Some(start_at) = args.start_at {
        options.start_at = start_at;
    }
    if args.strict {
        options.strict_file_checking = true;
    }

    let mut specs = config.specs;
    specs.extend(load_spec_file(&args.spec_file)?);

    let session = BuildSession::new(specs, options)
        .map_err(|err| HelpfulError::build_failed(&err))?;

    // Same checks a build runs when its session opens.
    ConflictValidator::from_options(session.options())
        .validate(session.specs(), true)
        .map_err(|err| HelpfulError::build_failed(&err))?;

    let specs = session.specs();
    if args.json {
        let payload = json!({
            "valid": true,
            "path": args.spec_file,
            "specs": specs,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "{}: {} spec(s), no conflicts",
            args.spec_file.display(),
            specs.len()
        );
    }
    Ok(())
}
