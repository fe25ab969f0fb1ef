//! `discpack plan`: resolve input files into numbered tracks
//!
//! Discovers audio files, runs them through one build session and reports the
//! resulting track list. With `--out-dir` the registry files are written too.

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_hue, format_number_list, print_table};
use crate::cli::{load_config, load_spec_file};
use anyhow::{Context, Result};
use discpack::builder::{
    BuildError, BuildSession, BuilderOptions, ContiguityPolicy, PermissionLevel, Track,
    UnspecifiedFileHandling,
};
use discpack::discover::discover_audio;
use discpack::pipeline::{build_tracks, BuildOutcome, CollectingSink};
use discpack::registry::{pack_permission, write_registry, PackPermission};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

/// Arguments for the plan command
#[derive(Debug, clap::Args)]
pub struct PlanArgs {
    /// A music file or folder to include (defaults to the current directory)
    #[arg(short = 'i', long = "input")]
    pub inputs: Vec<PathBuf>,

    /// Spec file for fine-grained track specification (.toml, .json, .csv, .tsv)
    #[arg(short = 's', long = "specs")]
    pub spec_file: Option<PathBuf>,

    /// Lowest track number to auto-assign
    #[arg(short = 'n', long)]
    pub start_at: Option<u32>,

    /// Only fail on unmatched specs explicitly marked as required
    #[arg(short = 'm', long)]
    pub ignore_missing: bool,

    /// What to do with files no spec matches: use-defaults, warn or error
    #[arg(short = 'u', long)]
    pub unspecified_file_handling: Option<UnspecifiedFileHandling>,

    /// Do not fail when unmatched specs leave gaps in the track numbers
    ///
    /// Only relaxes the closing check; specs whose explicit numbers cannot
    /// form a gap-free run are still rejected up front.
    #[arg(short = 'g', long)]
    pub allow_track_number_gaps: bool,

    /// Also reject specs that might overlap
    #[arg(long)]
    pub strict: bool,

    /// Usage level for the whole pack (derived from the tracks if omitted)
    #[arg(long)]
    pub license: Option<PermissionLevel>,

    /// License or credits file shipped with the pack
    #[arg(long)]
    pub license_file: Option<PathBuf>,

    /// Write registry files into this directory
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    /// Layer command-line flags over configured options.
    fn apply_to(&self, options: &mut BuilderOptions) {
        if let Some(start_at) = self.start_at {
            options.start_at = start_at;
        }
        if self.ignore_missing {
            options.required = false;
        }
        if let Some(handling) = self.unspecified_file_handling {
            options.unspecified_file_handling = handling;
        }
        if self.allow_track_number_gaps {
            options.enforce_contiguous_track_numbers = ContiguityPolicy::Ignore;
        }
        if self.strict {
            options.strict_file_checking = true;
        }
    }
}

pub fn run(args: PlanArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut options = config.options;
    args.apply_to(&mut options);

    let mut specs = config.specs;
    if let Some(spec_file) = &args.spec_file {
        specs.extend(load_spec_file(spec_file)?);
    }

    if let Some(license_file) = &args.license_file {
        if !license_file.is_file() {
            return Err(HelpfulError::file_not_found(license_file).into());
        }
    }

    let mut session = BuildSession::new(specs, options).map_err(build_failed)?;

    let inputs = if args.inputs.is_empty() {
        vec![std::env::current_dir().context("Failed to determine the current directory")?]
    } else {
        args.inputs.clone()
    };
    let candidates = discover_audio(&inputs).context("Failed to discover input files")?;
    info!(files = candidates.len(), "Discovered input files");

    let mut sink = CollectingSink::new();
    let outcome = build_tracks(&mut session, &candidates, &mut sink).map_err(build_failed)?;
    let mut tracks = sink.into_tracks();
    tracks.sort_by_key(Track::number);

    let permission = pack_permission(&tracks, args.license, args.license_file.is_some())
        .map_err(|err| {
            HelpfulError::new(err.to_string())
                .with_context("The pack license must cover every track")
                .with_suggestions([
                    "TRY: Omit --license to derive the level from the tracks",
                    "TRY: Provide a license file with --license-file",
                ])
        })?;

    if let Some(out_dir) = &args.out_dir {
        let written = write_registry(out_dir, &tracks, &permission)
            .with_context(|| format!("Failed to write registry files to {}", out_dir.display()))?;
        if let Some(license_file) = &args.license_file {
            if let Some(name) = license_file.file_name() {
                std::fs::copy(license_file, out_dir.join(name))
                    .with_context(|| format!("Failed to copy {}", license_file.display()))?;
            }
        }
        info!(files = written.len(), dir = %out_dir.display(), "Wrote registry files");
    }

    if args.json {
        print_json(&tracks, &outcome, &permission)?;
    } else {
        print_human(&tracks, &outcome, &permission);
    }
    Ok(())
}

fn build_failed(err: BuildError) -> anyhow::Error {
    HelpfulError::build_failed(&err).into()
}

fn print_json(tracks: &[Track], outcome: &BuildOutcome, permission: &PackPermission) -> Result<()> {
    let report = &outcome.report;
    let payload = json!({
        "tracks": tracks
            .iter()
            .map(|track| json!({
                "number": track.number(),
                "name": track.display_name(),
                "path": track.path(),
                "hue": track.hue(),
                "use_album_art": track.use_album_art(),
                "license": track.license(),
            }))
            .collect::<Vec<_>>(),
        "n_discs": report.highest_number().unwrap_or(0),
        "unused": report.unused,
        "missing_numbers": report.missing_numbers,
        "defaulted": report.defaulted,
        "skipped": outcome.skipped,
        "warnings": report.warnings,
        "permission": permission.level,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn print_human(tracks: &[Track], outcome: &BuildOutcome, permission: &PackPermission) {
    let report = &outcome.report;
    if tracks.is_empty() {
        println!("No tracks resolved.");
    } else {
        let rows = tracks
            .iter()
            .map(|track| {
                vec![
                    track.number().to_string(),
                    track.display_name(),
                    track.path().display().to_string(),
                    format_hue(track.hue()),
                    track.license().to_string(),
                ]
            })
            .collect();
        print_table(&["#", "NAME", "SOURCE", "HUE", "LICENSE"], rows);
    }

    println!();
    println!("Discs:           {}", report.highest_number().unwrap_or(0));
    println!("Missing numbers: {}", format_number_list(&report.missing_numbers));
    println!("Pack license:    {} ({})", permission.level, permission.summary());
    for spec in &report.unused {
        println!("Unused spec:     {}", spec.path_spec.display());
    }
    for path in &outcome.skipped {
        println!("Skipped:         {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        plan: PlanArgs,
    }

    #[test]
    fn test_flags_override_options() {
        let harness = Harness::parse_from(["plan", "-n", "8", "-m", "-g", "-u", "warning", "--strict"]);
        let mut options = BuilderOptions::default();
        harness.plan.apply_to(&mut options);

        assert_eq!(options.start_at, 8);
        assert!(!options.required);
        assert_eq!(options.unspecified_file_handling, UnspecifiedFileHandling::Warn);
        assert_eq!(options.enforce_contiguous_track_numbers, ContiguityPolicy::Ignore);
        assert!(options.strict_file_checking);
    }

    #[test]
    fn test_no_flags_keep_configured_options() {
        let harness = Harness::parse_from(["plan"]);
        let mut options = BuilderOptions {
            start_at: 4,
            ..Default::default()
        };
        harness.plan.apply_to(&mut options);
        assert_eq!(options.start_at, 4);
        assert!(options.required);
    }

    #[test]
    fn test_license_flag_parses_levels() {
        let harness = Harness::parse_from(["plan", "--license", "Attribution"]);
        assert_eq!(harness.plan.license, Some(PermissionLevel::Attribution));
    }
}
