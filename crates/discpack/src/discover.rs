//! Input discovery
//!
//! Turns the user's list of files and folders into a deterministic, ordered
//! list of candidate audio files. Order matters: it decides which file claims
//! an auto-assigned track number first. Relative inputs are resolved against
//! the working directory so specs can match on any parent folder.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions treated as audio without probing the file.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "ogg", "oga", "wav", "flac", "m4a", "aac", "opus", "wma", "aiff", "aif", "alac",
    "webm", "mka",
];

pub fn is_audio_candidate(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Join a relative `path` onto `base`. Purely lexical: nothing is looked up
/// on disk and symlinks are left alone.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// List every file under `inputs`, inputs made absolute and sorted,
/// directories walked in file-name order. Inputs that do not exist are
/// skipped with a warning.
pub fn discover_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let cwd = std::env::current_dir()?;
    let mut sorted: Vec<PathBuf> = inputs.iter().map(|input| absolutize(input, &cwd)).collect();
    sorted.sort();

    let mut files = Vec::new();
    for input in sorted {
        debug!(path = %input.display(), "Searching");
        if input.is_file() {
            files.push(input);
        } else if input.is_dir() {
            for entry in WalkDir::new(&input).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            warn!("{} is not a valid path", input.display());
        }
    }
    Ok(files)
}

/// [`discover_inputs`] restricted to audio files.
pub fn discover_audio(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let files = discover_inputs(inputs)?;
    let (audio, skipped): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|path| is_audio_candidate(path));
    for path in &skipped {
        debug!(path = %path.display(), "Skipping non-audio file");
    }
    Ok(audio)
}
