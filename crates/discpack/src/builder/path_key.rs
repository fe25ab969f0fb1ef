//! Path decomposition and spec matching.
//!
//! Specs are not globs. A spec matches a file when its path segments form the
//! tail of the file's path and the extensions agree (an extensionless spec
//! accepts any extension).
//!
//! Matching is lexical. `..` is folded against earlier segments but nothing
//! touches the filesystem, so a relative candidate only carries the folders
//! it was given; input discovery makes candidates absolute first.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A path broken into its lower-cased extension and its segments, leaf first.
///
/// `Music/Album/01 Song.MP3` becomes `(".mp3", ["01 Song", "Album", "Music"])`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey {
    extension: String,
    parts: Vec<String>,
}

impl PathKey {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let extension = match (path.file_name(), path.extension()) {
            (Some(_), Some(ext)) => format!(".{}", ext.to_string_lossy().to_lowercase()),
            _ => String::new(),
        };

        let mut parts: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.last().map_or(true, |last| last == "..") {
                        parts.push("..".to_string());
                    } else {
                        parts.pop();
                    }
                }
                Component::RootDir => parts.push(std::path::MAIN_SEPARATOR.to_string()),
                Component::Prefix(prefix) => {
                    parts.push(prefix.as_os_str().to_string_lossy().to_string())
                }
                Component::Normal(segment) => parts.push(segment.to_string_lossy().to_string()),
            }
        }

        if !extension.is_empty() {
            if let (Some(last), Some(stem)) = (parts.last_mut(), path.file_stem()) {
                *last = stem.to_string_lossy().to_string();
            }
        }

        parts.reverse();
        Self { extension, parts }
    }

    /// The lower-cased extension with its leading dot, or `""`.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Path segments without the extension, leaf first.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn has_extension(&self) -> bool {
        !self.extension.is_empty()
    }

    /// The same key with the extension dropped.
    pub fn without_extension(&self) -> Self {
        Self {
            extension: String::new(),
            parts: self.parts.clone(),
        }
    }

    /// Whether a spec with this key claims `candidate`.
    ///
    /// Not symmetric: `self` is the spec, `candidate` the file.
    pub fn matches(&self, candidate: &PathKey) -> bool {
        if !candidate.parts.starts_with(&self.parts) {
            return false;
        }
        self.extension.is_empty() || self.extension == candidate.extension
    }

    /// Reassemble a displayable path.
    pub fn to_path_buf(&self) -> PathBuf {
        let mut path: PathBuf = self.parts.iter().rev().collect();
        if self.has_extension() {
            let mut name = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_default();
            name.push(&self.extension);
            path.set_file_name(name);
        }
        path
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_buf().display())
    }
}

/// Determine if a spec path matches a provided file path.
pub fn spec_matches_path(path_spec: impl AsRef<Path>, file_path: impl AsRef<Path>) -> bool {
    PathKey::new(path_spec).matches(&PathKey::new(file_path))
}
