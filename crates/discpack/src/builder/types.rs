//! Core types for track building
//!
//! A [`Spec`] captures what the user wants done with one input file, a
//! [`Track`] is the resolved, immutable result handed to the conversion
//! pipeline, and [`BuilderOptions`] carries the session-wide defaults.

use super::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Permission levels
// ============================================================================

/// Usage permissions for a track and, by extension, the pack that contains it.
///
/// Ordered from least to most restrictive.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Public domain, CC0: use anywhere, no attribution required
    Unrestricted,
    /// CC-BY, CC-BY-SA, GPL: use anywhere, but credit the artist
    Attribution,
    /// CC-BY-NC and most royalty-free services: specific places, people or conditions
    Restricted,
    /// Most of a private music library: personal use only
    #[default]
    Personal,
}

impl PermissionLevel {
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::Unrestricted,
        PermissionLevel::Attribution,
        PermissionLevel::Restricted,
        PermissionLevel::Personal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Unrestricted => "unrestricted",
            PermissionLevel::Attribution => "attribution",
            PermissionLevel::Restricted => "restricted",
            PermissionLevel::Personal => "personal",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PermissionLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| {
                BuildError::InvalidValue(format!(
                    "'{}' is not a license level (expected one of: unrestricted, attribution, restricted, personal)",
                    s
                ))
            })
    }
}

// ============================================================================
// Record texture hue
// ============================================================================

/// Record texture selection.
///
/// - `Template(false)`: the regular black record
/// - `Template(true)`: colored vinyl with a random hue
/// - `Shift(deg)`: colored vinyl shifted by `deg` degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Hue {
    Template(bool),
    Shift(f64),
}

impl Default for Hue {
    fn default() -> Self {
        Hue::Template(true)
    }
}

impl fmt::Display for Hue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hue::Template(true) => write!(f, "random"),
            Hue::Template(false) => write!(f, "none"),
            Hue::Shift(degrees) => write!(f, "{}°", degrees),
        }
    }
}

impl FromStr for Hue {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "random" => Ok(Hue::Template(true)),
            "false" | "no" | "none" => Ok(Hue::Template(false)),
            other => other
                .parse::<f64>()
                .ok()
                .filter(|degrees| degrees.is_finite())
                .map(Hue::Shift)
                .ok_or_else(|| BuildError::InvalidValue(format!("'{}' is not a valid hue", s))),
        }
    }
}

// ============================================================================
// Handling policies
// ============================================================================

/// What to do with a file that no spec matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnspecifiedFileHandling {
    /// Build the track from session defaults, quietly
    #[default]
    UseDefaults,
    /// Build the track from session defaults, but warn
    #[serde(alias = "warning")]
    Warn,
    /// Refuse the file
    Error,
}

impl UnspecifiedFileHandling {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnspecifiedFileHandling::UseDefaults => "use-defaults",
            UnspecifiedFileHandling::Warn => "warn",
            UnspecifiedFileHandling::Error => "error",
        }
    }
}

impl FromStr for UnspecifiedFileHandling {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "use-defaults" | "use_defaults" | "defaults" => Ok(UnspecifiedFileHandling::UseDefaults),
            "warn" | "warning" => Ok(UnspecifiedFileHandling::Warn),
            "error" => Ok(UnspecifiedFileHandling::Error),
            _ => Err(BuildError::InvalidValue(format!(
                "Unspecified file handling method '{}' is invalid (expected use-defaults, warn or error)",
                s
            ))),
        }
    }
}

/// How to react to gaps in the assigned track numbers when a session closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContiguityPolicy {
    Ignore,
    #[serde(alias = "warning")]
    Warn,
    #[default]
    Error,
}

impl ContiguityPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContiguityPolicy::Ignore => "ignore",
            ContiguityPolicy::Warn => "warn",
            ContiguityPolicy::Error => "error",
        }
    }
}

impl FromStr for ContiguityPolicy {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(ContiguityPolicy::Ignore),
            "warn" | "warning" => Ok(ContiguityPolicy::Warn),
            "error" => Ok(ContiguityPolicy::Error),
            _ => Err(BuildError::InvalidValue(format!(
                "The method for enforcing track number contiguousness '{}' is invalid (expected ignore, warn or error)",
                s
            ))),
        }
    }
}

// ============================================================================
// Spec
// ============================================================================

fn default_distinct() -> bool {
    true
}

/// The user's intent for handling one input file.
///
/// Every optional field falls back to the session's [`BuilderOptions`] when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    /// Tail of the input path this spec claims (see [`crate::builder::PathKey`])
    pub path_spec: PathBuf,
    /// Whether the spec may claim at most one file. Only `true` is supported.
    #[serde(default = "default_distinct")]
    pub distinct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<PermissionLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Display name for the track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Explicit track number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<Hue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_album_art: Option<bool>,
}

impl Spec {
    pub fn new(path_spec: impl Into<PathBuf>) -> Self {
        Self {
            path_spec: path_spec.into(),
            distinct: true,
            license: None,
            required: None,
            description: None,
            num: None,
            hue: None,
            use_album_art: None,
        }
    }

    pub fn with_num(mut self, num: u32) -> Self {
        self.num = Some(num);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_license(mut self, license: PermissionLevel) -> Self {
        self.license = Some(license);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hue(mut self, hue: Hue) -> Self {
        self.hue = Some(hue);
        self
    }

    pub fn with_album_art(mut self, use_album_art: bool) -> Self {
        self.use_album_art = Some(use_album_art);
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Whether this spec must be consumed by the time a session closes.
    pub fn is_required(&self, options: &BuilderOptions) -> bool {
        self.required.unwrap_or(options.required)
    }
}

// ============================================================================
// Track
// ============================================================================

/// A resolved track, ready for conversion into a record.
///
/// Tracks are created once per resolved file and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    number: u32,
    path: PathBuf,
    hue: Hue,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    use_album_art: bool,
    license: PermissionLevel,
}

impl Track {
    /// Build a track, letting the spec's overrides win over the session defaults.
    pub(crate) fn from_spec(
        number: u32,
        path: &Path,
        spec: Option<&Spec>,
        options: &BuilderOptions,
    ) -> Self {
        Self {
            number,
            path: path.to_path_buf(),
            hue: spec.and_then(|s| s.hue).unwrap_or(options.hue),
            description: spec.and_then(|s| s.description.clone()),
            use_album_art: spec
                .and_then(|s| s.use_album_art)
                .unwrap_or(options.use_album_art),
            license: spec.and_then(|s| s.license).unwrap_or(options.license),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hue(&self) -> Hue {
        self.hue
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn use_album_art(&self) -> bool {
        self.use_album_art
    }

    pub fn license(&self) -> PermissionLevel {
        self.license
    }

    /// Display name: the description if set, else the file stem.
    pub fn display_name(&self) -> String {
        match &self.description {
            Some(description) => description.clone(),
            None => self
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| self.path.display().to_string()),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "'{}'", description),
            None => write!(f, "'{}'", self.path.display()),
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Session-wide defaults and handling policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Whether specs without an explicit `required` must be matched
    pub required: bool,
    pub hue: Hue,
    pub use_album_art: bool,
    pub license: PermissionLevel,
    pub unspecified_file_handling: UnspecifiedFileHandling,
    pub enforce_contiguous_track_numbers: ContiguityPolicy,
    /// Also reject specs that only *might* overlap
    pub strict_file_checking: bool,
    /// Lowest track number handed out automatically
    pub start_at: u32,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            required: true,
            hue: Hue::default(),
            use_album_art: true,
            license: PermissionLevel::Personal,
            unspecified_file_handling: UnspecifiedFileHandling::UseDefaults,
            enforce_contiguous_track_numbers: ContiguityPolicy::Error,
            strict_file_checking: false,
            start_at: 1,
        }
    }
}

impl BuilderOptions {
    pub fn validate(&self) -> Result<()> {
        if self.start_at < 1 {
            return Err(BuildError::InvalidValue(format!(
                "{} is not a valid starting track number",
                self.start_at
            )));
        }
        if let Hue::Shift(degrees) = self.hue {
            if !degrees.is_finite() {
                return Err(BuildError::InvalidValue(format!(
                    "{} is not a valid default hue",
                    degrees
                )));
            }
        }
        Ok(())
    }
}
