//! Registry files for a resolved set of tracks
//!
//! Everything the game needs to know about the records besides the audio and
//! textures themselves: the sound registry, one item model per record, the
//! language file, the pack metadata with its usage summary, and the manifest
//! the mod reads to learn how many discs exist.

use crate::builder::{PermissionLevel, Track};
use crate::error::{DiscpackError, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Resource namespace used by the mod.
pub const NAMESPACE: &str = "foxnap";

/// Above this many discs the manifest carries an explicit `max_discs`.
pub const DEFAULT_MAX_DISCS: u32 = 64;

pub const DEFAULT_TITLE: &str = "Custom FoxNap Records";

const PACK_FORMAT: u32 = 10;
const TITLE_COLOR: &str = "gold";

fn record_id(number: u32) -> String {
    format!("track_{}", number)
}

/// `sounds.json` contents.
pub fn sound_registry(tracks: &[Track]) -> BTreeMap<String, Value> {
    tracks
        .iter()
        .map(|track| {
            let id = record_id(track.number());
            let entry = json!({
                "category": "record",
                "replace": true,
                "sounds": [format!("{}:{}", NAMESPACE, id)],
            });
            (id, entry)
        })
        .collect()
}

/// Item model for one record.
pub fn item_model(number: u32) -> Value {
    json!({
        "parent": "minecraft:item/generated",
        "textures": {"layer0": format!("{}:item/{}", NAMESPACE, record_id(number))},
    })
}

/// `en_us.json` contents.
pub fn lang_file(tracks: &[Track]) -> BTreeMap<String, String> {
    let mut lang = BTreeMap::new();
    for track in tracks {
        let key = format!("item.{}.{}", NAMESPACE, record_id(track.number()));
        lang.insert(format!("{}.desc", key), track.display_name());
        lang.insert(key, "Music Disc".to_string());
    }
    lang
}

// ============================================================================
// Pack permission
// ============================================================================

/// The usage level stamped on the pack as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackPermission {
    pub level: PermissionLevel,
    /// Lowered to personal use for lack of a license file
    pub downgraded: bool,
}

impl PackPermission {
    pub fn summary(&self) -> &'static str {
        match self.level {
            PermissionLevel::Personal => "For personal use only",
            PermissionLevel::Restricted => "For limited public use. See pack for details.",
            PermissionLevel::Attribution => "For public use. See pack for terms and attribution.",
            PermissionLevel::Unrestricted => "For public use. Licensed under CC0.",
        }
    }

    pub fn color(&self) -> &'static str {
        match self.level {
            PermissionLevel::Personal => "red",
            PermissionLevel::Restricted => "dark_purple",
            PermissionLevel::Attribution => "aqua",
            PermissionLevel::Unrestricted => "green",
        }
    }
}

fn compliance(level: PermissionLevel) -> &'static str {
    match level {
        PermissionLevel::Unrestricted => "is unrestricted",
        PermissionLevel::Attribution => "requires an attribution license",
        PermissionLevel::Restricted => "requires a restricted license",
        PermissionLevel::Personal => "is for personal use only",
    }
}

/// Decide the pack's usage level.
///
/// Without a `requested` level the pack takes the most restrictive track
/// level. A `requested` level must be at least as restrictive as every track.
/// Attribution and restricted levels need a license file shipped with the
/// pack: an explicit request without one fails, a derived level is lowered to
/// personal use with a warning.
pub fn pack_permission(
    tracks: &[Track],
    requested: Option<PermissionLevel>,
    has_license_file: bool,
) -> Result<PackPermission> {
    let mut level = requested.unwrap_or(PermissionLevel::Unrestricted);
    let mut report = String::new();
    for track in tracks {
        if track.license() <= level {
            continue;
        }
        match requested {
            None => level = track.license(),
            Some(_) => {
                report.push_str(&format!("\n - {} {}", track, compliance(track.license())));
            }
        }
    }

    if !report.is_empty() {
        return Err(DiscpackError::Permission(format!(
            "The selected license level ({}) is too permissive for the following tracks:{}",
            level, report
        )));
    }

    let mut downgraded = false;
    if !has_license_file
        && matches!(
            level,
            PermissionLevel::Attribution | PermissionLevel::Restricted
        )
    {
        let message = format!(
            "Cannot use {} due to lack of a license file.\
             \nEither provide a license file or select a different license.",
            level
        );
        if requested.is_some() {
            return Err(DiscpackError::Permission(message));
        }
        warn!("{}", message);
        level = PermissionLevel::Personal;
        downgraded = true;
    }

    info!(level = %level, "Setting license level");
    Ok(PackPermission { level, downgraded })
}

/// `pack.mcmeta` contents.
pub fn pack_mcmeta(title: &str, permission: &PackPermission) -> Value {
    json!({
        "pack": {
            "pack_format": PACK_FORMAT,
            "description": [
                {"text": title, "color": TITLE_COLOR},
                {"text": format!("\n{}", permission.summary()), "color": permission.color()},
            ],
        }
    })
}

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestTrack {
    pub number: u32,
    pub name: String,
    pub source: PathBuf,
}

/// Mod-side configuration describing the generated discs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackManifest {
    /// Highest track number in the pack
    pub n_discs: u32,
    /// Present only past the default disc limit, which can upset multiplayer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discs: Option<u32>,
    pub tracks: Vec<ManifestTrack>,
}

impl PackManifest {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let n_discs = tracks.iter().map(Track::number).max().unwrap_or(0);
        let mut entries: Vec<ManifestTrack> = tracks
            .iter()
            .map(|track| ManifestTrack {
                number: track.number(),
                name: track.display_name(),
                source: track.path().to_path_buf(),
            })
            .collect();
        entries.sort_by_key(|entry| entry.number);

        Self {
            n_discs,
            max_discs: (n_discs > DEFAULT_MAX_DISCS).then_some(n_discs),
            tracks: entries,
        }
    }
}

// ============================================================================
// Writing
// ============================================================================

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Write every registry file for `tracks` under `dir`, returning the paths written.
pub fn write_registry(
    dir: &Path,
    tracks: &[Track],
    permission: &PackPermission,
) -> Result<Vec<PathBuf>> {
    let assets = dir.join("assets").join(NAMESPACE);
    let mut written = Vec::new();

    let mcmeta = dir.join("pack.mcmeta");
    write_json(&mcmeta, &pack_mcmeta(DEFAULT_TITLE, permission))?;
    written.push(mcmeta);

    info!("Writing sound registry");
    let sounds = assets.join("sounds.json");
    write_json(&sounds, &sound_registry(tracks))?;
    written.push(sounds);

    info!("Writing record item models");
    for track in tracks {
        let model = assets
            .join("models")
            .join("item")
            .join(format!("{}.json", record_id(track.number())));
        write_json(&model, &item_model(track.number()))?;
        written.push(model);
    }

    info!("Writing language file");
    let lang = assets.join("lang").join("en_us.json");
    write_json(&lang, &lang_file(tracks))?;
    written.push(lang);

    let manifest_path = dir.join("manifest.yaml");
    let manifest = PackManifest::from_tracks(tracks);
    if manifest.max_discs.is_some() {
        warn!(
            n_discs = manifest.n_discs,
            "More than {} discs may cause issues during multiplayer", DEFAULT_MAX_DISCS
        );
    }
    fs::write(&manifest_path, serde_yaml::to_string(&manifest)?)?;
    written.push(manifest_path);

    Ok(written)
}
