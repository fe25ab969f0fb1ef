//! Spec files
//!
//! Specs can be written as TOML tables, INI sections, JSON or CSV/TSV. Every
//! format is first read into loosely-typed entries, then each entry is
//! normalized into a [`Spec`]: keys are case-insensitive, accept several
//! separators and a few historical aliases, and null-like values count as
//! unset.

use crate::builder::{Hue, PermissionLevel, Spec};
use crate::error::{DiscpackError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported spec file layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Toml,
    Ini,
    Json,
    Csv,
    Tsv,
}

impl SpecFormat {
    /// Pick the format from the file extension. Extensionless and `.txt`
    /// files are read as INI.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Ok(SpecFormat::Toml),
            "" | "ini" | "cfg" | "conf" | "config" | "txt" => Ok(SpecFormat::Ini),
            "json" => Ok(SpecFormat::Json),
            "csv" => Ok(SpecFormat::Csv),
            "tsv" => Ok(SpecFormat::Tsv),
            other => Err(DiscpackError::UnsupportedFormat(format!(
                "'.{}' spec files are not supported (use .toml, .ini, .json, .csv or .tsv)",
                other
            ))),
        }
    }
}

/// A scalar read from a spec file before it is interpreted.
#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    fn is_null_like(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Int(n) => *n == -1,
            RawValue::Float(f) => f.is_nan() || *f == -1.0,
            RawValue::Text(s) => matches!(
                s.trim().to_ascii_uppercase().as_str(),
                "" | "NULL" | "NAN" | "NONE" | "-1"
            ),
            RawValue::Bool(_) => false,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            RawValue::Int(1) => Some(true),
            RawValue::Int(0) => Some(false),
            RawValue::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "T" | "TRUE" | "YES" | "Y" | "1" => Some(true),
                "F" | "FALSE" | "NO" | "N" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        let number = match self {
            RawValue::Int(n) => Some(*n as f64),
            RawValue::Float(f) => Some(*f),
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        };
        number.filter(|f| f.is_finite())
    }

    fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Int(n) => Some(n.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Null => None,
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Null => write!(f, "null"),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Int(n) => write!(f, "{}", n),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

type RawEntry = BTreeMap<String, RawValue>;

/// Read every spec in `path`.
pub fn read_specs(path: impl AsRef<Path>) -> Result<Vec<Spec>> {
    let path = path.as_ref();
    let format = SpecFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let specs = parse_specs(&content, format, path)?;
    debug!(path = %path.display(), count = specs.len(), "Read spec file");
    Ok(specs)
}

/// Parse spec file contents. `origin` is only used in error messages.
pub fn parse_specs(content: &str, format: SpecFormat, origin: &Path) -> Result<Vec<Spec>> {
    let entries = match format {
        SpecFormat::Toml => toml_entries(content, origin)?,
        SpecFormat::Ini => ini_entries(content, origin)?,
        SpecFormat::Json => json_entries(content, origin)?,
        SpecFormat::Csv => csv_entries(content, b',', origin)?,
        SpecFormat::Tsv => csv_entries(content, b'\t', origin)?,
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            convert_entry(entry).map_err(|message| DiscpackError::Entry {
                index: i + 1,
                path: origin.to_path_buf(),
                message,
            })
        })
        .collect()
}

// ============================================================================
// Format readers
// ============================================================================

fn toml_entries(content: &str, origin: &Path) -> Result<Vec<RawEntry>> {
    let table: toml::Table = content
        .parse()
        .map_err(|err: toml::de::Error| DiscpackError::parse(origin, err.message()))?;

    let mut entries = Vec::new();
    for (key, value) in table {
        match value {
            toml::Value::Table(fields) => {
                entries.push(toml_entry(fields, Some(&key), origin)?);
            }
            toml::Value::Array(items) if key == "specs" => {
                for item in items {
                    let toml::Value::Table(fields) = item else {
                        return Err(DiscpackError::parse(origin, "'specs' must only contain tables"));
                    };
                    entries.push(toml_entry(fields, None, origin)?);
                }
            }
            _ => {
                return Err(DiscpackError::parse(
                    origin,
                    format!("'{}' is not a spec table", key),
                ))
            }
        }
    }
    Ok(entries)
}

fn toml_entry(fields: toml::Table, header: Option<&str>, origin: &Path) -> Result<RawEntry> {
    let mut entry = RawEntry::new();
    for (key, value) in fields {
        let raw = match value {
            toml::Value::String(s) => RawValue::Text(s),
            toml::Value::Integer(n) => RawValue::Int(n),
            toml::Value::Float(f) => RawValue::Float(f),
            toml::Value::Boolean(b) => RawValue::Bool(b),
            other => {
                return Err(DiscpackError::parse(
                    origin,
                    format!("unsupported value for '{}': {}", key, other),
                ))
            }
        };
        entry.insert(key, raw);
    }
    if let Some(header) = header {
        entry.insert("header".to_string(), RawValue::Text(header.to_string()));
    }
    Ok(entry)
}

/// One entry per `[section]`; every value is kept as text.
fn ini_entries(content: &str, origin: &Path) -> Result<Vec<RawEntry>> {
    let ini = ini::Ini::load_from_str_noescape(content)
        .map_err(|err| DiscpackError::parse(origin, err))?;

    let mut entries = Vec::new();
    for (section, properties) in ini.iter() {
        let Some(header) = section else {
            if properties.iter().next().is_some() {
                return Err(DiscpackError::parse(
                    origin,
                    "every value must belong to a [path spec] section",
                ));
            }
            continue;
        };
        let mut entry: RawEntry = properties
            .iter()
            .map(|(key, value)| (key.to_string(), RawValue::Text(value.to_string())))
            .collect();
        entry.insert("header".to_string(), RawValue::Text(header.to_string()));
        entries.push(entry);
    }
    Ok(entries)
}

fn json_entries(content: &str, origin: &Path) -> Result<Vec<RawEntry>> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|err| DiscpackError::parse(origin, err))?;

    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| json_entry(item, None, origin))
            .collect(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| json_entry(item, Some(key), origin))
            .collect(),
        _ => Err(DiscpackError::parse(
            origin,
            "expected a list of specs or an object keyed by path spec",
        )),
    }
}

fn json_entry(value: serde_json::Value, header: Option<String>, origin: &Path) -> Result<RawEntry> {
    let serde_json::Value::Object(fields) = value else {
        return Err(DiscpackError::parse(origin, "every spec must be an object"));
    };
    let mut entry = RawEntry::new();
    for (key, value) in fields {
        let raw = match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Bool(b) => RawValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Int(i),
                None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => RawValue::Text(s),
            other => {
                return Err(DiscpackError::parse(
                    origin,
                    format!("unsupported value for '{}': {}", key, other),
                ))
            }
        };
        entry.insert(key, raw);
    }
    if let Some(header) = header {
        entry.insert("header".to_string(), RawValue::Text(header));
    }
    Ok(entry)
}

fn csv_entries(content: &str, delimiter: u8, origin: &Path) -> Result<Vec<RawEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| DiscpackError::parse(origin, err))?
        .clone();

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| DiscpackError::parse(origin, err))?;
        let entry: RawEntry = headers
            .iter()
            .zip(record.iter())
            .map(|(key, cell)| (key.to_string(), RawValue::Text(cell.to_string())))
            .collect();
        entries.push(entry);
    }
    Ok(entries)
}

// ============================================================================
// Entry normalization
// ============================================================================

struct Fields(RawEntry);

impl Fields {
    fn new(entry: RawEntry) -> Self {
        Self(
            entry
                .into_iter()
                .filter(|(_, value)| !value.is_null_like())
                .map(|(key, value)| (key.trim().to_lowercase(), value))
                .collect(),
        )
    }

    /// First value found under the field name or any alias, trying each with
    /// `_`, `-`, ` ` or no separator.
    fn get(&self, field: &str, aliases: &[&str]) -> Option<&RawValue> {
        std::iter::once(&field)
            .chain(aliases.iter())
            .flat_map(|name| {
                [
                    name.to_string(),
                    name.replace('_', "-"),
                    name.replace('_', " "),
                    name.replace('_', ""),
                ]
            })
            .find_map(|key| self.0.get(&key))
    }
}

fn invalid(field: &str, value: &RawValue) -> String {
    format!("entry has invalid value for {}: '{}'", field, value)
}

fn bool_field(fields: &Fields, field: &str, aliases: &[&str]) -> std::result::Result<Option<bool>, String> {
    fields
        .get(field, aliases)
        .map(|value| value.as_bool().ok_or_else(|| invalid(field, value)))
        .transpose()
}

fn convert_entry(entry: RawEntry) -> std::result::Result<Spec, String> {
    let fields = Fields::new(entry);

    let path_spec = fields
        .get("path_spec", &["file_spec", "filename", "header"])
        .and_then(RawValue::as_text)
        .ok_or_else(|| "entry does not specify a path spec".to_string())?;
    let mut spec = Spec::new(PathBuf::from(path_spec));

    if let Some(distinct) = bool_field(&fields, "distinct", &["unique", "is_distinct", "is_unique"])? {
        spec.distinct = distinct;
    }

    spec.license = fields
        .get("license", &["license_type", "permission", "usage", "usage_rights"])
        .map(|value| {
            value
                .as_text()
                .and_then(|text| text.parse::<PermissionLevel>().ok())
                .ok_or_else(|| invalid("license", value))
        })
        .transpose()?;

    spec.required = bool_field(&fields, "required", &["is_required"])?;

    spec.description = fields
        .get("description", &["title", "desc"])
        .and_then(RawValue::as_text);

    spec.num = fields
        .get("num", &["number", "track_number", "track", "track_no"])
        .map(|value| parse_track_number(value).ok_or_else(|| invalid("num", value)))
        .transpose()?;

    spec.hue = fields
        .get("hue", &["hue_shift", "use_colored_vinyl"])
        .map(|value| {
            value
                .as_bool()
                .map(Hue::Template)
                .or_else(|| value.as_f64().map(Hue::Shift))
                .ok_or_else(|| invalid("hue", value))
        })
        .transpose()?;

    spec.use_album_art = bool_field(&fields, "use_album_art", &["extract_album_art"])?;

    Ok(spec)
}

/// Non-negative integers only; zero passes through so registration can
/// report it alongside any other invalid numbers.
fn parse_track_number(value: &RawValue) -> Option<u32> {
    match value {
        RawValue::Int(n) => u32::try_from(*n).ok(),
        RawValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 => {
            Some(*f as u32)
        }
        RawValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}
