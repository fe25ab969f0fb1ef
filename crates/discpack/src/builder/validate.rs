//! Spec set validation
//!
//! Independent checks, each reporting every finding at once:
//! - field values: positive track numbers and finite hue shifts
//! - track numbers: unique (unset numbers are wildcards)
//! - path specs: no spec may claim everything another spec claims
//! - contiguity (on request): gaps below the highest number must be fillable
//!   by wildcard specs

use super::error::{BuildError, Result};
use super::path_key::PathKey;
use super::types::{BuilderOptions, Hue, Spec};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};
use std::path::Path;

/// Track numbers absent between the floor and the highest number in use.
///
/// Kept as inclusive runs: one spec numbered in the millions costs a single
/// run, not millions of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MissingNumbers {
    runs: Vec<(u32, u32)>,
}

impl MissingNumbers {
    /// Every integer in `[start_at, max(numbers))` absent from `numbers`.
    ///
    /// An empty set has no range and therefore nothing missing.
    pub fn between(start_at: u32, numbers: &BTreeSet<u32>) -> Self {
        let mut runs = Vec::new();
        let mut next = start_at;
        for &number in numbers.range(start_at..) {
            if number > next {
                runs.push((next, number - 1));
            }
            next = number.saturating_add(1);
        }
        Self { runs }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// How many numbers are missing.
    pub fn count(&self) -> u64 {
        self.runs
            .iter()
            .map(|&(first, last)| u64::from(last - first) + 1)
            .sum()
    }

    /// Inclusive `(first, last)` runs, ascending.
    pub fn runs(&self) -> &[(u32, u32)] {
        &self.runs
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.runs.iter().flat_map(|&(first, last)| first..=last)
    }
}

impl PartialEq<Vec<u32>> for MissingNumbers {
    fn eq(&self, other: &Vec<u32>) -> bool {
        self.iter().eq(other.iter().copied())
    }
}

/// Renders as `(5, 6)`; runs longer than two collapse to `(5-9)`.
impl Display for MissingNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, &(first, last)) in self.runs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match last - first {
                0 => write!(f, "{first}")?,
                1 => write!(f, "{first}, {last}")?,
                _ => write!(f, "{first}-{last}")?,
            }
        }
        write!(f, ")")
    }
}

/// Every integer in `[start_at, max(numbers))` absent from `numbers`.
pub fn missing_numbers(start_at: u32, numbers: &BTreeSet<u32>) -> MissingNumbers {
    MissingNumbers::between(start_at, numbers)
}

/// Track numbers that are missing between the floor and the highest number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub missing: MissingNumbers,
    /// Specs without an explicit number that could still fill the gap
    pub wildcards: usize,
}

impl Gap {
    pub fn is_fillable(&self) -> bool {
        self.missing.count() <= self.wildcards as u64
    }

    pub fn message(&self) -> String {
        let wildcard_line = match self.wildcards {
            0 => String::new(),
            1 => "\nwhereas only 1 track was provided with an unspecified track number".to_string(),
            n => format!("\nwhereas only {n} tracks were provided with unspecified track numbers"),
        };
        format!(
            "There are more missing track numbers than tracks that can fill those track numbers.\
             \nNo tracks are assigned the numbers {}{}.",
            self.missing, wildcard_line
        )
    }
}

/// Checks a spec set for internal consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictValidator {
    start_at: u32,
    strict: bool,
}

impl ConflictValidator {
    pub fn new(start_at: u32, strict: bool) -> Self {
        Self { start_at, strict }
    }

    pub fn from_options(options: &BuilderOptions) -> Self {
        Self::new(options.start_at, options.strict_file_checking)
    }

    /// Validate a full spec set.
    ///
    /// Invalid values are reported before unsupported features, which are
    /// reported before conflicts; contiguity is only checked on request.
    pub fn validate(&self, specs: &[Spec], check_contiguous: bool) -> Result<()> {
        let nums: Vec<Option<u32>> = specs.iter().map(|spec| spec.num).collect();
        self.check_number_values(&nums)?;
        check_hue_values(specs)?;

        if specs.iter().any(|spec| !spec.distinct) {
            return Err(BuildError::Unsupported(
                "Multitrack specs are not currently supported".to_string(),
            ));
        }

        let mut sections = Vec::new();
        if let Some(section) = duplicate_numbers_section(&nums) {
            sections.push(section);
        }
        let paths: Vec<&Path> = specs.iter().map(|spec| spec.path_spec.as_path()).collect();
        if let Some(section) = self.path_conflicts_section(&paths) {
            sections.push(section);
        }
        if !sections.is_empty() {
            return Err(BuildError::Conflict(sections.join("\n")));
        }

        if check_contiguous {
            self.check_planned_contiguity(&nums)?;
        }
        Ok(())
    }

    /// Validate track numbers alone (`None` is a wildcard).
    pub fn check_numbers(&self, nums: &[Option<u32>], check_contiguous: bool) -> Result<()> {
        self.check_number_values(nums)?;
        if let Some(section) = duplicate_numbers_section(nums) {
            return Err(BuildError::Conflict(section));
        }
        if check_contiguous {
            self.check_planned_contiguity(nums)?;
        }
        Ok(())
    }

    /// Validate path specs alone.
    pub fn check_paths(&self, paths: &[&Path]) -> Result<()> {
        match self.path_conflicts_section(paths) {
            Some(section) => Err(BuildError::Conflict(section)),
            None => Ok(()),
        }
    }

    /// Return the gap when more numbers are missing than wildcards can fill.
    pub fn check_contiguity(&self, numbers: &BTreeSet<u32>, wildcards: usize) -> Option<Gap> {
        let gap = Gap {
            missing: MissingNumbers::between(self.start_at, numbers),
            wildcards,
        };
        if gap.is_fillable() {
            None
        } else {
            Some(gap)
        }
    }

    fn check_number_values(&self, nums: &[Option<u32>]) -> Result<()> {
        let invalid: BTreeSet<u32> = nums.iter().flatten().copied().filter(|n| *n < 1).collect();
        if invalid.is_empty() {
            return Ok(());
        }
        let report: String = invalid
            .iter()
            .map(|n| format!("\n - {n} is not a valid track number"))
            .collect();
        Err(BuildError::InvalidValue(format!(
            "The provided track numbers contain invalid values:{report}"
        )))
    }

    fn check_planned_contiguity(&self, nums: &[Option<u32>]) -> Result<()> {
        let explicit: BTreeSet<u32> = nums.iter().flatten().copied().collect();
        let wildcards = nums.iter().filter(|n| n.is_none()).count();
        match self.check_contiguity(&explicit, wildcards) {
            Some(gap) => Err(BuildError::Contiguity(gap.message())),
            None => Ok(()),
        }
    }

    fn path_conflicts_section(&self, paths: &[&Path]) -> Option<String> {
        let mut counts: BTreeMap<PathKey, usize> = BTreeMap::new();
        for path in paths {
            *counts.entry(PathKey::new(path)).or_insert(0) += 1;
        }

        let mut report = dupes_report(counts.iter().map(|(key, count)| (format!("'{key}'"), *count)));

        let keys: Vec<&PathKey> = counts.keys().collect();
        for spec in &keys {
            for reference in &keys {
                if spec == reference {
                    continue;
                }
                if reference.matches(spec) {
                    report.push_str(&format!(
                        "\n - Files matching '{spec}' would also match any files matching '{reference}'"
                    ));
                } else if self.strict
                    && !spec.has_extension()
                    && reference.without_extension().matches(spec)
                {
                    report.push_str(&format!(
                        "\n - Files matching '{spec}' may also match files matching '{reference}'"
                    ));
                }
            }
        }

        if report.is_empty() {
            None
        } else {
            Some(format!(
                "The provided file specifications contain the following conflicts:{report}"
            ))
        }
    }
}

fn duplicate_numbers_section(nums: &[Option<u32>]) -> Option<String> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for num in nums.iter().flatten() {
        *counts.entry(*num).or_insert(0) += 1;
    }
    let report = dupes_report(counts.into_iter());
    if report.is_empty() {
        None
    } else {
        Some(format!("The provided track numbers contain duplicates:{report}"))
    }
}

fn check_hue_values(specs: &[Spec]) -> Result<()> {
    let report: String = specs
        .iter()
        .filter_map(|spec| match spec.hue {
            Some(Hue::Shift(degrees)) if !degrees.is_finite() => Some(format!(
                "\n - '{}' has hue {}",
                spec.path_spec.display(),
                degrees
            )),
            _ => None,
        })
        .collect();
    if report.is_empty() {
        Ok(())
    } else {
        Err(BuildError::InvalidValue(format!(
            "The provided hue shifts contain invalid values:{report}"
        )))
    }
}

fn dupes_report<T: Display>(counts: impl Iterator<Item = (T, usize)>) -> String {
    counts
        .filter(|(_, count)| *count > 1)
        .map(|(value, count)| format!("\n - {value} is included {count} times"))
        .collect()
}
