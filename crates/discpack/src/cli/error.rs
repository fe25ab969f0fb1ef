//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use discpack::builder::BuildError;
use discpack::DiscpackError;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// A spec file or config file that could not be read
    pub fn unreadable(path: &Path, err: &DiscpackError) -> Self {
        let base = Self::new(err.to_string())
            .with_context(format!("While reading {}", path.display()));
        match err {
            DiscpackError::UnsupportedFormat(_) => base.with_suggestion(
                "TRY: Rename the file with a .toml, .json, .csv or .tsv extension",
            ),
            DiscpackError::Entry { index, .. } => base.with_suggestions([
                format!("TRY: Fix entry {} in the file", index),
                "TRY: Booleans accept true/false, yes/no, y/n or 1/0".to_string(),
            ]),
            DiscpackError::Config(_) => base.with_suggestion(
                "TRY: Compare your file against the output of: discpack config",
            ),
            _ => base,
        }
    }

    /// A spec set or session that failed its checks
    pub fn build_failed(err: &BuildError) -> Self {
        let base = Self::new(err.to_string());
        match err {
            BuildError::Conflict(_) => base
                .with_context("Some specs could claim the same files or track numbers")
                .with_suggestions([
                    "TRY: Make the conflicting specs more specific by adding parent folders",
                    "TRY: Give every explicit track number to exactly one spec",
                ]),
            BuildError::Contiguity(_) => base
                .with_context("The pack would have gaps in its record numbers")
                .with_suggestions([
                    "TRY: Add specs or files for the missing numbers",
                    "TRY: Add specs without a track number to fill the gaps",
                    "TRY: Allow gaps left by unmatched specs with: discpack plan -g",
                ]),
            BuildError::RequiredUnused(_) => base
                .with_context("Some specs did not match any input file")
                .with_suggestions([
                    "TRY: Check the spelling of the listed specs against your files",
                    "TRY: Ignore unmatched specs with: discpack plan -m",
                ]),
            BuildError::AlreadyUsed { .. } => base
                .with_context("A spec can only claim one file")
                .with_suggestion("TRY: Add a parent folder to the spec to tell the files apart"),
            BuildError::NotFound(_) => base
                .with_suggestion("TRY: Add a spec for the file or use: discpack plan -u use-defaults"),
            BuildError::InvalidValue(_) => base
                .with_suggestion("TRY: Track numbers must be positive integers"),
            BuildError::Usage(_) | BuildError::Unsupported(_) | BuildError::SessionChecks(_) => {
                base
            }
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print an error as a JSON object on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": {
                "message": helpful.message,
                "context": helpful.context,
                "suggestions": helpful.suggestions,
            }
        }),
        None => serde_json::json!({
            "error": {
                "message": format!("{:#}", err),
                "context": null,
                "suggestions": [],
            }
        }),
    };
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("{:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_display_lists_suggestions() {
        let err = HelpfulError::file_not_found(&PathBuf::from("/nope/specs.toml"));
        let display = err.to_string();
        assert!(display.starts_with("ERROR: File not found"));
        assert!(display.contains("CONTEXT:"));
        assert!(display.contains("TRY:"));
    }

    #[test]
    fn test_build_failures_suggest_cli_flags() {
        let err = HelpfulError::build_failed(&BuildError::Contiguity("gap".into()));
        assert!(err.suggestions.iter().any(|s| s.contains("-g")));

        let err = HelpfulError::build_failed(&BuildError::RequiredUnused("x".into()));
        assert!(err.suggestions.iter().any(|s| s.contains("-m")));
    }
}
