//! Build sessions
//!
//! A [`BuildSession`] owns the registered specs and the session defaults. Each
//! build runs between [`BuildSession::enter`] and [`BuildSession::exit`] (or
//! through [`BuildSession::open`] / [`BuildSession::run`], which guarantee the
//! exit checks run). Session-scoped state is rebuilt on every entry, so one
//! session object can drive any number of sequential builds.

use super::error::{BuildError, Result};
use super::numbering::NumberAllocator;
use super::path_key::PathKey;
use super::types::{BuilderOptions, ContiguityPolicy, Spec, Track, UnspecifiedFileHandling};
use super::validate::{missing_numbers, ConflictValidator, MissingNumbers};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SESSION_PROTOCOL: &str = "tracks can only be resolved inside an open session, \
     i.e. between enter() and exit(), or through open() / run()";

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Open,
    Closed,
}

/// A spec that was never matched during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedSpec {
    pub path_spec: PathBuf,
    pub required: bool,
}

/// What happened during one session, available after it closes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Track numbers in the order they were handed out
    pub assigned: Vec<u32>,
    pub unused: Vec<UnusedSpec>,
    /// Numbers between the floor and the highest assigned number that nobody got
    pub missing_numbers: MissingNumbers,
    /// Files that matched no spec and were built from defaults
    pub defaulted: Vec<PathBuf>,
    /// Non-fatal findings (also logged at warn level)
    pub warnings: Vec<String>,
}

impl SessionReport {
    pub fn slot_count(&self) -> usize {
        self.assigned.len()
    }

    pub fn highest_number(&self) -> Option<u32> {
        self.assigned.iter().copied().max()
    }

    pub fn unused_required(&self) -> impl Iterator<Item = &UnusedSpec> {
        self.unused.iter().filter(|spec| spec.required)
    }
}

#[derive(Debug)]
struct OpenState {
    /// Indices into the registered specs, in registration order
    unused: Vec<usize>,
    assigned: Vec<u32>,
    consumed: BTreeSet<u32>,
    defaulted: Vec<PathBuf>,
    warnings: Vec<String>,
}

#[derive(Debug)]
enum State {
    Idle,
    Open(OpenState),
    Closed,
}

/// Resolves candidate files into numbered tracks according to a spec set.
#[derive(Debug)]
pub struct BuildSession {
    specs: Vec<Spec>,
    keys: Vec<PathKey>,
    options: BuilderOptions,
    state: State,
    last_report: Option<SessionReport>,
}

impl BuildSession {
    /// Register `specs` under `options`.
    ///
    /// The spec set is validated immediately (contiguity excluded).
    pub fn new(specs: Vec<Spec>, options: BuilderOptions) -> Result<Self> {
        options.validate()?;
        ConflictValidator::from_options(&options).validate(&specs, false)?;
        let keys = specs.iter().map(|spec| PathKey::new(&spec.path_spec)).collect();
        Ok(Self {
            specs,
            keys,
            options,
            state: State::Idle,
            last_report: None,
        })
    }

    pub fn with_defaults(specs: Vec<Spec>) -> Result<Self> {
        Self::new(specs, BuilderOptions::default())
    }

    pub fn specs(&self) -> &[Spec] {
        &self.specs
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn status(&self) -> SessionStatus {
        match self.state {
            State::Idle => SessionStatus::Idle,
            State::Open(_) => SessionStatus::Open,
            State::Closed => SessionStatus::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Report of the most recently closed session.
    pub fn last_report(&self) -> Option<&SessionReport> {
        self.last_report.as_ref()
    }

    /// Register one more spec, re-validating the whole set.
    pub fn add_spec(&mut self, spec: Spec) -> Result<()> {
        if self.is_open() {
            return Err(BuildError::Usage(
                "specs cannot be added while a session is open".to_string(),
            ));
        }
        let mut candidate = self.specs.clone();
        candidate.push(spec);
        ConflictValidator::from_options(&self.options).validate(&candidate, false)?;

        if let Some(spec) = candidate.pop() {
            debug!(path_spec = %spec.path_spec.display(), "Registered spec");
            self.keys.push(PathKey::new(&spec.path_spec));
            self.specs.push(spec);
        }
        Ok(())
    }

    /// Replace the session defaults, re-validating the spec set under them.
    pub fn set_options(&mut self, options: BuilderOptions) -> Result<()> {
        if self.is_open() {
            return Err(BuildError::Usage(
                "options cannot be changed while a session is open".to_string(),
            ));
        }
        options.validate()?;
        ConflictValidator::from_options(&options).validate(&self.specs, false)?;
        self.options = options;
        Ok(())
    }

    /// Open a session.
    ///
    /// Re-validates the spec set including planned contiguity; on failure the
    /// session does not open. A planned gap fails here whatever the contiguity
    /// policy says, the policy only governs the checks in [`exit`](Self::exit).
    pub fn enter(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(BuildError::Usage("the session is already open".to_string()));
        }

        ConflictValidator::from_options(&self.options).validate(&self.specs, true)?;

        self.state = State::Open(OpenState {
            unused: (0..self.specs.len()).collect(),
            assigned: Vec::new(),
            consumed: BTreeSet::new(),
            defaulted: Vec::new(),
            warnings: Vec::new(),
        });
        debug!(specs = self.specs.len(), "Opened build session");
        Ok(())
    }

    /// Resolve one candidate file into a track.
    ///
    /// Unused specs are searched in registration order. A file matching only
    /// an already-used spec is an error; a file matching nothing is handled
    /// per [`UnspecifiedFileHandling`].
    pub fn resolve(&mut self, candidate: impl AsRef<Path>) -> Result<Track> {
        let candidate = candidate.as_ref();
        let Self {
            specs,
            keys,
            options,
            state,
            ..
        } = self;
        let State::Open(open) = state else {
            return Err(BuildError::Usage(SESSION_PROTOCOL.to_string()));
        };
        let key = PathKey::new(candidate);

        if let Some(position) = open.unused.iter().position(|&i| keys[i].matches(&key)) {
            let index = open.unused.remove(position);
            let spec = &specs[index];
            let number = match spec.num {
                Some(number) => number,
                None => next_number(specs, open, options.start_at),
            };
            open.record(number);
            debug!(
                number,
                path = %candidate.display(),
                path_spec = %spec.path_spec.display(),
                "Resolved track"
            );
            return Ok(Track::from_spec(number, candidate, Some(spec), options));
        }

        if let Some(spec) = specs
            .iter()
            .zip(keys.iter())
            .find_map(|(spec, spec_key)| spec_key.matches(&key).then_some(spec))
        {
            if !spec.distinct {
                return Err(BuildError::Unsupported(
                    "Multitrack specs are not currently supported".to_string(),
                ));
            }
            return Err(BuildError::AlreadyUsed {
                spec: spec.path_spec.clone(),
                candidate: candidate.to_path_buf(),
            });
        }

        match options.unspecified_file_handling {
            UnspecifiedFileHandling::UseDefaults => {
                debug!("Using default spec for '{}'", candidate.display());
            }
            UnspecifiedFileHandling::Warn => {
                let message = format!(
                    "Could not find matching spec for '{}'. Using default spec instead.",
                    candidate.display()
                );
                warn!("{}", message);
                open.warnings.push(message);
            }
            UnspecifiedFileHandling::Error => {
                return Err(BuildError::NotFound(candidate.to_path_buf()));
            }
        }

        let number = next_number(specs, open, options.start_at);
        open.record(number);
        open.defaulted.push(candidate.to_path_buf());
        debug!(number, path = %candidate.display(), "Resolved track from defaults");
        Ok(Track::from_spec(number, candidate, None, options))
    }

    /// Close the session and run the close-time checks.
    ///
    /// The session ends up closed whatever the outcome. The report is
    /// retained in [`BuildSession::last_report`] even when a check fails.
    pub fn exit(&mut self) -> Result<SessionReport> {
        let open = match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(open) => open,
            previous => {
                self.state = previous;
                return Err(BuildError::Usage(
                    "exit() requires an open session".to_string(),
                ));
            }
        };

        let mut failures = Vec::new();
        let mut report = SessionReport {
            assigned: open.assigned,
            unused: open
                .unused
                .iter()
                .map(|&i| UnusedSpec {
                    path_spec: self.specs[i].path_spec.clone(),
                    required: self.specs[i].is_required(&self.options),
                })
                .collect(),
            missing_numbers: missing_numbers(self.options.start_at, &open.consumed),
            defaulted: open.defaulted,
            warnings: open.warnings,
        };

        if !report.unused.is_empty() {
            let listing: String = report
                .unused
                .iter()
                .map(|spec| {
                    let tag = if spec.required { " (required)" } else { "" };
                    format!("\n- {}{}", spec.path_spec.display(), tag)
                })
                .collect();
            if report.unused_required().next().is_some() {
                failures.push(BuildError::RequiredUnused(format!(
                    "The following required specs could not be matched to any files:{listing}"
                )));
            } else {
                debug!("The following specs could not be matched to any files:{listing}");
            }
        }

        if !report.missing_numbers.is_empty() {
            let wildcards = open
                .unused
                .iter()
                .filter(|&&i| self.specs[i].num.is_none())
                .count();
            let validator = ConflictValidator::from_options(&self.options);
            match validator.check_contiguity(&open.consumed, wildcards) {
                None => debug!(
                    "Track numbers {} are unassigned but could still be filled",
                    report.missing_numbers
                ),
                Some(gap) => {
                    let message = format!(
                        "The following track numbers were never assigned: {}",
                        gap.missing
                    );
                    match self.options.enforce_contiguous_track_numbers {
                        ContiguityPolicy::Ignore => debug!("{}", message),
                        ContiguityPolicy::Warn => {
                            warn!("{}", message);
                            report.warnings.push(message);
                        }
                        ContiguityPolicy::Error => {
                            failures.push(BuildError::Contiguity(gap.message()));
                        }
                    }
                }
            }
        }

        debug!(tracks = report.slot_count(), "Closed build session");
        self.last_report = Some(report.clone());
        match failures.len() {
            0 => Ok(report),
            1 => Err(failures.remove(0)),
            _ => Err(BuildError::SessionChecks(failures)),
        }
    }

    /// Open a session whose close checks run when the guard is closed or dropped.
    pub fn open(&mut self) -> Result<SessionGuard<'_>> {
        self.enter()?;
        Ok(SessionGuard {
            session: self,
            closed: false,
        })
    }

    /// Run `body` inside a session.
    ///
    /// The session is always closed. An error from `body` wins over an error
    /// from the close checks, which is then only logged.
    pub fn run<T, F>(&mut self, body: F) -> Result<(T, SessionReport)>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.enter()?;
        let outcome = body(self);
        let closed = self.exit();
        match (outcome, closed) {
            (Ok(value), Ok(report)) => Ok((value, report)),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(error = %close_err, "Build session also failed its close checks");
                Err(err)
            }
        }
    }
}

impl OpenState {
    fn record(&mut self, number: u32) {
        self.assigned.push(number);
        self.consumed.insert(number);
    }
}

fn next_number(specs: &[Spec], open: &OpenState, start_at: u32) -> u32 {
    let reserved: BTreeSet<u32> = open.unused.iter().filter_map(|&i| specs[i].num).collect();
    NumberAllocator::new(start_at).next(&reserved, &open.consumed)
}

/// Scoped handle to an open session.
///
/// Dropping the guard closes the session; close failures are then logged.
/// Call [`SessionGuard::close`] to receive them instead.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    session: &'a mut BuildSession,
    closed: bool,
}

impl SessionGuard<'_> {
    pub fn resolve(&mut self, candidate: impl AsRef<Path>) -> Result<Track> {
        self.session.resolve(candidate)
    }

    pub fn close(mut self) -> Result<SessionReport> {
        self.closed = true;
        self.session.exit()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.session.exit() {
            warn!(error = %err, "Build session closed with errors");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::types::Hue;

    fn options(start_at: u32) -> BuilderOptions {
        BuilderOptions {
            start_at,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_outside_session_is_a_usage_error() {
        let mut session = BuildSession::with_defaults(vec![]).unwrap();
        let err = session.resolve("hello.mp3").unwrap_err();
        assert!(err.is_usage_error());
        assert!(err.to_string().contains("open session"));
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_exit_without_enter_is_a_usage_error() {
        let mut session = BuildSession::with_defaults(vec![]).unwrap();
        assert!(session.exit().unwrap_err().is_usage_error());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_lifecycle_states() {
        let mut session = BuildSession::with_defaults(vec![]).unwrap();
        session.enter().unwrap();
        assert_eq!(session.status(), SessionStatus::Open);
        assert!(session.enter().unwrap_err().is_usage_error());
        session.exit().unwrap();
        assert_eq!(session.status(), SessionStatus::Closed);
        session.enter().unwrap();
        assert_eq!(session.status(), SessionStatus::Open);
    }

    #[test]
    fn test_explicit_number_is_used_and_reserved() {
        let specs = vec![Spec::new("hello.mp3").with_num(4)];
        let mut session = BuildSession::new(specs, options(4)).unwrap();
        session.enter().unwrap();

        let first = session.resolve("Music/world.mp3").unwrap();
        assert_eq!(first.number(), 5);
        let second = session.resolve("Music/hello.mp3").unwrap();
        assert_eq!(second.number(), 4);

        let report = session.exit().unwrap();
        assert_eq!(report.assigned, vec![5, 4]);
        assert_eq!(report.defaulted, vec![PathBuf::from("Music/world.mp3")]);
    }

    #[test]
    fn test_spec_overrides_fall_back_to_defaults() {
        let mut opts = options(1);
        opts.hue = Hue::Shift(87.0);
        let specs = vec![Spec::new("hello.mp3").with_description("Hello")];
        let mut session = BuildSession::new(specs, opts).unwrap();
        session.enter().unwrap();
        let track = session.resolve("hello.mp3").unwrap();
        assert_eq!(track.hue(), Hue::Shift(87.0));
        assert_eq!(track.description(), Some("Hello"));
        session.exit().unwrap();
    }

    #[test]
    fn test_second_match_is_already_used() {
        let specs = vec![Spec::new("hello.mp3")];
        let mut session = BuildSession::with_defaults(specs).unwrap();
        session.enter().unwrap();
        session.resolve("a/hello.mp3").unwrap();
        let err = session.resolve("b/hello.mp3").unwrap_err();
        assert!(matches!(err, BuildError::AlreadyUsed { .. }));
        assert!(err.to_string().contains("already used"));
        session.exit().unwrap();
    }

    #[test]
    fn test_error_policy_rejects_unspecified_files() {
        let opts = BuilderOptions {
            unspecified_file_handling: UnspecifiedFileHandling::Error,
            ..Default::default()
        };
        let mut session = BuildSession::new(vec![], opts).unwrap();
        session.enter().unwrap();
        let err = session.resolve("stray.mp3").unwrap_err();
        assert_eq!(err, BuildError::NotFound(PathBuf::from("stray.mp3")));
        // the session stays usable
        assert!(session.is_open());
        session.exit().unwrap();
    }

    #[test]
    fn test_warn_policy_records_a_warning() {
        let opts = BuilderOptions {
            unspecified_file_handling: UnspecifiedFileHandling::Warn,
            ..Default::default()
        };
        let mut session = BuildSession::new(vec![], opts).unwrap();
        session.enter().unwrap();
        assert_eq!(session.resolve("stray.mp3").unwrap().number(), 1);
        let report = session.exit().unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("stray.mp3"));
    }

    #[test]
    fn test_required_unused_spec_fails_close() {
        let specs = vec![
            Spec::new("hello.mp3").with_num(1),
            Spec::new("world.mp3").with_required(false),
        ];
        let mut session = BuildSession::with_defaults(specs).unwrap();
        session.enter().unwrap();
        let err = session.exit().unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, BuildError::RequiredUnused(_)));
        assert!(message.contains("hello.mp3 (required)"));
        assert!(message.contains("world.mp3"));
        assert_eq!(session.status(), SessionStatus::Closed);

        let report = session.last_report().unwrap();
        assert_eq!(report.unused.len(), 2);
        assert_eq!(report.unused_required().count(), 1);
    }

    #[test]
    fn test_required_falls_back_to_session_default() {
        let opts = BuilderOptions {
            required: false,
            ..Default::default()
        };
        let mut session = BuildSession::new(vec![Spec::new("hello.mp3")], opts).unwrap();
        session.enter().unwrap();
        let report = session.exit().unwrap();
        assert_eq!(
            report.unused,
            vec![UnusedSpec {
                path_spec: PathBuf::from("hello.mp3"),
                required: false
            }]
        );
    }

    #[test]
    fn test_close_gap_from_unused_explicit_numbers() {
        let specs = vec![
            Spec::new("a.mp3").with_num(4),
            Spec::new("b.mp3").with_num(5).with_required(false),
            Spec::new("c.mp3").with_num(6).with_required(false),
            Spec::new("d.mp3").with_num(7),
        ];
        let mut session = BuildSession::new(specs, options(4)).unwrap();
        session.enter().unwrap();
        session.resolve("a.mp3").unwrap();
        session.resolve("d.mp3").unwrap();
        let err = session.exit().unwrap_err();
        assert!(matches!(err, BuildError::Contiguity(_)));
        assert!(err.to_string().contains("(5, 6)"));
    }

    #[test]
    fn test_close_gap_with_warn_policy_is_reported_not_raised() {
        let mut opts = options(4);
        opts.enforce_contiguous_track_numbers = ContiguityPolicy::Warn;
        let specs = vec![
            Spec::new("a.mp3").with_num(4),
            Spec::new("b.mp3").with_num(5).with_required(false),
            Spec::new("c.mp3").with_num(6),
        ];
        let mut session = BuildSession::new(specs, opts).unwrap();
        session.enter().unwrap();
        session.resolve("a.mp3").unwrap();
        session.resolve("c.mp3").unwrap();
        let report = session.exit().unwrap();
        assert_eq!(report.missing_numbers, vec![5]);
        assert!(report.warnings.iter().any(|w| w.contains("(5)")));
    }

    #[test]
    fn test_multiple_close_failures_are_aggregated() {
        let specs = vec![
            Spec::new("a.mp3").with_num(1),
            Spec::new("b.mp3").with_num(2),
            Spec::new("c.mp3").with_num(3),
        ];
        let mut session = BuildSession::with_defaults(specs).unwrap();
        session.enter().unwrap();
        session.resolve("c.mp3").unwrap();
        let err = session.exit().unwrap_err();
        let BuildError::SessionChecks(failures) = &err else {
            panic!("expected aggregated failures, got {err:?}");
        };
        assert_eq!(failures.len(), 2);
        assert!(err.is_close_failure());
    }

    #[test]
    fn test_enter_rejects_planned_gaps_under_every_policy() {
        for policy in [
            ContiguityPolicy::Error,
            ContiguityPolicy::Warn,
            ContiguityPolicy::Ignore,
        ] {
            let mut opts = options(1);
            opts.enforce_contiguous_track_numbers = policy;
            let specs = vec![Spec::new("a.mp3").with_num(3)];
            let mut session = BuildSession::new(specs, opts).unwrap();
            let err = session.enter().unwrap_err();
            assert!(matches!(err, BuildError::Contiguity(_)), "{policy:?}: {err:?}");
            assert!(err.to_string().contains("(1, 2)"));
            assert_eq!(session.status(), SessionStatus::Idle);
        }
    }

    #[test]
    fn test_close_gap_with_ignore_policy_is_silent() {
        let mut opts = options(1);
        opts.enforce_contiguous_track_numbers = ContiguityPolicy::Ignore;
        let specs = vec![
            Spec::new("a.mp3").with_num(1).with_required(false),
            Spec::new("b.mp3").with_num(2).with_required(false),
            Spec::new("c.mp3").with_num(3),
        ];
        let mut session = BuildSession::new(specs, opts).unwrap();
        session.enter().unwrap();
        session.resolve("c.mp3").unwrap();
        let report = session.exit().unwrap();
        assert_eq!(report.missing_numbers, vec![1, 2]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_add_spec_validates_and_is_refused_while_open() {
        let mut session = BuildSession::with_defaults(vec![Spec::new("hello.mp3")]).unwrap();
        assert!(matches!(
            session.add_spec(Spec::new("Music/hello.mp3")),
            Err(BuildError::Conflict(_))
        ));
        assert_eq!(session.specs().len(), 1);

        session.add_spec(Spec::new("world.mp3")).unwrap();
        assert_eq!(session.specs().len(), 2);

        session.enter().unwrap();
        assert!(session.add_spec(Spec::new("other.mp3")).unwrap_err().is_usage_error());
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let mut session = BuildSession::with_defaults(vec![]).unwrap();
        {
            let mut guard = session.open().unwrap();
            guard.resolve("a.mp3").unwrap();
        }
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(session.last_report().unwrap().assigned, vec![1]);
    }

    #[test]
    fn test_run_prefers_body_error_and_still_closes() {
        let mut session = BuildSession::with_defaults(vec![Spec::new("hello.mp3")]).unwrap();
        let err = session
            .run(|s| {
                s.resolve("x/hello.mp3")?;
                s.resolve("y/hello.mp3")
            })
            .unwrap_err();
        assert!(matches!(err, BuildError::AlreadyUsed { .. }));
        assert_eq!(session.status(), SessionStatus::Closed);
    }
}
