//! Driving a build session over discovered files
//!
//! Resolved tracks are handed to a [`TrackSink`], which stands in for the
//! conversion stage (transcoding, texture compositing, packaging).

use crate::builder::{BuildError, BuildSession, SessionReport, Track};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Receives every resolved track, in resolution order.
pub trait TrackSink {
    fn accept(&mut self, track: Track) -> Result<(), BuildError>;
}

impl<F> TrackSink for F
where
    F: FnMut(Track) -> Result<(), BuildError>,
{
    fn accept(&mut self, track: Track) -> Result<(), BuildError> {
        self(track)
    }
}

/// Keeps every track it is given.
#[derive(Debug, Default)]
pub struct CollectingSink {
    tracks: Vec<Track>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

impl TrackSink for CollectingSink {
    fn accept(&mut self, track: Track) -> Result<(), BuildError> {
        self.tracks.push(track);
        Ok(())
    }
}

/// Result of a complete build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutcome {
    pub report: SessionReport,
    /// Files refused because no spec matched them
    pub skipped: Vec<PathBuf>,
}

/// Resolve `candidates` in order inside one session, feeding `sink`.
///
/// Files that no spec matches (under the `error` policy) are skipped with a
/// warning; any other failure stops the build. The session is closed in every
/// case, and a failure inside the loop is reported in preference to a failure
/// of the close checks.
pub fn build_tracks<I, P, S>(
    session: &mut BuildSession,
    candidates: I,
    sink: &mut S,
) -> Result<BuildOutcome, BuildError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
    S: TrackSink + ?Sized,
{
    let mut skipped = Vec::new();
    let ((), report) = session.run(|session| {
        for candidate in candidates {
            match session.resolve(candidate.as_ref()) {
                Ok(track) => sink.accept(track)?,
                Err(BuildError::NotFound(path)) => {
                    warn!("Could not find matching spec for {}. Skipping.", path.display());
                    skipped.push(path);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    })?;

    info!(
        tracks = report.slot_count(),
        skipped = skipped.len(),
        "Resolved all tracks"
    );
    Ok(BuildOutcome { report, skipped })
}
