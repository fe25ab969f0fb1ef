//! Spec resolution and track numbering
//!
//! - [`path_key`]: path decomposition and the spec matching predicate
//! - [`validate`]: conflict, duplicate and contiguity checks over a spec set
//! - [`numbering`]: next free track number
//! - [`session`]: the build session state machine

pub mod error;
pub mod numbering;
pub mod path_key;
pub mod session;
pub mod types;
pub mod validate;

pub use error::{BuildError, Result};
pub use numbering::NumberAllocator;
pub use path_key::{spec_matches_path, PathKey};
pub use session::{BuildSession, SessionGuard, SessionReport, SessionStatus, UnusedSpec};
pub use types::{
    BuilderOptions, ContiguityPolicy, Hue, PermissionLevel, Spec, Track, UnspecifiedFileHandling,
};
pub use validate::{missing_numbers, ConflictValidator, Gap, MissingNumbers};
