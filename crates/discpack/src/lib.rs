//! discpack: resolve a music collection into numbered record tracks
//!
//! Specs map audio file path patterns to track attributes. A
//! [`builder::BuildSession`] matches candidate files against them, hands out
//! track numbers and reports unused or missing entries when it closes.

pub mod builder;
pub mod config;
pub mod discover;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod spec_file;

pub use builder::{BuildError, BuildSession, BuilderOptions, Spec, Track};
pub use error::{DiscpackError, Result};
