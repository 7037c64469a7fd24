//! sc-core: shared types, IDs, errors, configuration, language codes and
//! the push-channel event bus.
//!
//! This crate is the foundational dependency for all other sc-* crates,
//! providing type-safe identifiers, a unified error type, the media-library
//! data model, the language code normalizer, application configuration and
//! a broadcast event bus for batch job progress.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod language;
pub mod media;
pub mod profile;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use language::normalize;
pub use media::*;
pub use profile::{ForcedSubtitlePreference, LanguageProfile, ProfileRegistry};
