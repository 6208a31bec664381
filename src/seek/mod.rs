//! SEEK (System for Elephant Ear-pattern Knowledge) trait codes.
//!
//! A trait code records observable features of one elephant at one sighting:
//! gender, age class, tusks, ear tears and holes by position, and special
//! markings. Unknown slots are wildcards.

mod code;
mod score;

pub use code::{SLOT_NAMES, TraitCode};
pub use score::{SeekScorer, conflicts, seek_score};
