//! CLI argument parsing and command handling.

mod args;
mod import;
mod validators;

pub use args::{Cli, Command, ConfigAction, GlobalArgs, OutputArgs};
pub use import::{ImportSummary, Manifest, import_manifest};
