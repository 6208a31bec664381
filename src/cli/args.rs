//! CLI argument definitions.

use super::validators::{parse_duration, parse_trait_code};
use crate::config::OutputFormat;
use crate::seek::TraitCode;
use crate::store::{PhotoId, SightingId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Elephant re-identification from field photos and SEEK trait codes.
#[derive(Debug, Parser)]
#[command(name = "tusker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every command.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Store snapshot file (overrides config).
    #[arg(long, global = true, env = "TUSKER_STORE")]
    pub store: Option<PathBuf>,

    /// Suppress progress output and informational logs.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Remove store locks older than this duration (e.g., 1h, 30m).
    #[arg(long, global = true, value_parser = parse_duration)]
    pub stale_lock_timeout: Option<Duration>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import individuals, sightings, photos and boxes from a JSON manifest.
    Import {
        /// Manifest file.
        manifest: PathBuf,
    },
    /// Run detectors over photos, then extract embeddings and associate.
    Detect {
        /// Photos to process (default: all).
        #[arg(long = "photo", value_name = "ID")]
        photos: Vec<PhotoId>,
        /// Re-run detectors that already ran.
        #[arg(long)]
        force: bool,
        /// Photos per inference batch.
        #[arg(short, long, env = "TUSKER_BATCH_SIZE")]
        batch_size: Option<usize>,
    },
    /// Extract embeddings for every stored detection.
    Extract {
        /// Replace existing embeddings.
        #[arg(long)]
        force: bool,
    },
    /// Link detections to ground-truth boxes.
    Associate {
        /// Photos to re-associate (default: all).
        #[arg(long = "photo", value_name = "ID")]
        photos: Vec<PhotoId>,
    },
    /// Score sightings against every identified individual.
    Score {
        /// Sightings to score (default: those without a cached result).
        #[arg(long = "sighting", value_name = "ID", conflicts_with = "all")]
        sightings: Vec<SightingId>,
        /// Recompute every sighting.
        #[arg(long)]
        all: bool,
    },
    /// Show the cached ranking for a sighting.
    Show {
        /// Sighting to show.
        sighting: SightingId,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rank identified individuals against a SEEK code.
    Search {
        /// Code in rendered (22-character) or compact (17-character) form.
        #[arg(value_parser = parse_trait_code)]
        code: TraitCode,
        /// Count only agreement and disagreement, ignoring wildcards.
        #[arg(long)]
        binary: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Table rendering options.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format (table, csv, json).
    #[arg(short, long, default_value_t, env = "TUSKER_FORMAT")]
    pub format: OutputFormat,

    /// Write to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}
