//! Tusker - elephant re-identification from field photos and SEEK trait codes.
//!
//! This crate detects elephants and their ears in photos, links detections to
//! human-drawn boxes, embeds ear crops and ranks known individuals against
//! each sighting by combining trait-code and embedding similarity.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod inference;
pub mod jobs;
pub mod locking;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod seek;
pub mod store;

use clap::Parser;
use cli::{Cli, Command, GlobalArgs, OutputArgs};
use config::{Config, config_file_path, default_store_path, load_default_config, save_default_config};
use inference::{DetectorKind, EarExtractor, EmbeddingModel, OnnxDetector, OnnxEmbedder};
use jobs::{Job, Worker};
use locking::StoreLock;
use output::{Table, progress};
use pipeline::Pipeline;
use scoring::ScoreMode;
use seek::SeekScorer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use store::{MemoryStore, ScoreCache, SightingRepository, Store};
use tracing::{debug, error, info, warn};

pub use error::{Error, Result};

/// Main entry point for tusker CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet);

    // Install Ctrl+C handler to clean up lock files on interrupt
    if let Err(e) = ctrlc::set_handler(|| {
        locking::cleanup_all_locks();
        std::process::exit(130); // 128 + SIGINT(2)
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    // Load configuration
    let config = load_default_config()?;

    handle_command(cli.command, &cli.global, &config)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed unless running at trace level.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            _ => "trace,ort=info".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command(command: Command, global: &GlobalArgs, config: &Config) -> Result<()> {
    let progress_enabled = !global.quiet && !global.no_progress;

    match command {
        Command::Config { action } => handle_config_command(action, config),
        Command::Import { manifest } => with_store(global, config, true, |store| {
            cli::import_manifest(store.as_ref(), &manifest).map(drop)
        }),
        Command::Detect {
            photos,
            force,
            batch_size,
        } => {
            let mut config = config.clone();
            if let Some(batch_size) = batch_size {
                config.pipeline.batch_size = batch_size;
            }
            with_store(global, &config, true, |store| {
                let pipeline = build_pipeline(store, &config, progress_enabled, true)?;
                if pipeline.detector_kinds().is_empty() {
                    return Err(Error::ConfigValidation {
                        message: "no detector models configured (set models.object.path or models.ear.path)"
                            .to_string(),
                    });
                }
                let photos = if photos.is_empty() {
                    pipeline.store().photo_ids()?
                } else {
                    photos
                };
                info!("Detecting on {} photo(s)", photos.len());
                run_jobs(pipeline, &config, vec![Job::Detect { photos, force }])
            })
        }
        Command::Extract { force } => with_store(global, config, true, |store| {
            let pipeline = build_pipeline(store, config, progress_enabled, true)?;
            let classes = pipeline.embedding_classes();
            if classes.is_empty() {
                return Err(Error::ConfigValidation {
                    message: "no embedding model configured (set models.embedding.path)".to_string(),
                });
            }
            let detections = pipeline.store().detection_ids()?;
            let jobs = classes
                .into_iter()
                .map(|class| Job::Extract {
                    detections: detections.clone(),
                    class,
                    force,
                })
                .collect();
            run_jobs(pipeline, config, jobs)
        }),
        Command::Associate { photos } => with_store(global, config, true, |store| {
            let pipeline = build_pipeline(store, config, progress_enabled, false)?;
            let photos = if photos.is_empty() {
                pipeline.store().photo_ids()?
            } else {
                photos
            };
            run_jobs(pipeline, config, vec![Job::Associate { photos }])
        }),
        Command::Score { sightings, all } => with_store(global, config, true, |store| {
            let pipeline = build_pipeline(store, config, progress_enabled, false)?;
            let mode = if all {
                ScoreMode::RecomputeAll
            } else if sightings.is_empty() {
                ScoreMode::FillMissing
            } else {
                ScoreMode::Sightings(sightings)
            };
            let spinner = progress::create_spinner("Scoring sightings", progress_enabled);
            let result = run_jobs(pipeline, config, vec![Job::Score { mode }]);
            progress::finish_progress(spinner, "Scoring complete");
            result
        }),
        Command::Show { sighting, output } => with_store(global, config, false, |store| {
            store.sighting(sighting)?;
            let result = store
                .scoring_result(sighting)?
                .ok_or(Error::NotScored { id: sighting })?;
            emit(&Table::from_scoring_result(&result), &output)
        }),
        Command::Search {
            code,
            binary,
            output,
        } => with_store(global, config, false, |store| {
            let scorer = SeekScorer::new(config.scoring.wildcard_penalty);
            let hits = scoring::search_code(store.as_ref(), &scorer, &code, binary)?;
            debug!("Search for {code} matched {} individuals", hits.len());
            emit(&Table::from_search_hits(&hits), &output)
        }),
    }
}

/// Resolve the snapshot path: `--store`, then config, then the platform default.
fn store_path(global: &GlobalArgs, config: &Config) -> Result<PathBuf> {
    match global.store.as_ref().or(config.store.path.as_ref()) {
        Some(path) => Ok(path.clone()),
        None => default_store_path(),
    }
}

/// Validate config, open the store under its lock, run `f`, and save afterwards if `mutates`.
fn with_store<F>(global: &GlobalArgs, config: &Config, mutates: bool, f: F) -> Result<()>
where
    F: FnOnce(&Arc<MemoryStore>) -> Result<()>,
{
    config::validate_config(config)?;
    let path = store_path(global, config)?;
    let _lock = StoreLock::acquire(&path, global.stale_lock_timeout)?;
    let store = Arc::new(MemoryStore::open(&path)?);

    let outcome = f(&store);
    if mutates {
        // Completed work is kept even when a later stage failed.
        if let Err(e) = store.save(&path) {
            error!("Failed to save store {}: {e}", path.display());
            outcome?;
            return Err(e);
        }
    }
    outcome
}

/// Assemble a pipeline from config; models are only loaded when `with_models` is set.
fn build_pipeline(
    store: &Arc<MemoryStore>,
    config: &Config,
    progress: bool,
    with_models: bool,
) -> Result<Pipeline> {
    let shared: Arc<dyn Store> = Arc::clone(store) as Arc<dyn Store>;
    let mut pipeline = Pipeline::new(shared, config.pipeline_settings(progress));
    if !with_models {
        return Ok(pipeline);
    }

    for kind in [DetectorKind::Object, DetectorKind::Ear] {
        let model = config.models.detector(kind);
        if model.path.is_none() {
            debug!("No {kind} detector model configured");
            continue;
        }
        pipeline = pipeline.with_detector(Arc::new(OnnxDetector::from_config(kind, model)?));
    }

    if config.models.embedding.path.is_some() {
        let model: Arc<dyn EmbeddingModel> =
            Arc::new(OnnxEmbedder::from_config(&config.models.embedding)?);
        pipeline = pipeline
            .with_extractor(Arc::new(EarExtractor::right(Arc::clone(&model))))
            .with_extractor(Arc::new(EarExtractor::left(model)));
    } else {
        debug!("No embedding model configured");
    }

    Ok(pipeline)
}

/// Drain `jobs` and their follow-ups on a worker.
fn run_jobs(pipeline: Pipeline, config: &Config, jobs: Vec<Job>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    let mut worker = Worker::new(Arc::new(pipeline), config.worker.redeliveries);
    for job in jobs {
        worker.submit(job)?;
    }
    let report = runtime.block_on(worker.run_until_idle())?;

    info!(
        "Complete: {} jobs succeeded, {} redelivered, {} failed",
        report.completed,
        report.redelivered,
        report.failed.len()
    );
    if !report.failed.is_empty() {
        for (job, reason) in &report.failed {
            warn!("Failed: {job}: {reason}");
        }
        return Err(Error::Internal {
            message: format!("{} job(s) failed", report.failed.len()),
        });
    }
    Ok(())
}

/// Write a table to `--output` or stdout.
fn emit(table: &Table, args: &OutputArgs) -> Result<()> {
    match &args.output {
        Some(path) => {
            let file = File::create(path)?;
            output::write_table(table, args.format, BufWriter::new(file))?;
            info!("Wrote {} rows to {}", table.rows.len(), path.display());
            Ok(())
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            output::write_table(table, args.format, &mut lock)?;
            lock.flush()?;
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn handle_config_command(action: cli::ConfigAction, config: &Config) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  set models.object.path, models.ear.path and models.embedding.path");
                println!("  tusker import manifest.json");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let text = toml::to_string_pretty(config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
