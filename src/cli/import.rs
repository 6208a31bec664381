//! Bulk import of individuals, sightings, photos and ground-truth boxes.
//!
//! Manifest layout:
//!
//! ```json
//! {
//!   "individuals": [{ "name": "Tembo" }],
//!   "sightings": [
//!     { "key": "s1", "individual": "Tembo",
//!       "observed_at": "2024-05-01T08:30:00Z", "seek": "b2T01E7000-0300X10S001" }
//!   ],
//!   "photos": [
//!     { "path": "img/0001.jpg",
//!       "boxes": [{ "x": 0.1, "y": 0.2, "w": 0.5, "h": 0.6, "sighting": "s1" }] }
//!   ]
//! }
//! ```
//!
//! Relative photo paths resolve against the manifest's directory. A conflict
//! (duplicate photo, bad trait code, dangling reference) is logged and that
//! entry skipped; the rest of the manifest still lands.

use crate::error::{Error, Result};
use crate::seek::TraitCode;
use crate::store::{BoxSubject, IndividualId, SightingId, Store};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Parsed import manifest.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Identities to register.
    pub individuals: Vec<ManifestIndividual>,
    /// Sightings, referenced by `key` from boxes.
    pub sightings: Vec<ManifestSighting>,
    /// Photos with their drawn boxes.
    pub photos: Vec<ManifestPhoto>,
}

/// An identity entry.
#[derive(Debug, Deserialize)]
pub struct ManifestIndividual {
    /// Unique name.
    pub name: String,
}

/// A sighting entry.
#[derive(Debug, Deserialize)]
pub struct ManifestSighting {
    /// Manifest-local key used by boxes.
    pub key: String,
    /// Identity name, once known.
    #[serde(default)]
    pub individual: Option<String>,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
    /// Trait code; absent means every slot unknown.
    #[serde(default)]
    pub seek: Option<String>,
}

/// A photo entry.
#[derive(Debug, Deserialize)]
pub struct ManifestPhoto {
    /// Unique name (default: the file name).
    #[serde(default)]
    pub name: Option<String>,
    /// Image location.
    pub path: PathBuf,
    /// Boxes drawn on this photo.
    #[serde(default)]
    pub boxes: Vec<ManifestBox>,
}

/// A ground-truth box in normalized `x, y, w, h`.
#[derive(Debug, Deserialize)]
pub struct ManifestBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
    /// Owning sighting key.
    #[serde(default)]
    pub sighting: Option<String>,
    /// Owning individual name (profile photo).
    #[serde(default)]
    pub individual: Option<String>,
}

/// Counts of imported and skipped entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Individuals created.
    pub individuals: usize,
    /// Sightings created.
    pub sightings: usize,
    /// Photos registered.
    pub photos: usize,
    /// Boxes recorded.
    pub boxes: usize,
    /// Entries skipped because of conflicts.
    pub skipped: usize,
}

impl Manifest {
    /// Read a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| Error::ManifestParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Import a manifest file into `store`.
pub fn import_manifest(store: &dyn Store, path: &Path) -> Result<ImportSummary> {
    let manifest = Manifest::load(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let summary = Importer::new(store).run(&manifest, base)?;
    info!(
        "Imported {} individuals, {} sightings, {} photos, {} boxes ({} skipped)",
        summary.individuals, summary.sightings, summary.photos, summary.boxes, summary.skipped
    );
    Ok(summary)
}

struct Importer<'a> {
    store: &'a dyn Store,
    individuals: HashMap<String, IndividualId>,
    sightings: HashMap<String, SightingId>,
    summary: ImportSummary,
}

impl<'a> Importer<'a> {
    fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            individuals: HashMap::new(),
            sightings: HashMap::new(),
            summary: ImportSummary::default(),
        }
    }

    fn run(mut self, manifest: &Manifest, base: &Path) -> Result<ImportSummary> {
        for entry in &manifest.individuals {
            self.individual(&entry.name)?;
        }
        for entry in &manifest.sightings {
            self.sighting(entry)?;
        }
        for entry in &manifest.photos {
            self.photo(entry, base)?;
        }
        Ok(self.summary)
    }

    /// Resolve a name, registering it if the store has never seen it.
    fn individual(&mut self, name: &str) -> Result<IndividualId> {
        if let Some(id) = self.individuals.get(name) {
            return Ok(*id);
        }
        let id = match self.store.individual_by_name(name)? {
            Some(existing) => {
                debug!("Individual '{name}' already registered as {}", existing.id);
                existing.id
            }
            None => {
                self.summary.individuals += 1;
                self.store.add_individual(name)?.id
            }
        };
        self.individuals.insert(name.to_string(), id);
        Ok(id)
    }

    fn sighting(&mut self, entry: &ManifestSighting) -> Result<()> {
        if self.sightings.contains_key(&entry.key) {
            warn!("Skipping sighting '{}': duplicate key", entry.key);
            self.summary.skipped += 1;
            return Ok(());
        }
        let code = match entry.seek.as_deref().map(str::parse::<TraitCode>) {
            None => TraitCode::unknown(),
            Some(Ok(code)) => code,
            Some(Err(e)) => {
                warn!("Skipping sighting '{}': {e}", entry.key);
                self.summary.skipped += 1;
                return Ok(());
            }
        };
        let individual = match &entry.individual {
            Some(name) => Some(self.individual(name)?),
            None => None,
        };
        let sighting = self
            .store
            .add_sighting(individual, entry.observed_at, code)?;
        self.sightings.insert(entry.key.clone(), sighting.id);
        self.summary.sightings += 1;
        Ok(())
    }

    fn photo(&mut self, entry: &ManifestPhoto, base: &Path) -> Result<()> {
        let path = if entry.path.is_absolute() {
            entry.path.clone()
        } else {
            base.join(&entry.path)
        };
        let name = entry.name.clone().unwrap_or_else(|| {
            entry
                .path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
        });

        let (width, height) = match image::image_dimensions(&path) {
            Ok(dims) => dims,
            Err(e) => {
                warn!("Skipping photo '{name}' ({}): {e}", path.display());
                self.summary.skipped += 1 + entry.boxes.len();
                return Ok(());
            }
        };

        let photo = match self.store.add_photo(&name, &path, width, height) {
            Ok(photo) => photo,
            Err(e @ Error::DuplicatePhoto { .. }) => {
                warn!("Skipping photo '{name}': {e}");
                self.summary.skipped += 1 + entry.boxes.len();
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        self.summary.photos += 1;

        for gt in &entry.boxes {
            let Some(subject) = self.subject(gt) else {
                warn!(
                    "Skipping box on photo {}: unknown sighting or individual reference",
                    photo.id
                );
                self.summary.skipped += 1;
                continue;
            };
            self.store
                .add_ground_truth(photo.id, [gt.x, gt.y, gt.w, gt.h], subject)?;
            self.summary.boxes += 1;
        }
        Ok(())
    }

    fn subject(&self, gt: &ManifestBox) -> Option<BoxSubject> {
        match (&gt.sighting, &gt.individual) {
            (Some(key), _) => self.sightings.get(key).map(|id| BoxSubject::Sighting(*id)),
            (None, Some(name)) => self
                .individuals
                .get(name)
                .map(|id| BoxSubject::Individual(*id)),
            (None, None) => Some(BoxSubject::Unassigned),
        }
    }
}
