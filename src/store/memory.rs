//! In-memory store with JSON snapshot persistence.

use super::{
    BoxSubject, Detection, DetectionId, DetectionRepository, Embedding, EmbeddingId,
    EmbeddingRepository, GroundTruthBox, GroundTruthId, GroundTruthRepository, Individual,
    IndividualId, MlRecord, NewDetection, Photo, PhotoId, PhotoRepository, ScoreCache,
    ScoringResult, Sighting, SightingId, SightingRepository,
};
use crate::error::{Error, Result};
use crate::inference::{DetectorKind, EmbeddingClass};
use crate::seek::TraitCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct StoreData {
    next_id: u64,
    photos: BTreeMap<PhotoId, Photo>,
    ground_truth: BTreeMap<GroundTruthId, GroundTruthBox>,
    individuals: BTreeMap<IndividualId, Individual>,
    sightings: BTreeMap<SightingId, Sighting>,
    ml_records: BTreeMap<PhotoId, MlRecord>,
    detections: BTreeMap<DetectionId, Detection>,
    embeddings: BTreeMap<(DetectionId, EmbeddingClass), Embedding>,
    scoring: BTreeMap<SightingId, ScoringResult>,
}

impl StoreData {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_photo(&self, id: PhotoId) -> Result<&Photo> {
        self.photos.get(&id).ok_or(Error::PhotoNotFound { id })
    }

    fn check_individual(&self, id: IndividualId) -> Result<&Individual> {
        self.individuals
            .get(&id)
            .ok_or(Error::IndividualNotFound { id })
    }

    fn check_sighting(&self, id: SightingId) -> Result<&Sighting> {
        self.sightings.get(&id).ok_or(Error::SightingNotFound { id })
    }
}

/// On-disk form: flat record lists plus the id counter.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    next_id: u64,
    photos: Vec<Photo>,
    ground_truth: Vec<GroundTruthBox>,
    individuals: Vec<Individual>,
    sightings: Vec<Sighting>,
    ml_records: Vec<MlRecord>,
    detections: Vec<Detection>,
    embeddings: Vec<Embedding>,
    scoring_results: Vec<ScoringResult>,
}

impl From<&StoreData> for Snapshot {
    fn from(data: &StoreData) -> Self {
        Self {
            next_id: data.next_id,
            photos: data.photos.values().cloned().collect(),
            ground_truth: data.ground_truth.values().copied().collect(),
            individuals: data.individuals.values().cloned().collect(),
            sightings: data.sightings.values().cloned().collect(),
            ml_records: data.ml_records.values().cloned().collect(),
            detections: data.detections.values().copied().collect(),
            embeddings: data.embeddings.values().cloned().collect(),
            scoring_results: data.scoring.values().cloned().collect(),
        }
    }
}

impl From<Snapshot> for StoreData {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            next_id: snapshot.next_id,
            photos: snapshot.photos.into_iter().map(|p| (p.id, p)).collect(),
            ground_truth: snapshot
                .ground_truth
                .into_iter()
                .map(|b| (b.id, b))
                .collect(),
            individuals: snapshot
                .individuals
                .into_iter()
                .map(|i| (i.id, i))
                .collect(),
            sightings: snapshot.sightings.into_iter().map(|s| (s.id, s)).collect(),
            ml_records: snapshot
                .ml_records
                .into_iter()
                .map(|r| (r.photo, r))
                .collect(),
            detections: snapshot
                .detections
                .into_iter()
                .map(|d| (d.id, d))
                .collect(),
            embeddings: snapshot
                .embeddings
                .into_iter()
                .map(|e| ((e.detection, e.class), e))
                .collect(),
            scoring: snapshot
                .scoring_results
                .into_iter()
                .map(|r| (r.sighting, r))
                .collect(),
        }
    }
}

/// Store backed by ordered maps behind a single lock.
///
/// Every trait method takes the lock once, so each call is atomic with
/// respect to other callers. Ids come from one counter shared by all
/// record kinds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot; a missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No store at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::StoreRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| Error::StoreParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(
            "Loaded store {} ({} photos, {} detections)",
            path.display(),
            snapshot.photos.len(),
            snapshot.detections.len()
        );

        Ok(Self {
            data: RwLock::new(snapshot.into()),
        })
    }

    /// Write a snapshot to a temporary file and rename it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot::from(&*self.read()?);
        let write_err = |e: Box<dyn std::error::Error + Send + Sync>| Error::StoreWrite {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| write_err(e.into()))?;
        }

        let json = serde_json::to_string(&snapshot).map_err(|e| write_err(e.into()))?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp).map_err(|e| write_err(e.into()))?;
            file.write_all(json.as_bytes())
                .map_err(|e| write_err(e.into()))?;
            file.sync_all().map_err(|e| write_err(e.into()))?;
        }
        fs::rename(&tmp, path).map_err(|e| write_err(e.into()))?;

        info!("Saved store to {}", path.display());
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreData>> {
        self.data.read().map_err(|_| Error::StoreUnavailable {
            reason: "store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreData>> {
        self.data.write().map_err(|_| Error::StoreUnavailable {
            reason: "store lock poisoned".to_string(),
        })
    }
}

impl PhotoRepository for MemoryStore {
    fn photo(&self, id: PhotoId) -> Result<Photo> {
        self.read()?.check_photo(id).cloned()
    }

    fn photo_ids(&self) -> Result<Vec<PhotoId>> {
        Ok(self.read()?.photos.keys().copied().collect())
    }

    fn photo_by_name(&self, name: &str) -> Result<Option<Photo>> {
        Ok(self
            .read()?
            .photos
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    fn add_photo(&self, name: &str, path: &Path, width: u32, height: u32) -> Result<Photo> {
        let mut data = self.write()?;
        if data.photos.values().any(|p| p.name == name) {
            return Err(Error::DuplicatePhoto {
                name: name.to_string(),
            });
        }
        let photo = Photo {
            id: PhotoId(data.allocate()),
            name: name.to_string(),
            path: path.to_path_buf(),
            width,
            height,
        };
        data.photos.insert(photo.id, photo.clone());
        Ok(photo)
    }
}

impl GroundTruthRepository for MemoryStore {
    fn boxes_for_photo(&self, photo: PhotoId) -> Result<Vec<GroundTruthBox>> {
        Ok(self
            .read()?
            .ground_truth
            .values()
            .filter(|b| b.photo == photo)
            .copied()
            .collect())
    }

    fn boxes_for_sightings(&self, sightings: &[SightingId]) -> Result<Vec<GroundTruthBox>> {
        let wanted: BTreeSet<_> = sightings.iter().copied().collect();
        Ok(self
            .read()?
            .ground_truth
            .values()
            .filter(|b| matches!(b.subject, BoxSubject::Sighting(s) if wanted.contains(&s)))
            .copied()
            .collect())
    }

    fn boxes_for_individual(&self, individual: IndividualId) -> Result<Vec<GroundTruthBox>> {
        let sightings: Vec<SightingId> = self
            .read()?
            .sightings
            .values()
            .filter(|s| s.individual == Some(individual))
            .map(|s| s.id)
            .collect();
        self.boxes_for_sightings(&sightings)
    }

    fn add_ground_truth(
        &self,
        photo: PhotoId,
        xywh: [f32; 4],
        subject: BoxSubject,
    ) -> Result<GroundTruthBox> {
        let mut data = self.write()?;
        data.check_photo(photo)?;
        match subject {
            BoxSubject::Sighting(id) => {
                data.check_sighting(id)?;
            }
            BoxSubject::Individual(id) => {
                data.check_individual(id)?;
            }
            BoxSubject::Unassigned => {}
        }
        let [x, y, w, h] = xywh;
        let gt = GroundTruthBox {
            id: GroundTruthId(data.allocate()),
            photo,
            x,
            y,
            w,
            h,
            subject,
        };
        data.ground_truth.insert(gt.id, gt);
        Ok(gt)
    }
}

impl SightingRepository for MemoryStore {
    fn individuals(&self) -> Result<Vec<Individual>> {
        Ok(self.read()?.individuals.values().cloned().collect())
    }

    fn sighted_individuals(&self) -> Result<Vec<Individual>> {
        let data = self.read()?;
        let sighted: BTreeSet<IndividualId> = data
            .sightings
            .values()
            .filter_map(|s| s.individual)
            .collect();
        Ok(sighted
            .iter()
            .filter_map(|id| data.individuals.get(id).cloned())
            .collect())
    }

    fn individual_by_name(&self, name: &str) -> Result<Option<Individual>> {
        Ok(self
            .read()?
            .individuals
            .values()
            .find(|i| i.name == name)
            .cloned())
    }

    fn add_individual(&self, name: &str) -> Result<Individual> {
        let mut data = self.write()?;
        if data.individuals.values().any(|i| i.name == name) {
            return Err(Error::DuplicateIndividual {
                name: name.to_string(),
            });
        }
        let individual = Individual {
            id: IndividualId(data.allocate()),
            name: name.to_string(),
        };
        data.individuals.insert(individual.id, individual.clone());
        Ok(individual)
    }

    fn sighting(&self, id: SightingId) -> Result<Sighting> {
        self.read()?.check_sighting(id).cloned()
    }

    fn sightings(&self) -> Result<Vec<Sighting>> {
        Ok(self.read()?.sightings.values().cloned().collect())
    }

    fn add_sighting(
        &self,
        individual: Option<IndividualId>,
        observed_at: DateTime<Utc>,
        seek: TraitCode,
    ) -> Result<Sighting> {
        let mut data = self.write()?;
        if let Some(id) = individual {
            data.check_individual(id)?;
        }
        let sighting = Sighting {
            id: SightingId(data.allocate()),
            individual,
            observed_at,
            seek,
        };
        data.sightings.insert(sighting.id, sighting.clone());
        Ok(sighting)
    }

    fn set_trait_code(&self, id: SightingId, seek: TraitCode) -> Result<()> {
        let mut data = self.write()?;
        let sighting = data
            .sightings
            .get_mut(&id)
            .ok_or(Error::SightingNotFound { id })?;
        sighting.seek = seek;
        Ok(())
    }

    fn latest_trait_code(&self, individual: IndividualId) -> Result<Option<TraitCode>> {
        Ok(self
            .read()?
            .sightings
            .values()
            .filter(|s| s.individual == Some(individual))
            .max_by_key(|s| (s.observed_at, s.id))
            .map(|s| s.seek))
    }
}

impl DetectionRepository for MemoryStore {
    fn ml_record(&self, photo: PhotoId) -> Result<MlRecord> {
        let data = self.read()?;
        data.check_photo(photo)?;
        Ok(data
            .ml_records
            .get(&photo)
            .cloned()
            .unwrap_or_else(|| MlRecord::new(photo)))
    }

    fn replace_detections(
        &self,
        photo: PhotoId,
        detector: DetectorKind,
        detections: Vec<NewDetection>,
    ) -> Result<Vec<Detection>> {
        let mut data = self.write()?;
        data.check_photo(photo)?;
        if let Some(stray) = detections.iter().find(|d| d.class.detector() != detector) {
            return Err(Error::Internal {
                message: format!(
                    "{} detection offered as {detector} detector output",
                    stray.class
                ),
            });
        }

        let stale: Vec<DetectionId> = data
            .detections
            .values()
            .filter(|d| d.photo == photo && d.detector() == detector)
            .map(|d| d.id)
            .collect();
        for id in &stale {
            data.detections.remove(id);
        }
        data.embeddings.retain(|(owner, _), _| !stale.contains(owner));

        let mut inserted = Vec::with_capacity(detections.len());
        for new in detections {
            let detection = Detection {
                id: DetectionId(data.allocate()),
                photo,
                class: new.class,
                bbox: new.bbox,
                confidence: new.confidence,
                ground_truth: None,
            };
            data.detections.insert(detection.id, detection);
            inserted.push(detection);
        }

        data.ml_records
            .entry(photo)
            .or_insert_with(|| MlRecord::new(photo))
            .runs
            .insert(detector, inserted.len());

        debug!(
            "Photo {photo}: replaced {} {detector} detections with {}",
            stale.len(),
            inserted.len()
        );
        Ok(inserted)
    }

    fn detections_for_photo(&self, photo: PhotoId) -> Result<Vec<Detection>> {
        Ok(self
            .read()?
            .detections
            .values()
            .filter(|d| d.photo == photo)
            .copied()
            .collect())
    }

    fn detections(&self, ids: &[DetectionId]) -> Result<Vec<Detection>> {
        let data = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| data.detections.get(id).copied())
            .collect())
    }

    fn detection_ids(&self) -> Result<Vec<DetectionId>> {
        Ok(self.read()?.detections.keys().copied().collect())
    }

    fn set_associations(
        &self,
        photo: PhotoId,
        links: &[(DetectionId, Option<GroundTruthId>)],
    ) -> Result<()> {
        let mut data = self.write()?;
        for (detection, gt) in links {
            match data.detections.get(detection) {
                Some(d) if d.photo == photo => {}
                _ => return Err(Error::DetectionNotFound { id: *detection }),
            }
            if let Some(gt) = gt
                && data.ground_truth.get(gt).is_none_or(|b| b.photo != photo)
            {
                return Err(Error::StoreUnavailable {
                    reason: format!("ground-truth box {gt} is not on photo {photo}"),
                });
            }
        }
        for (detection, gt) in links {
            if let Some(d) = data.detections.get_mut(detection) {
                d.ground_truth = *gt;
            }
        }
        Ok(())
    }

    fn detections_for_ground_truth(&self, boxes: &[GroundTruthId]) -> Result<Vec<Detection>> {
        let wanted: BTreeSet<_> = boxes.iter().copied().collect();
        Ok(self
            .read()?
            .detections
            .values()
            .filter(|d| d.ground_truth.is_some_and(|gt| wanted.contains(&gt)))
            .copied()
            .collect())
    }
}

impl EmbeddingRepository for MemoryStore {
    fn embedding(
        &self,
        detection: DetectionId,
        class: EmbeddingClass,
    ) -> Result<Option<Embedding>> {
        Ok(self.read()?.embeddings.get(&(detection, class)).cloned())
    }

    fn replace_embedding(
        &self,
        detection: DetectionId,
        class: EmbeddingClass,
        vector: Vec<f32>,
    ) -> Result<Embedding> {
        let mut data = self.write()?;
        if !data.detections.contains_key(&detection) {
            return Err(Error::DetectionNotFound { id: detection });
        }
        let embedding = Embedding {
            id: EmbeddingId(data.allocate()),
            detection,
            class,
            vector,
        };
        data.embeddings
            .insert((detection, class), embedding.clone());
        Ok(embedding)
    }

    fn embeddings_for_detections(
        &self,
        detections: &[DetectionId],
        class: EmbeddingClass,
    ) -> Result<Vec<Embedding>> {
        let data = self.read()?;
        Ok(detections
            .iter()
            .filter_map(|id| data.embeddings.get(&(*id, class)).cloned())
            .collect())
    }
}

impl ScoreCache for MemoryStore {
    fn scoring_result(&self, sighting: SightingId) -> Result<Option<ScoringResult>> {
        Ok(self.read()?.scoring.get(&sighting).cloned())
    }

    fn put_scoring_result(&self, result: ScoringResult) -> Result<()> {
        let mut data = self.write()?;
        data.check_sighting(result.sighting)?;
        data.scoring.insert(result.sighting, result);
        Ok(())
    }

    fn has_scoring_result(&self, sighting: SightingId) -> Result<bool> {
        Ok(self.read()?.scoring.contains_key(&sighting))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::inference::{DetectionClass, EarSide};
    use crate::store::DetectorStatus;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ear(side: EarSide) -> NewDetection {
        NewDetection {
            class: DetectionClass::Ear { side },
            bbox: BBox::new(0.1, 0.1, 0.3, 0.3),
            confidence: 0.9,
        }
    }

    fn elephant() -> NewDetection {
        NewDetection {
            class: DetectionClass::Elephant,
            bbox: BBox::new(0.0, 0.0, 0.5, 0.5),
            confidence: 0.8,
        }
    }

    #[test]
    fn test_duplicate_photo_rejected() {
        let store = MemoryStore::new();
        store.add_photo("a.jpg", Path::new("a.jpg"), 10, 10).unwrap();
        let err = store
            .add_photo("a.jpg", Path::new("b.jpg"), 10, 10)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicatePhoto { .. }));
    }

    #[test]
    fn test_replace_detections_sets_flag_and_keeps_other_family() {
        let store = MemoryStore::new();
        let photo = store.add_photo("p", Path::new("p.jpg"), 10, 10).unwrap();

        store
            .replace_detections(photo.id, DetectorKind::Object, vec![elephant()])
            .unwrap();
        let ears = store
            .replace_detections(
                photo.id,
                DetectorKind::Ear,
                vec![ear(EarSide::Left), ear(EarSide::Right)],
            )
            .unwrap();
        assert_eq!(ears.len(), 2);

        let record = store.ml_record(photo.id).unwrap();
        assert_eq!(record.status(DetectorKind::Ear), DetectorStatus::Populated);
        assert_eq!(record.status(DetectorKind::Object), DetectorStatus::Populated);

        store
            .replace_detections(photo.id, DetectorKind::Ear, Vec::new())
            .unwrap();
        let record = store.ml_record(photo.id).unwrap();
        assert_eq!(record.status(DetectorKind::Ear), DetectorStatus::Empty);

        let remaining = store.detections_for_photo(photo.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].class, DetectionClass::Elephant);
    }

    #[test]
    fn test_replace_detections_drops_embeddings() {
        let store = MemoryStore::new();
        let photo = store.add_photo("p", Path::new("p.jpg"), 10, 10).unwrap();
        let dets = store
            .replace_detections(photo.id, DetectorKind::Ear, vec![ear(EarSide::Right)])
            .unwrap();
        store
            .replace_embedding(dets[0].id, EmbeddingClass::RightEar, vec![1.0, -1.0])
            .unwrap();

        store
            .replace_detections(photo.id, DetectorKind::Ear, vec![ear(EarSide::Right)])
            .unwrap();
        assert!(
            store
                .embedding(dets[0].id, EmbeddingClass::RightEar)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_replace_detections_rejects_foreign_class() {
        let store = MemoryStore::new();
        let photo = store.add_photo("p", Path::new("p.jpg"), 10, 10).unwrap();
        let err = store
            .replace_detections(photo.id, DetectorKind::Ear, vec![elephant()])
            .unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
        assert_eq!(
            store.ml_record(photo.id).unwrap().status(DetectorKind::Ear),
            DetectorStatus::Unattempted
        );
    }

    #[test]
    fn test_replace_embedding_keeps_one_per_class() {
        let store = MemoryStore::new();
        let photo = store.add_photo("p", Path::new("p.jpg"), 10, 10).unwrap();
        let det = store
            .replace_detections(photo.id, DetectorKind::Ear, vec![ear(EarSide::Left)])
            .unwrap()[0];

        store
            .replace_embedding(det.id, EmbeddingClass::LeftEar, vec![1.0, 0.0])
            .unwrap();
        store
            .replace_embedding(det.id, EmbeddingClass::LeftEar, vec![0.0, 1.0])
            .unwrap();

        let all = store
            .embeddings_for_detections(&[det.id], EmbeddingClass::LeftEar)
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].vector, vec![0.0, 1.0]);
    }

    #[test]
    fn test_latest_trait_code_breaks_ties_by_id() {
        let store = MemoryStore::new();
        let ind = store.add_individual("Echo").unwrap();
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let older: TraitCode = "b2T01E7000-0300X10S001".parse().unwrap();
        store.add_sighting(Some(ind.id), t, older).unwrap();
        let newer: TraitCode = "c8T11E0000-0000X00S000".parse().unwrap();
        store.add_sighting(Some(ind.id), t, newer).unwrap();

        assert_eq!(store.latest_trait_code(ind.id).unwrap(), Some(newer));
        let other = store.add_individual("Tuskless").unwrap();
        assert_eq!(store.latest_trait_code(other.id).unwrap(), None);
        assert_eq!(store.sighted_individuals().unwrap(), vec![ind]);
    }

    #[test]
    fn test_set_associations_validates_photo() {
        let store = MemoryStore::new();
        let a = store.add_photo("a", Path::new("a.jpg"), 10, 10).unwrap();
        let b = store.add_photo("b", Path::new("b.jpg"), 10, 10).unwrap();
        let det = store
            .replace_detections(a.id, DetectorKind::Object, vec![elephant()])
            .unwrap()[0];
        let gt_b = store
            .add_ground_truth(b.id, [0.0, 0.0, 0.5, 0.5], BoxSubject::Unassigned)
            .unwrap();
        assert!(store.set_associations(a.id, &[(det.id, Some(gt_b.id))]).is_err());

        let gt_a = store
            .add_ground_truth(a.id, [0.0, 0.0, 0.5, 0.5], BoxSubject::Unassigned)
            .unwrap();
        store
            .set_associations(a.id, &[(det.id, Some(gt_a.id))])
            .unwrap();
        let linked = store.detections_for_ground_truth(&[gt_a.id]).unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, det.id);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = MemoryStore::new();
        let photo = store.add_photo("p", Path::new("p.jpg"), 64, 48).unwrap();
        let det = store
            .replace_detections(photo.id, DetectorKind::Ear, vec![ear(EarSide::Right)])
            .unwrap()[0];
        store
            .replace_embedding(det.id, EmbeddingClass::RightEar, vec![0.5, -0.5])
            .unwrap();
        store.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.photo(photo.id).unwrap(), photo);
        assert_eq!(
            reopened
                .embedding(det.id, EmbeddingClass::RightEar)
                .unwrap()
                .map(|e| e.vector),
            Some(vec![0.5, -0.5])
        );
        let next = reopened.add_individual("Fresh").unwrap();
        assert!(next.id.0 > det.id.0);
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(&dir.path().join("absent.json")).unwrap();
        assert!(store.photo_ids().unwrap().is_empty());
    }
}
