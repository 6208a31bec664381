//! Integration tests for the detect, extract, associate and score stages.

use chrono::{TimeZone, Utc};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tusker::error::{Error, Result};
use tusker::inference::{
    Detector, DetectorKind, EarExtractor, EmbeddingClass, EmbeddingModel, RawDetection,
};
use tusker::jobs::{Discard, Job, Worker};
use tusker::pipeline::{Pipeline, PipelineSettings};
use tusker::scoring::ScoreMode;
use tusker::seek::TraitCode;
use tusker::store::{
    BoxSubject, DetectionRepository, DetectorStatus, EmbeddingRepository, GroundTruthRepository,
    MemoryStore, PhotoId, PhotoRepository, ScoreCache, SightingId, SightingRepository, Store,
};

const TEMBO_CODE: &str = "b2T01E7000-0300X10S001";
const SHABA_CODE: &str = "c8T11E0000-0000X00S000";

/// Returns fixed rows for every image and counts its calls.
struct FakeDetector {
    kind: DetectorKind,
    rows: Vec<RawDetection>,
    calls: Arc<AtomicUsize>,
}

impl FakeDetector {
    fn object(calls: Arc<AtomicUsize>) -> Self {
        Self {
            kind: DetectorKind::Object,
            rows: vec![row(0.5, 0.5, 0.6, 0.6, 20), row(0.1, 0.1, 0.1, 0.1, 0)],
            calls,
        }
    }

    fn ear(calls: Arc<AtomicUsize>) -> Self {
        Self {
            kind: DetectorKind::Ear,
            rows: vec![row(0.3, 0.4, 0.2, 0.2, 1), row(0.7, 0.4, 0.2, 0.2, 2)],
            calls,
        }
    }
}

impl Detector for FakeDetector {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<RawDetection>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(images.iter().map(|_| self.rows.clone()).collect())
    }
}

/// Fails its first call, then finds one elephant per image.
struct FlakyDetector {
    calls: AtomicUsize,
}

impl Detector for FlakyDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Object
    }

    fn detect(&self, images: &[DynamicImage]) -> Result<Vec<Vec<RawDetection>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(Error::Inference {
                reason: "device lost".to_string(),
            });
        }
        Ok(images
            .iter()
            .map(|_| vec![row(0.5, 0.5, 0.6, 0.6, 20)])
            .collect())
    }
}

/// Embeds a crop as a few constants plus its mean brightness.
struct BrightnessEmbedder;

impl EmbeddingModel for BrightnessEmbedder {
    fn embed(&self, crop: &DynamicImage) -> Result<Vec<f32>> {
        let gray = crop.to_luma8();
        let total: f32 = gray.pixels().map(|p| f32::from(p.0[0])).sum();
        let mean = total / (gray.width() * gray.height()).max(1) as f32;
        Ok(vec![1.0, 2.0, 3.0, mean / 255.0])
    }
}

fn row(x_center: f32, y_center: f32, w: f32, h: f32, class_id: u32) -> RawDetection {
    RawDetection {
        x_center,
        y_center,
        w,
        h,
        confidence: 0.9,
        class_id,
    }
}

fn write_photo(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(100, 100, |x, y| Rgb([x as u8 * 2, y as u8 * 2, 128]))
        .save(&path)
        .unwrap();
    path
}

struct Fixture {
    dir: TempDir,
    store: Arc<MemoryStore>,
    photos: Vec<PhotoId>,
    query: SightingId,
    object_calls: Arc<AtomicUsize>,
    ear_calls: Arc<AtomicUsize>,
}

/// Two identical photos: one of Tembo's sighting, one of an unidentified
/// query sighting. Shaba has a sighting but no photos.
fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 8, 0, 0).unwrap();

    let tembo = store.add_individual("Tembo").unwrap();
    let shaba = store.add_individual("Shaba").unwrap();
    let s1 = store
        .add_sighting(Some(tembo.id), day(1), TEMBO_CODE.parse().unwrap())
        .unwrap();
    store
        .add_sighting(Some(shaba.id), day(2), SHABA_CODE.parse().unwrap())
        .unwrap();
    let query = store
        .add_sighting(None, day(3), TEMBO_CODE.parse().unwrap())
        .unwrap();

    let a = store
        .add_photo("a.png", &write_photo(dir.path(), "a.png"), 100, 100)
        .unwrap();
    let b = store
        .add_photo("b.png", &write_photo(dir.path(), "b.png"), 100, 100)
        .unwrap();
    store
        .add_ground_truth(a.id, [0.2, 0.2, 0.6, 0.6], BoxSubject::Sighting(s1.id))
        .unwrap();
    store
        .add_ground_truth(b.id, [0.2, 0.2, 0.6, 0.6], BoxSubject::Sighting(query.id))
        .unwrap();

    Fixture {
        dir,
        store,
        photos: vec![a.id, b.id],
        query: query.id,
        object_calls: Arc::new(AtomicUsize::new(0)),
        ear_calls: Arc::new(AtomicUsize::new(0)),
    }
}

fn full_pipeline(fx: &Fixture) -> Arc<Pipeline> {
    let model: Arc<dyn EmbeddingModel> = Arc::new(BrightnessEmbedder);
    let store: Arc<dyn Store> = Arc::clone(&fx.store) as Arc<dyn Store>;
    Arc::new(
        Pipeline::new(store, PipelineSettings::default())
            .with_detector(Arc::new(FakeDetector::object(Arc::clone(&fx.object_calls))))
            .with_detector(Arc::new(FakeDetector::ear(Arc::clone(&fx.ear_calls))))
            .with_extractor(Arc::new(EarExtractor::right(Arc::clone(&model))))
            .with_extractor(Arc::new(EarExtractor::left(model))),
    )
}

async fn run(pipeline: &Arc<Pipeline>, job: Job) -> tusker::jobs::WorkerReport {
    let mut worker = Worker::new(Arc::clone(pipeline), 0);
    worker.submit(job).unwrap();
    worker.run_until_idle().await.unwrap()
}

#[tokio::test]
async fn test_detect_chains_extraction_and_association() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);

    let report = run(
        &pipeline,
        Job::Detect {
            photos: fx.photos.clone(),
            force: false,
        },
    )
    .await;

    // detect, right-ear extract, left-ear extract, associate
    assert_eq!(report.completed, 4);
    assert!(report.failed.is_empty());
    assert_eq!(fx.object_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.ear_calls.load(Ordering::SeqCst), 1);

    for &photo in &fx.photos {
        let record = fx.store.ml_record(photo).unwrap();
        assert_eq!(record.status(DetectorKind::Object), DetectorStatus::Populated);
        assert_eq!(record.status(DetectorKind::Ear), DetectorStatus::Populated);

        let detections = fx.store.detections_for_photo(photo).unwrap();
        // elephant, other object, left ear, right ear
        assert_eq!(detections.len(), 4);

        let gt = fx.store.boxes_for_photo(photo).unwrap()[0].id;
        for d in &detections {
            match d.class.to_string().as_str() {
                "elephant" | "left ear" | "right ear" => assert_eq!(d.ground_truth, Some(gt)),
                _ => assert_eq!(d.ground_truth, None),
            }
        }

        let right = detections
            .iter()
            .find(|d| d.class.to_string() == "right ear")
            .unwrap();
        assert!(
            fx.store
                .embedding(right.id, EmbeddingClass::RightEar)
                .unwrap()
                .is_some()
        );
        assert!(
            fx.store
                .embedding(right.id, EmbeddingClass::LeftEar)
                .unwrap()
                .is_none()
        );
    }
}

#[tokio::test]
async fn test_rerun_skips_completed_photos() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);
    let detect = Job::Detect {
        photos: fx.photos.clone(),
        force: false,
    };

    run(&pipeline, detect.clone()).await;
    let before = fx.store.detection_ids().unwrap();

    let report = run(&pipeline, detect).await;
    assert_eq!(report.completed, 1);
    assert_eq!(fx.object_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.ear_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.store.detection_ids().unwrap(), before);
}

#[tokio::test]
async fn test_forced_rerun_replaces_detections_and_embeddings() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);

    run(
        &pipeline,
        Job::Detect {
            photos: fx.photos.clone(),
            force: false,
        },
    )
    .await;
    let old = fx.store.detection_ids().unwrap();

    run(
        &pipeline,
        Job::Detect {
            photos: fx.photos.clone(),
            force: true,
        },
    )
    .await;
    let new = fx.store.detection_ids().unwrap();

    assert_eq!(new.len(), old.len());
    assert!(old.iter().all(|id| !new.contains(id)));
    for id in &old {
        for class in EmbeddingClass::ALL {
            assert!(fx.store.embedding(*id, class).unwrap().is_none());
        }
    }
    let ears = fx
        .store
        .detections(&new)
        .unwrap()
        .into_iter()
        .filter(|d| d.detector() == DetectorKind::Ear);
    for ear in ears {
        let class = if ear.class.to_string() == "right ear" {
            EmbeddingClass::RightEar
        } else {
            EmbeddingClass::LeftEar
        };
        assert!(fx.store.embedding(ear.id, class).unwrap().is_some());
    }
}

#[tokio::test]
async fn test_failed_job_is_redelivered() {
    let fx = fixture();
    let store: Arc<dyn Store> = Arc::clone(&fx.store) as Arc<dyn Store>;
    let pipeline = Arc::new(
        Pipeline::new(store, PipelineSettings::default()).with_detector(Arc::new(FlakyDetector {
            calls: AtomicUsize::new(0),
        })),
    );

    let mut worker = Worker::new(pipeline, 1);
    worker
        .submit(Job::Detect {
            photos: fx.photos.clone(),
            force: false,
        })
        .unwrap();
    let report = worker.run_until_idle().await.unwrap();

    assert_eq!(report.redelivered, 1);
    // detect on its second attempt, then associate
    assert_eq!(report.completed, 2);
    assert!(report.failed.is_empty());
    for &photo in &fx.photos {
        assert_eq!(fx.store.detections_for_photo(photo).unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_failed_job_without_redelivery_is_reported() {
    let fx = fixture();
    let store: Arc<dyn Store> = Arc::clone(&fx.store) as Arc<dyn Store>;
    let pipeline = Arc::new(
        Pipeline::new(store, PipelineSettings::default()).with_detector(Arc::new(FlakyDetector {
            calls: AtomicUsize::new(0),
        })),
    );

    let report = run(
        &pipeline,
        Job::Detect {
            photos: fx.photos.clone(),
            force: false,
        },
    )
    .await;

    assert_eq!(report.completed, 0);
    assert_eq!(report.failed.len(), 1);
    let record = fx.store.ml_record(fx.photos[0]).unwrap();
    assert_eq!(record.status(DetectorKind::Object), DetectorStatus::Unattempted);
}

#[tokio::test]
async fn test_scoring_ranks_matching_individual_first() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);
    run(
        &pipeline,
        Job::Detect {
            photos: fx.photos.clone(),
            force: false,
        },
    )
    .await;

    let report = run(
        &pipeline,
        Job::Score {
            mode: ScoreMode::Sightings(vec![fx.query]),
        },
    )
    .await;
    assert_eq!(report.completed, 1);

    let result = fx.store.scoring_result(fx.query).unwrap().unwrap();
    assert_eq!(result.rows.len(), 2);

    let top = &result.rows[0];
    assert_eq!(top.name, "Tembo");
    assert_eq!(top.rank, Some(1));
    assert!((top.scores[1] - 1.0).abs() < 1e-6, "right ear: {}", top.scores[1]);
    assert!((top.scores[2] - 1.0).abs() < 1e-6, "left ear: {}", top.scores[2]);

    // Shaba has no photos: embedding channels are missing, not zero.
    let shaba = &result.rows[1];
    assert_eq!(shaba.name, "Shaba");
    assert!(!shaba.scores[0].is_nan());
    assert!(shaba.scores[1].is_nan());
    assert!(shaba.scores[2].is_nan());
    assert!(!shaba.combined.is_nan());
    assert_eq!(shaba.seek_code, SHABA_CODE.parse::<TraitCode>().unwrap());
}

#[tokio::test]
async fn test_fill_missing_only_scores_new_sightings() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);

    let first = pipeline.combiner().run(&ScoreMode::FillMissing).unwrap();
    assert_eq!(first.len(), 3);

    let second = pipeline.combiner().run(&ScoreMode::FillMissing).unwrap();
    assert!(second.is_empty());

    let extra = fx
        .store
        .add_sighting(None, Utc::now(), TraitCode::unknown())
        .unwrap();
    let third = pipeline.combiner().run(&ScoreMode::FillMissing).unwrap();
    assert_eq!(third, vec![extra.id]);
}

#[tokio::test]
async fn test_recompute_all_overwrites_cached_rankings() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);

    pipeline.combiner().run(&ScoreMode::FillMissing).unwrap();
    let before = fx.store.scoring_result(fx.query).unwrap().unwrap();
    assert_eq!(before.rows[1].name, "Shaba");
    assert!(before.rows[1].scores[0] < 1.0);

    let shaba_sighting = fx
        .store
        .sightings()
        .unwrap()
        .into_iter()
        .find(|s| s.seek == SHABA_CODE.parse::<TraitCode>().unwrap())
        .unwrap();
    fx.store
        .set_trait_code(shaba_sighting.id, TEMBO_CODE.parse().unwrap())
        .unwrap();

    // A trait code edit alone leaves the cache untouched.
    let cached = fx.store.scoring_result(fx.query).unwrap().unwrap();
    assert_eq!(cached.computed_at, before.computed_at);
    assert_eq!(cached.rows[1].seek_code, before.rows[1].seek_code);

    let report = run(
        &pipeline,
        Job::Score {
            mode: ScoreMode::RecomputeAll,
        },
    )
    .await;
    assert_eq!(report.completed, 1);

    let after = fx.store.scoring_result(fx.query).unwrap().unwrap();
    assert!(after.computed_at >= before.computed_at);
    assert_eq!(after.rows.len(), 2);
    let tembo_code: TraitCode = TEMBO_CODE.parse().unwrap();
    for row in &after.rows {
        assert_eq!(row.seek_code, tembo_code);
        assert!((row.scores[0] - 1.0).abs() < 1e-9);
        assert_eq!(row.rank, Some(1));
    }
    for sighting in fx.store.sightings().unwrap() {
        assert!(fx.store.has_scoring_result(sighting.id).unwrap());
    }
}

#[test]
fn test_extract_without_force_keeps_existing_embedding() {
    let fx = fixture();
    let pipeline = full_pipeline(&fx);
    pipeline.detect(&fx.photos, false, &Discard).unwrap();

    let right_ears: Vec<_> = fx
        .store
        .detections(&fx.store.detection_ids().unwrap())
        .unwrap()
        .into_iter()
        .filter(|d| d.class.to_string() == "right ear")
        .map(|d| d.id)
        .collect();
    assert_eq!(right_ears.len(), 2);
    let class = EmbeddingClass::RightEar;

    let first = pipeline.extract(&right_ears, class, false).unwrap();
    assert_eq!(first.written, 2);
    let original = fx.store.embedding(right_ears[0], class).unwrap().unwrap();

    let again = pipeline.extract(&right_ears, class, false).unwrap();
    assert_eq!(again.written, 0);
    assert_eq!(again.existing, 2);
    let kept = fx.store.embedding(right_ears[0], class).unwrap().unwrap();
    assert_eq!(kept.id, original.id);

    let forced = pipeline.extract(&right_ears, class, true).unwrap();
    assert_eq!(forced.written, 2);
    assert_eq!(forced.existing, 0);
    let replaced = fx.store.embedding(right_ears[0], class).unwrap().unwrap();
    assert_ne!(replaced.id, original.id);
    assert_eq!(
        fx.store
            .embeddings_for_detections(&right_ears, class)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn test_zero_batch_size_detects_one_photo_per_call() {
    let fx = fixture();
    let store: Arc<dyn Store> = Arc::clone(&fx.store) as Arc<dyn Store>;
    let settings = PipelineSettings {
        batch_size: 0,
        ..PipelineSettings::default()
    };
    let pipeline = Pipeline::new(store, settings).with_detector(Arc::new(FakeDetector::ear(
        Arc::clone(&fx.ear_calls),
    )));
    assert_eq!(pipeline.settings().batch_size, 1);

    let summary = pipeline.detect(&fx.photos, false, &Discard).unwrap();

    assert_eq!(summary.photos, 2);
    assert_eq!(summary.detections, 4);
    assert_eq!(fx.ear_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_store_snapshot_survives_save_and_open() {
    let fx = fixture();
    let path = fx.dir.path().join("store.json");
    fx.store.save(&path).unwrap();

    let reopened = MemoryStore::open(&path).unwrap();
    assert_eq!(reopened.photo_ids().unwrap(), fx.photos);
    assert_eq!(reopened.sightings().unwrap().len(), 3);
    assert!(reopened.photo_by_name("a.png").unwrap().is_some());
}
