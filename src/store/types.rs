//! Persisted record types.

use crate::geometry::BBox;
use crate::inference::{DetectionClass, DetectorKind, EmbeddingClass};
use crate::seek::TraitCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

id_type!(
    /// Photo identifier.
    PhotoId
);
id_type!(
    /// Ground-truth bounding box identifier.
    GroundTruthId
);
id_type!(
    /// Individual (identity) identifier.
    IndividualId
);
id_type!(
    /// Individual sighting identifier.
    SightingId
);
id_type!(
    /// Detection identifier.
    DetectionId
);
id_type!(
    /// Embedding identifier.
    EmbeddingId
);

/// A field photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    /// Identifier.
    pub id: PhotoId,
    /// Unique image name.
    pub name: String,
    /// Image file location.
    pub path: PathBuf,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

/// What a ground-truth box is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum BoxSubject {
    /// An individual sighting.
    Sighting(SightingId),
    /// An individual's profile photo.
    Individual(IndividualId),
    /// Drawn but not yet assigned.
    Unassigned,
}

/// A human-drawn box in normalized `x, y, w, h` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthBox {
    /// Identifier.
    pub id: GroundTruthId,
    /// Photo the box is drawn on.
    pub photo: PhotoId,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
    /// Owner of the box.
    pub subject: BoxSubject,
}

impl GroundTruthBox {
    /// Box in corner format.
    pub fn bbox(&self) -> BBox {
        BBox::from_xywh(self.x, self.y, self.w, self.h)
    }
}

/// An elephant identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Identifier.
    pub id: IndividualId,
    /// Unique name.
    pub name: String,
}

/// One elephant seen at one time and place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    /// Identifier.
    pub id: SightingId,
    /// Identity, once known.
    pub individual: Option<IndividualId>,
    /// When the sighting happened.
    pub observed_at: DateTime<Utc>,
    /// Observed trait code.
    pub seek: TraitCode,
}

/// A detector box, before it gets an identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewDetection {
    /// Class label.
    pub class: DetectionClass,
    /// Box in corner format.
    pub bbox: BBox,
    /// Detector confidence.
    pub confidence: f32,
}

/// A persisted detector box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Identifier.
    pub id: DetectionId,
    /// Source photo.
    pub photo: PhotoId,
    /// Class label; its detector family is implied.
    pub class: DetectionClass,
    /// Box in corner format.
    pub bbox: BBox,
    /// Detector confidence.
    pub confidence: f32,
    /// Associated ground-truth box, if any.
    pub ground_truth: Option<GroundTruthId>,
}

impl Detection {
    /// Detector family that produced this detection.
    pub const fn detector(&self) -> DetectorKind {
        self.class.detector()
    }
}

/// A normalized feature vector owned by one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Identifier.
    pub id: EmbeddingId,
    /// Owning detection.
    pub detection: DetectionId,
    /// Embedding family.
    pub class: EmbeddingClass,
    /// Zero-mean, unit-norm values.
    pub vector: Vec<f32>,
}

/// Whether a detector has run on a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorStatus {
    /// Never run.
    Unattempted,
    /// Ran and found nothing.
    Empty,
    /// Ran and stored detections.
    Populated,
}

/// Per-photo inference bookkeeping: detector family → detections stored on last run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlRecord {
    /// Photo the record belongs to.
    pub photo: PhotoId,
    /// Completed detector runs and their detection counts.
    pub runs: BTreeMap<DetectorKind, usize>,
}

impl MlRecord {
    /// Empty record for a photo.
    pub fn new(photo: PhotoId) -> Self {
        Self {
            photo,
            runs: BTreeMap::new(),
        }
    }

    /// Status of one detector family on this photo.
    pub fn status(&self, kind: DetectorKind) -> DetectorStatus {
        match self.runs.get(&kind) {
            None => DetectorStatus::Unattempted,
            Some(0) => DetectorStatus::Empty,
            Some(_) => DetectorStatus::Populated,
        }
    }
}

/// An evidence channel in the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// SEEK code similarity.
    Seek,
    /// Embedding similarity for one class.
    Embedding(EmbeddingClass),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seek => write!(f, "seek"),
            Self::Embedding(class) => write!(f, "{class}"),
        }
    }
}

/// One candidate row of a scoring result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// Dense rank by combined score; `None` when the combined score is NaN.
    pub rank: Option<usize>,
    /// Candidate identity.
    pub individual: IndividualId,
    /// Candidate name.
    pub name: String,
    /// Weighted combination of the channel scores.
    #[serde(with = "nan_as_null")]
    pub combined: f64,
    /// Raw channel scores, aligned with [`ScoringResult::channels`].
    #[serde(with = "nan_as_null::vec")]
    pub scores: Vec<f64>,
    /// Candidate's most recent trait code.
    pub seek_code: TraitCode,
}

/// Cached ranking of candidates for one query sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Query sighting.
    pub sighting: SightingId,
    /// When the ranking was computed.
    pub computed_at: DateTime<Utc>,
    /// Channel order of [`ScoreRow::scores`].
    pub channels: Vec<Channel>,
    /// Rows sorted by descending combined score.
    pub rows: Vec<ScoreRow>,
}

impl ScoringResult {
    /// Score of `channel` in `row`, NaN when the channel was not computed.
    pub fn channel_score(&self, row: &ScoreRow, channel: Channel) -> f64 {
        self.channels
            .iter()
            .position(|c| *c == channel)
            .and_then(|i| row.scores.get(i).copied())
            .unwrap_or(f64::NAN)
    }
}

/// JSON has no NaN: write it as `null` and read `null` back as NaN.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a float, writing NaN as `null`.
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(value)
        }
    }

    /// Deserialize a float, reading `null` as NaN.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }

    /// Same mapping for float vectors.
    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize floats, writing NaN as `null`.
        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| (!v.is_nan()).then_some(*v)))
        }

        /// Deserialize floats, reading `null` as NaN.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<f64>, D::Error> {
            Ok(Vec::<Option<f64>>::deserialize(deserializer)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect())
        }
    }
}
