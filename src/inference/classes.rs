//! Detector vocabularies and embedding classes.
//!
//! Detector output indices are mapped through explicit tables that are
//! checked against the model's reported class count when a detector is built.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detector families. Each owns one vocabulary and one completion flag per photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// General-purpose object detector (COCO vocabulary).
    Object,
    /// Species-specific ear detector.
    Ear,
}

impl DetectorKind {
    /// Vocabulary for this detector family.
    pub const fn class_map(self) -> &'static ClassMap {
        match self {
            Self::Object => &OBJECT_CLASSES,
            Self::Ear => &EAR_CLASSES,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Ear => write!(f, "ear"),
        }
    }
}

/// Which ear a detection covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarSide {
    /// Left ear.
    Left,
    /// Right ear.
    Right,
}

/// How a detection class is matched against ground-truth boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    /// Covers a whole animal; matched by IoU.
    WholeSubject,
    /// Covers part of an animal; matched by containment.
    AnatomicalPart,
    /// Never associated.
    Unmatched,
}

/// Class label attached to a detection, discriminated by detector family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionClass {
    /// Target species from the object detector.
    Elephant,
    /// Any other object detector class.
    OtherObject {
        /// Raw detector class index.
        class_id: u32,
    },
    /// Ear from the ear detector.
    Ear {
        /// Ear side.
        side: EarSide,
    },
}

impl DetectionClass {
    /// Detector family that produces this class.
    pub const fn detector(self) -> DetectorKind {
        match self {
            Self::Elephant | Self::OtherObject { .. } => DetectorKind::Object,
            Self::Ear { .. } => DetectorKind::Ear,
        }
    }

    /// Association vocabulary for this class.
    pub const fn vocabulary(self) -> Vocabulary {
        match self {
            Self::Elephant => Vocabulary::WholeSubject,
            Self::Ear { .. } => Vocabulary::AnatomicalPart,
            Self::OtherObject { .. } => Vocabulary::Unmatched,
        }
    }
}

impl fmt::Display for DetectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elephant => write!(f, "elephant"),
            Self::OtherObject { class_id } => write!(f, "object#{class_id}"),
            Self::Ear {
                side: EarSide::Left,
            } => write!(f, "left ear"),
            Self::Ear {
                side: EarSide::Right,
            } => write!(f, "right ear"),
        }
    }
}

/// Lookup table from detector output index to [`DetectionClass`].
#[derive(Debug)]
pub struct ClassMap {
    name: &'static str,
    cardinality: usize,
    named: &'static [(u32, DetectionClass)],
    keep_unnamed: bool,
}

/// COCO-80 object vocabulary; only the target species is named.
pub static OBJECT_CLASSES: ClassMap = ClassMap {
    name: "object",
    cardinality: 80,
    named: &[(20, DetectionClass::Elephant)],
    keep_unnamed: true,
};

/// Ear detector vocabulary; index 0 is background.
pub static EAR_CLASSES: ClassMap = ClassMap {
    name: "ear",
    cardinality: 3,
    named: &[
        (
            1,
            DetectionClass::Ear {
                side: EarSide::Left,
            },
        ),
        (
            2,
            DetectionClass::Ear {
                side: EarSide::Right,
            },
        ),
    ],
    keep_unnamed: false,
};

impl ClassMap {
    /// Map name used in logs and errors.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of detector output classes the map covers.
    pub const fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Resolve a detector output index; `None` for background or out-of-range ids.
    pub fn lookup(&self, class_id: u32) -> Option<DetectionClass> {
        if class_id as usize >= self.cardinality {
            return None;
        }
        self.named
            .iter()
            .find(|(id, _)| *id == class_id)
            .map(|(_, class)| *class)
            .or_else(|| {
                self.keep_unnamed
                    .then_some(DetectionClass::OtherObject { class_id })
            })
    }

    /// Check the map against a detector's output class count.
    pub fn validate(&self, detector_classes: usize) -> Result<()> {
        if detector_classes != self.cardinality {
            return Err(Error::ClassMapMismatch {
                name: self.name,
                expected: self.cardinality,
                actual: detector_classes,
            });
        }
        Ok(())
    }
}

/// Embedding families, tagged with their persisted numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingClass {
    /// Right-ear pattern embedding.
    RightEar = 1,
    /// Left-ear pattern embedding.
    LeftEar = 2,
}

impl EmbeddingClass {
    /// All embedding classes in scoring order.
    pub const ALL: [Self; 2] = [Self::RightEar, Self::LeftEar];

    /// Persisted numeric code.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EmbeddingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RightEar => write!(f, "right_ear"),
            Self::LeftEar => write!(f, "left_ear"),
        }
    }
}

impl std::str::FromStr for EmbeddingClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "right_ear" | "right" | "1" => Ok(Self::RightEar),
            "left_ear" | "left" | "2" => Ok(Self::LeftEar),
            other => Err(format!("unknown embedding class: {other}")),
        }
    }
}
