//! Error types for tusker.

use crate::store::{DetectionId, IndividualId, PhotoId, SightingId};

/// Result type alias for tusker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for tusker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Failed to read the store snapshot.
    #[error("failed to read store '{path}'")]
    StoreRead {
        /// Path to the snapshot file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the store snapshot.
    #[error("failed to parse store '{path}'")]
    StoreParse {
        /// Path to the snapshot file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write the store snapshot.
    #[error("failed to write store '{path}'")]
    StoreWrite {
        /// Path to the snapshot file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Store state is inconsistent (poisoned lock or dangling reference).
    #[error("store is unavailable: {reason}")]
    StoreUnavailable {
        /// Description of the failure.
        reason: String,
    },

    /// Store is locked by another process.
    #[error("store is locked by another process: {path}")]
    StoreLocked {
        /// Path to the lock file.
        path: std::path::PathBuf,
    },

    /// Failed to create lock file.
    #[error("failed to create lock file '{path}'")]
    LockCreate {
        /// Path to the lock file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove lock file.
    #[error("failed to remove lock file '{path}'")]
    LockRemove {
        /// Path to the lock file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Photo does not exist.
    #[error("photo {id} not found")]
    PhotoNotFound {
        /// Missing photo id.
        id: PhotoId,
    },

    /// Sighting does not exist.
    #[error("sighting {id} not found")]
    SightingNotFound {
        /// Missing sighting id.
        id: SightingId,
    },

    /// Individual does not exist.
    #[error("individual {id} not found")]
    IndividualNotFound {
        /// Missing individual id.
        id: IndividualId,
    },

    /// Detection does not exist.
    #[error("detection {id} not found")]
    DetectionNotFound {
        /// Missing detection id.
        id: DetectionId,
    },

    /// Sighting has no cached scoring result.
    #[error("sighting {id} has not been scored (run `tusker score --sighting {id}`)")]
    NotScored {
        /// Unscored sighting id.
        id: SightingId,
    },

    /// A photo with the same unique name is already registered.
    #[error("photo name '{name}' is already registered")]
    DuplicatePhoto {
        /// Conflicting photo name.
        name: String,
    },

    /// An individual with the same unique name is already registered.
    #[error("individual name '{name}' is already registered")]
    DuplicateIndividual {
        /// Conflicting individual name.
        name: String,
    },

    /// Trait code text could not be parsed.
    #[error("invalid trait code '{code}': {reason}")]
    InvalidTraitCode {
        /// Offending input.
        code: String,
        /// Description of the problem.
        reason: String,
    },

    /// Failed to open or decode an image.
    #[error("failed to open image '{path}'")]
    ImageOpen {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying decode error.
        #[source]
        source: image::ImageError,
    },

    /// Detection crop is empty after scaling to pixel coordinates.
    #[error("empty crop for detection {id}")]
    EmptyCrop {
        /// Detection whose crop is empty.
        id: DetectionId,
    },

    /// Failed to load an inference model.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: std::path::PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: std::path::PathBuf,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Class map does not match the detector output cardinality.
    #[error("class map '{name}' covers {expected} classes but detector reports {actual}")]
    ClassMapMismatch {
        /// Class map name.
        name: &'static str,
        /// Classes covered by the map.
        expected: usize,
        /// Classes reported by the detector.
        actual: usize,
    },

    /// Embedding vectors of different dimensions were mixed.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimension {
        /// Dimension of the first vector seen.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Embedding vector cannot be normalized (empty or constant).
    #[error("degenerate embedding for detection {id}")]
    DegenerateEmbedding {
        /// Detection the vector was extracted from.
        id: DetectionId,
    },

    /// No extractor registered for an embedding class.
    #[error("no feature extractor registered for {class}")]
    ExtractorNotFound {
        /// Requested embedding class.
        class: crate::inference::EmbeddingClass,
    },

    /// Job queue receiver is gone.
    #[error("job queue is closed")]
    QueueClosed,

    /// Worker task failed to join.
    #[error("worker task failed: {reason}")]
    WorkerJoin {
        /// Description of the failure.
        reason: String,
    },

    /// Failed to read an import manifest.
    #[error("failed to parse import manifest '{path}'")]
    ManifestParse {
        /// Path to the manifest.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write CSV output.
    #[error("failed to write CSV output")]
    CsvWrite {
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output.
    #[error("failed to write JSON output")]
    JsonWrite {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}
