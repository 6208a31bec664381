//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "tusker";

/// Default store snapshot file name (inside the data directory).
pub const DEFAULT_STORE_FILE: &str = "store.json";

/// Lock file extension appended to the store path.
pub const LOCK_FILE_EXTENSION: &str = ".tusker.lock";

/// Default batch size for detector inference.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Maximum allowed batch size to prevent memory exhaustion.
pub const MAX_BATCH_SIZE: usize = 512;

/// Association thresholds.
pub mod association {
    /// Minimum IoU for a whole-subject detection to claim a ground-truth box.
    pub const SUBJECT_IOU_THRESHOLD: f32 = 0.7;

    /// Containment ratio a part detection must exceed inside a ground-truth box.
    pub const PART_CONTAINMENT_THRESHOLD: f32 = 0.9;
}

/// Scoring weights and parameters.
pub mod scoring {
    /// Weight of the SEEK code channel.
    pub const SEEK_WEIGHT: f64 = 1.0;

    /// Weight of the right-ear embedding channel.
    pub const RIGHT_EAR_WEIGHT: f64 = 0.25;

    /// Weight of the left-ear embedding channel.
    pub const LEFT_EAR_WEIGHT: f64 = 0.25;

    /// Penalty per unit fraction of wildcard slots in a database code.
    pub const WILDCARD_PENALTY: f64 = 0.4;
}

/// Trait code constants.
pub mod seek {
    /// Number of trait slots in a code.
    pub const SLOTS: usize = 17;

    /// Length of the rendered code including section markers.
    pub const DISPLAY_LEN: usize = 22;

    /// Wildcard symbol for an unknown slot.
    pub const WILDCARD: char = '?';
}

/// Model defaults.
pub mod models {
    /// Default square input size for detectors.
    pub const DETECTOR_INPUT_SIZE: u32 = 640;

    /// Default square input size for the embedding model.
    pub const EMBEDDING_INPUT_SIZE: u32 = 224;

    /// Largest accepted square input size for any model.
    pub const MAX_INPUT_SIZE: u32 = 4096;

    /// Default minimum detector confidence.
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;

    /// Values per detector output row: `xc, yc, w, h, confidence, class_id`.
    pub const DETECTION_ROW_LEN: usize = 6;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Decimal places for score formatting.
    pub const DECIMAL_PLACES: usize = 3;
}
