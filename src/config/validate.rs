//! Configuration validation.

use crate::config::{Config, DetectorModelConfig, EmbeddingModelConfig};
use crate::constants::models::MAX_INPUT_SIZE;
use crate::constants::{MAX_BATCH_SIZE, confidence};
use crate::error::{Error, Result};
use crate::inference::DetectorKind;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_pipeline(config)?;
    validate_scoring(config)?;
    for kind in [DetectorKind::Object, DetectorKind::Ear] {
        validate_detector_config(kind, config.models.detector(kind))?;
    }
    validate_embedding_config(&config.models.embedding)?;
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(format!(
            "{name} must be between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    let batch_size = config.pipeline.batch_size;
    if !(1..=MAX_BATCH_SIZE).contains(&batch_size) {
        return Err(invalid(format!(
            "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
        )));
    }
    check_unit(
        "subject_iou_threshold",
        config.association.subject_iou_threshold,
    )?;
    check_unit(
        "part_containment_threshold",
        config.association.part_containment_threshold,
    )
}

fn validate_scoring(config: &Config) -> Result<()> {
    let scoring = &config.scoring;
    for (name, value) in [
        ("seek_weight", scoring.seek_weight),
        ("right_ear_weight", scoring.right_ear_weight),
        ("left_ear_weight", scoring.left_ear_weight),
        ("wildcard_penalty", scoring.wildcard_penalty),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!(
                "{name} must be finite and non-negative, got {value}"
            )));
        }
    }
    if scoring.seek_weight + scoring.right_ear_weight + scoring.left_ear_weight <= 0.0 {
        return Err(invalid("at least one scoring weight must be positive".to_string()));
    }
    Ok(())
}

/// Validate one detector's settings and check its model file exists.
pub fn validate_detector_config(kind: DetectorKind, model: &DetectorModelConfig) -> Result<()> {
    if !(confidence::MIN..=confidence::MAX).contains(&model.min_confidence) {
        return Err(invalid(format!(
            "{kind} detector min_confidence must be between {} and {}, got {}",
            confidence::MIN,
            confidence::MAX,
            model.min_confidence
        )));
    }
    if !(1..=MAX_INPUT_SIZE).contains(&model.input_size) {
        return Err(invalid(format!(
            "{kind} detector input_size must be between 1 and {MAX_INPUT_SIZE}, got {}",
            model.input_size
        )));
    }
    kind.class_map().validate(model.class_count(kind))?;
    if let Some(path) = &model.path
        && !path.exists()
    {
        return Err(Error::ModelFileNotFound { path: path.clone() });
    }
    Ok(())
}

/// Validate the embedding model settings and check its file exists.
pub fn validate_embedding_config(model: &EmbeddingModelConfig) -> Result<()> {
    if !(1..=MAX_INPUT_SIZE).contains(&model.input_size) {
        return Err(invalid(format!(
            "embedding input_size must be between 1 and {MAX_INPUT_SIZE}, got {}",
            model.input_size
        )));
    }
    if let Some(path) = &model.path
        && !path.exists()
    {
        return Err(Error::ModelFileNotFound { path: path.clone() });
    }
    Ok(())
}
