use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or building the recipe corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("Column '{0}' not found")]
    MissingColumn(String),

    #[error("Corpus file not found at: {0:?}")]
    NotFound(PathBuf),

    #[error("No valid recipes loaded from {0:?}")]
    Empty(PathBuf),
}

/// Raised when the canonical vocabulary cannot be populated.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("Vocabulary unavailable: {0}")]
    Unavailable(#[source] CorpusError),

    #[error("Vocabulary unavailable: corpus yielded no ingredient names")]
    Empty,
}

/// Failures of an upstream detection source (vision model, free text).
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error {status}: {error_body}")]
    Api {
        status: reqwest::StatusCode,
        error_body: String,
    },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Model {0} does not accept images")]
    TextOnlyModel(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("Failed to read image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Failures estimating per-serving ingredient amounts.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("Invalid user profile: {0}")]
    InvalidProfile(String),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(crate::corpus::RecipeId),

    #[error("Recipe {0} has no ingredients to measure")]
    NoIngredients(crate::corpus::RecipeId),

    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Model(#[from] DetectionError),

    #[error("Could not parse measurements: {0}")]
    Parse(#[source] serde_json::Error),
}
