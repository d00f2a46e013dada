//! Error types for the wdtag tagging pipeline.
//!
//! Errors are split by how callers are expected to react:
//! - [`LoadError`]: the vocabulary is missing or malformed. Fatal at startup.
//! - [`InferenceError`]: the model rejected an input or is unavailable. Fatal
//!   for the single prediction that raised it.
//! - [`PipelineError`]: reading, decoding or writing a file failed. Bulk runs
//!   record these per file and keep going.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for wdtag operations.
#[derive(Error, Debug)]
pub enum TaggerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Vocabulary loading errors
    #[error("Label load error: {0}")]
    Load(#[from] LoadError),

    /// Model inference errors
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// File-level pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while loading the label vocabulary.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The vocabulary file could not be read
    #[error("Cannot read vocabulary {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV could not be parsed
    #[error("Malformed vocabulary CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row
    #[error("Vocabulary is missing required column `{0}`")]
    MissingColumn(&'static str),

    /// A row has an unusable value
    #[error("Invalid vocabulary row {row}: {message}")]
    InvalidRow { row: usize, message: String },

    /// The vocabulary has a header but no labels
    #[error("Vocabulary contains no labels")]
    Empty,
}

/// Errors raised by the inference backend.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model file does not exist
    #[error("Model not found at {0}")]
    ModelNotFound(PathBuf),

    /// The ONNX session could not be created or run
    #[error("ONNX runtime error: {0}")]
    Runtime(String),

    /// The tensor handed to the model has the wrong shape
    #[error("Input tensor shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The model produced a score vector that does not line up with the vocabulary
    #[error("Model returned {actual} scores but the vocabulary has {expected} labels")]
    OutputLength { expected: usize, actual: usize },

    /// The model output could not be interpreted
    #[error("Unexpected model output: {0}")]
    Output(String),
}

/// File-level processing errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Sidecar read failed
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Sidecar write failed
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported image format
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Bulk input is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Convenience type alias for wdtag results.
pub type Result<T> = std::result::Result<T, TaggerError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
