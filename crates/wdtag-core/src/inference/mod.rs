//! Model scoring.
//!
//! The classifier treats the model as an opaque function from a
//! `(1, S, S, 3)` tensor to one score per vocabulary label. [`InferenceEngine`]
//! is that seam; [`OnnxEngine`] is the ONNX Runtime implementation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wdtag_core::inference::{InferenceEngine, OnnxEngine};
//!
//! let engine = OnnxEngine::load(&config.model_path(), config.model.image_size)?;
//! let tensor = preprocess(&image, engine.input_size());
//! let scores = engine.score(&tensor)?;
//! ```

pub mod preprocess;
pub(crate) mod session;

use std::path::Path;

use ndarray::Array4;

use crate::error::InferenceError;

use self::preprocess::CHANNELS;
use self::session::TaggerSession;

pub use self::preprocess::preprocess;

/// A scoring backend: tensor in, per-label scores out.
///
/// The score vector must be aligned with the vocabulary the engine was built
/// for. Implementations must not swallow failures.
pub trait InferenceEngine: Send + Sync {
    /// Square input size the model expects.
    fn input_size(&self) -> u32;

    /// Score one `(1, S, S, 3)` tensor.
    fn score(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;

    /// Short human-readable model name for logs.
    fn name(&self) -> &str {
        "model"
    }
}

/// Shape every engine expects for a given input size.
pub fn expected_shape(input_size: u32) -> [usize; 4] {
    let s = input_size as usize;
    [1, s, s, CHANNELS]
}

/// Reject tensors that do not match `(1, S, S, 3)`.
pub fn check_shape(tensor: &Array4<f32>, input_size: u32) -> Result<(), InferenceError> {
    let expected = expected_shape(input_size);
    if tensor.shape() != &expected[..] {
        return Err(InferenceError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }
    Ok(())
}

/// ONNX Runtime-backed engine for WD tagger models.
pub struct OnnxEngine {
    session: TaggerSession,
    input_size: u32,
    name: String,
}

impl OnnxEngine {
    /// Load a model file.
    ///
    /// The input size is taken from the model metadata; `fallback_size` is
    /// used only when the model declares a dynamic spatial dimension.
    pub fn load(model_path: &Path, fallback_size: u32) -> Result<Self, InferenceError> {
        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.to_path_buf()));
        }

        tracing::info!("Loading tagger model from {:?}", model_path);
        let session = TaggerSession::load(model_path)?;

        let input_size = match session.declared_size() {
            Some(size) => size,
            None => {
                tracing::warn!(
                    "Model input size is dynamic; using configured size {}",
                    fallback_size
                );
                fallback_size
            }
        };

        let name = model_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.display().to_string());

        tracing::info!("Tagger model loaded ({}, input {}px)", name, input_size);

        Ok(Self {
            session,
            input_size,
            name,
        })
    }
}

impl InferenceEngine for OnnxEngine {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn score(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        check_shape(tensor, self.input_size)?;
        self.session.run(tensor)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
