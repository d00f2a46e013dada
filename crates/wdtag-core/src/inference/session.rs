//! ONNX Runtime session management for WD tagger models.
//!
//! Loads a tagger exported to ONNX and runs it on preprocessed NHWC tensors,
//! returning the per-label sigmoid scores from the first output.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::{Value, ValueType};

use crate::error::InferenceError;

/// Wraps an ONNX Runtime session for a WD tagger.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct TaggerSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Square input size declared by the model, if static.
    declared_size: Option<u32>,
}

impl TaggerSession {
    /// Load a tagger model from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, InferenceError> {
        let session = Session::builder()
            .map_err(|e| {
                InferenceError::Runtime(format!("Failed to create ONNX session builder: {e}"))
            })?
            .commit_from_file(model_path)
            .map_err(|e| {
                InferenceError::Runtime(format!(
                    "Failed to load ONNX model {}: {e}",
                    model_path.display()
                ))
            })?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| InferenceError::Runtime("Model declares no inputs".to_string()))?;
        let input_name = input.name().to_string();

        // NHWC: [batch, height, width, channels]. Dynamic dims are reported as -1.
        let declared_size = match input.dtype() {
            ValueType::Tensor { shape, .. } => shape
                .get(1)
                .copied()
                .filter(|&d| d > 0)
                .and_then(|d| u32::try_from(d).ok()),
            _ => None,
        };

        tracing::debug!(
            "Loaded tagger model from {:?} (input: {:?}, size: {:?}, outputs: {:?})",
            model_path,
            input_name,
            declared_size,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            declared_size,
        })
    }

    /// Square input size from the model metadata, when it is not dynamic.
    pub fn declared_size(&self) -> Option<u32> {
        self.declared_size
    }

    /// Run inference on one preprocessed tensor and return the score row.
    ///
    /// Input shape: \[1, S, S, 3\] (NHWC, BGR, 0-255).
    /// Output: one score per vocabulary label.
    pub fn run(&self, tensor: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = tensor.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| InferenceError::Runtime(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Runtime(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| InferenceError::Runtime(format!("ONNX inference failed: {e}")))?;

        let (_, first) = outputs
            .iter()
            .next()
            .ok_or_else(|| InferenceError::Output("Model produced no outputs".to_string()))?;

        let (shape, data) = first
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Output(format!("Failed to extract scores: {e}")))?;

        // Scores come back as [1, N] (or occasionally a flat [N]).
        match shape.len() {
            1 => Ok(data.to_vec()),
            2 => {
                let n = shape[1] as usize;
                Ok(data[..n].to_vec())
            }
            _ => Err(InferenceError::Output(format!(
                "Unexpected score shape: {:?}",
                shape
            ))),
        }
    }
}
