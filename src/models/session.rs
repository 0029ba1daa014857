use crate::config::OnnxConfig;
use crate::utils::error::SignError;
use crate::Result;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::ValueType;
use std::fmt;
use std::path::Path;

/// Build an ONNX Runtime session for a model file
pub fn load_session(model_path: &Path, onnx_config: &OnnxConfig, kind: &str) -> Result<Session> {
    if !model_path.exists() {
        return Err(SignError::ModelLoad(format!(
            "{} model not found: {}",
            kind,
            model_path.display()
        )));
    }

    tracing::info!("Loading {} model from: {}", kind, model_path.display());

    let level = if onnx_config.enable_optimization {
        GraphOptimizationLevel::Level3
    } else {
        GraphOptimizationLevel::Disable
    };

    let session = Session::builder()?
        .with_optimization_level(level)?
        .with_intra_threads(onnx_config.intra_threads)?
        .commit_from_file(model_path)?;

    for (i, input) in session.inputs.iter().enumerate() {
        tracing::debug!(
            "{} input[{}]: '{}' {}",
            kind,
            i,
            input.name,
            TensorShape::of(&input.input_type)
        );
    }
    for (i, output) in session.outputs.iter().enumerate() {
        tracing::debug!(
            "{} output[{}]: '{}' {}",
            kind,
            i,
            output.name,
            TensorShape::of(&output.output_type)
        );
    }

    Ok(session)
}

/// Tensor shape as declared by a model; `None` marks a dynamic axis
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TensorShape(Vec<Option<usize>>);

impl TensorShape {
    pub fn from_dims(dims: &[i64]) -> Self {
        Self(
            dims.iter()
                .map(|d| if *d > 0 { Some(*d as usize) } else { None })
                .collect(),
        )
    }

    pub fn of(value_type: &ValueType) -> Self {
        value_type
            .tensor_shape()
            .map(|shape| Self::from_dims(shape))
            .unwrap_or_default()
    }

    pub fn dims(&self) -> &[Option<usize>] {
        &self.0
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied().flatten()
    }

    /// Element count, when every axis is fixed
    pub fn element_count(&self) -> Option<usize> {
        if self.0.is_empty() {
            return None;
        }
        self.0.iter().try_fold(1usize, |acc, d| d.map(|d| acc * d))
    }
}

impl fmt::Display for TensorShape {
    /// Renders like a Python tuple: `(None, 1, 63)`, `(63,)`, `()`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|d| match d {
                Some(d) => d.to_string(),
                None => "None".to_string(),
            })
            .collect();

        match parts.len() {
            1 => write!(f, "({},)", parts[0]),
            _ => write!(f, "({})", parts.join(", ")),
        }
    }
}
