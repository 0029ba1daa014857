use crate::gesture::PipelineStage;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Hand landmark model not loaded")]
    LandmarkerNotLoaded,

    #[error("No image data provided")]
    MissingImage,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoded image too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Preprocessing failed during {stage}: {message}")]
    Preprocessing {
        stage: PipelineStage,
        message: String,
    },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl SignError {
    /// Re-signal a low-level fault as a preprocessing failure tagged with the
    /// stage it came from. Errors that already carry a stage are kept as is.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        match self {
            SignError::Preprocessing { .. } => self,
            other => SignError::Preprocessing {
                stage,
                message: other.to_string(),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SignError::MissingImage => StatusCode::BAD_REQUEST,
            SignError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SignError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            SignError::LandmarkerNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            SignError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SignError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            SignError::ModelNotLoaded => "MODEL_NOT_LOADED",
            SignError::LandmarkerNotLoaded => "LANDMARKER_NOT_LOADED",
            SignError::MissingImage => "MISSING_IMAGE",
            SignError::InvalidInput(_) => "INVALID_INPUT",
            SignError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            SignError::Preprocessing { .. } => "PREPROCESSING_ERROR",
            SignError::Inference(_) => "INFERENCE_ERROR",
            SignError::Config(_) => "CONFIG_ERROR",
            SignError::Io(_) => "IO_ERROR",
            SignError::Base64(_) => "BASE64_DECODE_ERROR",
            SignError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            SignError::Ort(_) => "ORT_ERROR",
            SignError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for SignError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });

        if status.is_server_error() {
            tracing::error!(code = self.error_code(), "Request failed: {} ({})", self, status);
        } else {
            tracing::warn!(code = self.error_code(), "Request rejected: {} ({})", self, status);
        }

        (status, axum::Json(body)).into_response()
    }
}
