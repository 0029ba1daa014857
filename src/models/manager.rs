use crate::gesture::{GestureLabelSet, GesturePipeline};
use crate::models::{GestureModel, HandLandmarker, OnnxClassifier, OnnxHandLandmarker};
use crate::utils::error::SignError;
use crate::{Config, Result};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of loading one model at startup. Fixed for the process lifetime.
pub enum ModelSlot<T: ?Sized> {
    Loaded(Arc<T>),
    Failed(String),
}

impl<T: ?Sized> ModelSlot<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelSlot::Loaded(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ModelSlot::Loaded(_) => None,
            ModelSlot::Failed(e) => Some(e.as_str()),
        }
    }

    fn get(&self) -> Option<&Arc<T>> {
        match self {
            ModelSlot::Loaded(model) => Some(model),
            ModelSlot::Failed(_) => None,
        }
    }
}

/// Owns the classifier and hand detector, both read-only after startup
pub struct ModelManager {
    classifier: ModelSlot<dyn GestureModel>,
    landmarker: ModelSlot<dyn HandLandmarker>,
    pipeline: Option<Arc<GesturePipeline>>,
}

impl ModelManager {
    /// Load both models. Failures are logged and recorded, never fatal.
    pub fn load(config: &Config) -> Self {
        tracing::info!("Initializing model manager...");

        let classifier = match OnnxClassifier::new(config) {
            Ok(model) => {
                tracing::info!("Model loaded successfully!");
                let model: Arc<dyn GestureModel> = Arc::new(model);
                ModelSlot::Loaded(model)
            }
            Err(e) => {
                tracing::error!("Error loading model: {}", e);
                ModelSlot::Failed(e.to_string())
            }
        };

        let landmarker = match OnnxHandLandmarker::new(config) {
            Ok(model) => {
                tracing::info!("Hand landmark model loaded successfully");
                let model: Arc<dyn HandLandmarker> = Arc::new(model);
                ModelSlot::Loaded(model)
            }
            Err(e) => {
                tracing::error!("Error loading hand landmark model: {}", e);
                ModelSlot::Failed(e.to_string())
            }
        };

        Self::from_parts(classifier, landmarker, config.server_config.max_request_size)
    }

    pub fn from_parts(
        classifier: ModelSlot<dyn GestureModel>,
        landmarker: ModelSlot<dyn HandLandmarker>,
        max_image_bytes: usize,
    ) -> Self {
        let pipeline = match (classifier.get(), landmarker.get()) {
            (Some(classifier), Some(landmarker)) => Some(Arc::new(GesturePipeline::new(
                Arc::clone(landmarker),
                Arc::clone(classifier),
                max_image_bytes,
            ))),
            _ => None,
        };

        Self {
            classifier,
            landmarker,
            pipeline,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_loaded()
    }

    pub fn landmarker_loaded(&self) -> bool {
        self.landmarker.is_loaded()
    }

    /// Pipeline ready to serve, or the reason it is not
    pub fn pipeline(&self) -> Result<Arc<GesturePipeline>> {
        if !self.classifier.is_loaded() {
            return Err(SignError::ModelNotLoaded);
        }
        self.pipeline
            .as_ref()
            .map(Arc::clone)
            .ok_or(SignError::LandmarkerNotLoaded)
    }

    pub fn status(&self) -> ServiceStatus {
        match &self.classifier {
            ModelSlot::Loaded(classifier) => ServiceStatus {
                status: "running",
                model_loaded: true,
                landmarker_loaded: self.landmarker_loaded(),
                model_input_shape: Some(classifier.input_shape().to_string()),
                classes: Some(GestureLabelSet.labels().to_vec()),
                error: self
                    .landmarker
                    .error()
                    .map(|e| format!("Hand landmark model not loaded correctly: {}", e)),
            },
            ModelSlot::Failed(e) => ServiceStatus {
                status: "running",
                model_loaded: false,
                landmarker_loaded: self.landmarker_loaded(),
                model_input_shape: None,
                classes: None,
                error: Some(format!("Model not loaded correctly: {}", e)),
            },
        }
    }
}

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub model_loaded: bool,
    pub landmarker_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_input_shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
