use crate::{
    gesture::{GestureLabelSet, GesturePrediction, PipelineStage, PredictionResult},
    image::ImagePreprocessor,
    models::{GestureModel, HandLandmarker},
    utils::error::SignError,
    Result,
};
use std::sync::Arc;
use std::time::Instant;

/// Data URI in, gesture label out
pub struct GesturePipeline {
    landmarker: Arc<dyn HandLandmarker>,
    classifier: Arc<dyn GestureModel>,
    labels: GestureLabelSet,
    max_image_bytes: usize,
}

impl GesturePipeline {
    pub fn new(
        landmarker: Arc<dyn HandLandmarker>,
        classifier: Arc<dyn GestureModel>,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            landmarker,
            classifier,
            labels: GestureLabelSet,
            max_image_bytes,
        }
    }

    /// Run the whole pipeline on the blocking pool. A panic inside a model
    /// backend comes back as an internal error.
    pub async fn run(pipeline: Arc<Self>, image_data: String) -> Result<GesturePrediction> {
        tokio::task::spawn_blocking(move || pipeline.predict(&image_data))
            .await
            .map_err(|e| SignError::Internal(format!("Prediction task failed: {}", e)))?
    }

    pub fn predict(&self, image_data: &str) -> Result<GesturePrediction> {
        let start_time = Instant::now();

        let features = ImagePreprocessor::preprocess(
            image_data,
            self.landmarker.as_ref(),
            self.max_image_bytes,
        )?;
        let preprocessing_time = start_time.elapsed();
        tracing::debug!("Shape of features sent to model: {:?}", features.shape());

        let inference_start = Instant::now();
        let scores = self.classifier.predict(&features).map_err(|e| {
            tracing::error!(stage = %PipelineStage::Inference, "Prediction error: {}", e);
            e
        })?;
        let result = PredictionResult::from_scores(scores)?;
        let inference_time = inference_start.elapsed();

        let gesture = self.labels.label(result.class_index).ok_or_else(|| {
            SignError::Inference(format!(
                "Predicted class index {} is outside the label set of {} classes",
                result.class_index,
                self.labels.len()
            ))
        })?;

        tracing::info!(
            "Predicted class: {} ({}), confidence: {:.4}, preprocess={:.1}ms, inference={:.1}ms",
            result.class_index,
            gesture,
            result.confidence,
            preprocessing_time.as_secs_f64() * 1000.0,
            inference_time.as_secs_f64() * 1000.0,
        );

        Ok(GesturePrediction {
            class_index: result.class_index,
            confidence: result.confidence,
            gesture: gesture.to_string(),
        })
    }
}
