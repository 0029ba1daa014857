use crate::gesture::{FeatureTensor, GESTURE_CLASSES, LANDMARK_FEATURES};
use crate::models::session::{load_session, TensorShape};
use crate::utils::error::SignError;
use crate::{Config, Result};
use ort::{inputs, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::sync::Arc;

/// A trained classifier over the gesture label set
pub trait GestureModel: Send + Sync {
    /// Input shape as declared by the model
    fn input_shape(&self) -> TensorShape;

    /// Raw class scores for one (1, 1, 63) feature tensor
    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>>;
}

pub struct OnnxClassifier {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String, // discovered at load time
    input_shape: TensorShape,
}

impl OnnxClassifier {
    pub fn new(config: &Config) -> Result<Self> {
        let session = load_session(
            &config.classifier_model_path(),
            &config.onnx_config,
            "Gesture classifier",
        )?;

        let input = session.inputs.first().ok_or_else(|| {
            SignError::ModelLoad("Gesture classifier has no inputs".to_string())
        })?;
        let input_name = input.name.clone();
        let input_shape = TensorShape::of(&input.input_type);

        if let Some(width) = input_shape.last() {
            if width != LANDMARK_FEATURES {
                return Err(SignError::ModelLoad(format!(
                    "Gesture classifier expects {} features per step, landmarks provide {}",
                    width, LANDMARK_FEATURES
                )));
            }
        }

        let output = session.outputs.first().ok_or_else(|| {
            SignError::ModelLoad("Gesture classifier has no outputs".to_string())
        })?;
        let output_name = output.name.clone();
        let output_shape = TensorShape::of(&output.output_type);

        tracing::info!("Model input shape: {}", input_shape);
        tracing::info!("Model output shape: {}", output_shape);

        if let Some(classes) = output_shape.last() {
            if classes != GESTURE_CLASSES.len() {
                tracing::warn!(
                    "Classifier emits {} classes but the label set has {}; predictions past the label set will fail",
                    classes,
                    GESTURE_CLASSES.len()
                );
            }
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            input_shape,
        })
    }
}

impl GestureModel for OnnxClassifier {
    fn input_shape(&self) -> TensorShape {
        self.input_shape.clone()
    }

    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>> {
        let input_tensor = Tensor::from_array(features.clone().into_array())?;

        let predictions = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            match outputs.get(self.output_name.as_str()) {
                Some(output) => output.try_extract_array::<f32>()?.into_owned(),
                None => {
                    let available_outputs: Vec<String> =
                        outputs.keys().map(|s| s.to_string()).collect();
                    return Err(SignError::Inference(format!(
                        "Classifier output '{}' not found. Available outputs: {:?}",
                        self.output_name, available_outputs
                    )));
                }
            }
        };

        let shape = predictions.shape();
        tracing::debug!("Prediction shape: {:?}", shape);

        if shape.len() > 1 && shape[0] != 1 {
            return Err(SignError::Inference(format!(
                "Expected batch size 1 for classification, got {:?}",
                shape
            )));
        }

        Ok(predictions.iter().copied().collect())
    }
}
