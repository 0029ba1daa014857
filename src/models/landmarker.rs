use crate::gesture::{LandmarkVector, LANDMARK_DIMS, LANDMARK_FEATURES, NUM_LANDMARKS};
use crate::image::{ImageTransforms, Letterbox};
use crate::models::session::{load_session, TensorShape};
use crate::utils::error::SignError;
use crate::{Config, Result};
use image::RgbImage;
use ndarray::{Array4, Axis};
use ort::{inputs, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::sync::Arc;

/// One detected hand: 21 keypoints with x / y normalized to the source image
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [[f32; LANDMARK_DIMS]; NUM_LANDMARKS],
    score: f32,
}

impl HandLandmarks {
    pub fn new(points: [[f32; LANDMARK_DIMS]; NUM_LANDMARKS], score: f32) -> Self {
        Self { points, score }
    }

    pub fn points(&self) -> &[[f32; LANDMARK_DIMS]; NUM_LANDMARKS] {
        &self.points
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Single-hand keypoint detector.
///
/// `Ok(None)` means no hand was found, which is an expected outcome.
/// `Err` is reserved for genuine faults.
pub trait HandLandmarker: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Option<HandLandmarks>>;
}

/// Turns detector output into the fixed-width feature vector
pub struct LandmarkExtractor;

impl LandmarkExtractor {
    pub fn extract(landmarker: &dyn HandLandmarker, image: &RgbImage) -> Result<LandmarkVector> {
        match landmarker.detect(image)? {
            Some(hand) => {
                tracing::debug!("Hand detected with score {:.3}", hand.score());
                Ok(LandmarkVector::from_points(hand.points()))
            }
            None => {
                tracing::warn!("No hand detected in the image");
                Ok(LandmarkVector::zeros())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
    /// (1, H, W, 3), the layout of TFLite conversions
    Nhwc,
    /// (1, 3, H, W)
    Nchw,
}

impl InputLayout {
    fn from_shape(shape: &TensorShape) -> Self {
        match shape.dims() {
            [_, Some(3), _, _] => InputLayout::Nchw,
            _ => InputLayout::Nhwc,
        }
    }

    fn spatial_size(self, shape: &TensorShape) -> Option<u32> {
        let side = match (self, shape.dims()) {
            (InputLayout::Nhwc, [_, h, _, _]) => *h,
            (InputLayout::Nchw, [_, _, h, _]) => *h,
            _ => None,
        };
        side.and_then(|s| u32::try_from(s).ok())
    }
}

/// Pick the screen-landmark output (first 63-wide tensor) and the hand
/// presence output (first single-value tensor). Falls back to positions 0
/// and 1 when the model does not declare shapes.
fn select_outputs(outputs: &[(String, TensorShape)]) -> Result<(String, Option<String>)> {
    let landmarks = outputs
        .iter()
        .find(|(_, shape)| shape.last() == Some(LANDMARK_FEATURES))
        .or_else(|| outputs.first())
        .map(|(name, _)| name.clone())
        .ok_or_else(|| SignError::ModelLoad("Hand landmark model has no outputs".to_string()))?;

    let presence = outputs
        .iter()
        .filter(|(name, _)| *name != landmarks)
        .find(|(_, shape)| shape.element_count() == Some(1))
        .or_else(|| outputs.iter().find(|(name, _)| *name != landmarks))
        .map(|(name, _)| name.clone());

    Ok((landmarks, presence))
}

/// Presence scores are probabilities in most exports; some emit raw logits
fn presence_probability(raw: f32) -> f32 {
    if (0.0..=1.0).contains(&raw) {
        raw
    } else {
        1.0 / (1.0 + (-raw).exp())
    }
}

/// Turn raw detector output into source-normalized landmarks.
/// A missing presence output counts as a certain detection.
fn decode_hand(
    raw_landmarks: &[f32],
    raw_presence: Option<f32>,
    letterbox: &Letterbox,
    min_confidence: f32,
) -> Result<Option<HandLandmarks>> {
    if raw_landmarks.len() < LANDMARK_FEATURES {
        return Err(SignError::Inference(format!(
            "Landmark output has {} values, expected at least {}",
            raw_landmarks.len(),
            LANDMARK_FEATURES
        )));
    }

    let score = raw_presence.map(presence_probability).unwrap_or(1.0);
    if score < min_confidence {
        tracing::debug!(
            "Hand presence {:.3} below threshold {:.3}",
            score,
            min_confidence
        );
        return Ok(None);
    }

    let mut points = [[0.0; LANDMARK_DIMS]; NUM_LANDMARKS];
    for (point, raw) in points
        .iter_mut()
        .zip(raw_landmarks.chunks_exact(LANDMARK_DIMS))
    {
        *point = letterbox.unproject(raw[0], raw[1], raw[2]);
    }

    Ok(Some(HandLandmarks::new(points, score)))
}

/// Hand landmark network run through ONNX Runtime
pub struct OnnxHandLandmarker {
    session: Arc<Mutex<Session>>,
    input_name: String,
    layout: InputLayout,
    input_size: u32,
    landmarks_output: String,
    presence_output: Option<String>,
    min_detection_confidence: f32,
}

impl OnnxHandLandmarker {
    pub fn new(config: &Config) -> Result<Self> {
        let session = load_session(
            &config.landmarker_model_path(),
            &config.onnx_config,
            "Hand landmark",
        )?;

        let input = session.inputs.first().ok_or_else(|| {
            SignError::ModelLoad("Hand landmark model has no inputs".to_string())
        })?;
        let input_name = input.name.clone();
        let input_shape = TensorShape::of(&input.input_type);
        let layout = InputLayout::from_shape(&input_shape);
        let input_size = layout
            .spatial_size(&input_shape)
            .filter(|s| *s > 0)
            .unwrap_or(config.landmarker_config.input_size);

        let outputs: Vec<(String, TensorShape)> = session
            .outputs
            .iter()
            .map(|o| (o.name.clone(), TensorShape::of(&o.output_type)))
            .collect();
        let (landmarks_output, presence_output) = select_outputs(&outputs)?;

        tracing::info!(
            "Hand landmark model ready: input '{}' {} ({:?}, {}px), landmarks '{}', presence {:?}",
            input_name,
            input_shape,
            layout,
            input_size,
            landmarks_output,
            presence_output
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            layout,
            input_size,
            landmarks_output,
            presence_output,
            min_detection_confidence: config.landmarker_config.min_detection_confidence,
        })
    }

    fn input_tensor(&self, image: &RgbImage) -> (Array4<f32>, Letterbox) {
        let (hwc, letterbox) = ImageTransforms::letterbox(image, self.input_size);
        let batched = match self.layout {
            InputLayout::Nhwc => hwc.insert_axis(Axis(0)),
            InputLayout::Nchw => hwc.permuted_axes([2, 0, 1]).insert_axis(Axis(0)),
        };
        (batched.as_standard_layout().into_owned(), letterbox)
    }
}

impl HandLandmarker for OnnxHandLandmarker {
    fn detect(&self, image: &RgbImage) -> Result<Option<HandLandmarks>> {
        let (input, letterbox) = self.input_tensor(image);
        let input_tensor = Tensor::from_array(input)?;

        // Extract owned data before the session lock is released
        let (raw_landmarks, raw_presence) = {
            let mut session = self.session.lock();
            let outputs = session.run(inputs![self.input_name.as_str() => input_tensor])?;

            let raw_landmarks: Vec<f32> = match outputs.get(self.landmarks_output.as_str()) {
                Some(output) => output.try_extract_array::<f32>()?.iter().copied().collect(),
                None => {
                    let available: Vec<String> = outputs.keys().map(|s| s.to_string()).collect();
                    return Err(SignError::Inference(format!(
                        "Landmark output '{}' not found. Available outputs: {:?}",
                        self.landmarks_output, available
                    )));
                }
            };

            let raw_presence = match self.presence_output.as_deref().and_then(|n| outputs.get(n)) {
                Some(output) => output.try_extract_array::<f32>()?.iter().next().copied(),
                None => None,
            };

            (raw_landmarks, raw_presence)
        };

        decode_hand(
            &raw_landmarks,
            raw_presence,
            &letterbox,
            self.min_detection_confidence,
        )
    }
}
