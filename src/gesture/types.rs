use crate::utils::error::SignError;
use crate::Result;
use ndarray::Array3;
use serde::Serialize;
use std::fmt;

/// Number of keypoints the landmark model produces for one hand
pub const NUM_LANDMARKS: usize = 21;

/// Coordinates per keypoint (x, y, z)
pub const LANDMARK_DIMS: usize = 3;

/// Width of the classifier feature vector
pub const LANDMARK_FEATURES: usize = NUM_LANDMARKS * LANDMARK_DIMS;

/// Class labels in classifier output order. Index position is the class
/// identity: never reorder without retraining the model.
pub const GESTURE_CLASSES: [&str; 37] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
    "10",
];

/// Flattened hand landmarks: x0, y0, z0, x1, ... in landmark order.
/// All zeros means no hand was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkVector([f32; LANDMARK_FEATURES]);

impl LandmarkVector {
    /// The "no hand detected" sentinel
    pub fn zeros() -> Self {
        Self([0.0; LANDMARK_FEATURES])
    }

    pub fn from_points(points: &[[f32; LANDMARK_DIMS]; NUM_LANDMARKS]) -> Self {
        let mut values = [0.0; LANDMARK_FEATURES];
        for (chunk, point) in values.chunks_exact_mut(LANDMARK_DIMS).zip(points.iter()) {
            chunk.copy_from_slice(point);
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for the all-zero sentinel
    pub fn is_no_hand(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

/// Classifier input of shape (batch 1, sequence 1, 63 features)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor(Array3<f32>);

impl FeatureTensor {
    pub const SHAPE: [usize; 3] = [1, 1, LANDMARK_FEATURES];

    pub fn from_landmarks(landmarks: &LandmarkVector) -> Self {
        let values = landmarks.as_slice();
        Self(Array3::from_shape_fn(
            (1, 1, LANDMARK_FEATURES),
            |(_, _, i)| values[i],
        ))
    }

    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    /// Undo the reshape
    pub fn flatten(&self) -> LandmarkVector {
        let mut values = [0.0; LANDMARK_FEATURES];
        for (dst, src) in values.iter_mut().zip(self.0.iter()) {
            *dst = *src;
        }
        LandmarkVector(values)
    }

    pub fn into_array(self) -> Array3<f32> {
        self.0
    }
}

/// Classifier output with the derived top class
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub probabilities: Vec<f32>,
    pub class_index: usize,
    pub confidence: f32,
}

impl PredictionResult {
    /// Pick the most likely class. Scores that do not already form a
    /// probability distribution are treated as logits and softmaxed first.
    pub fn from_scores(scores: Vec<f32>) -> Result<Self> {
        if scores.is_empty() {
            return Err(SignError::Inference(
                "Classifier returned an empty output".to_string(),
            ));
        }
        if !scores.iter().any(|s| s.is_finite()) {
            return Err(SignError::Inference(
                "Classifier output contains no finite scores".to_string(),
            ));
        }

        let probabilities = if is_distribution(&scores) {
            scores
        } else {
            tracing::debug!("Classifier output is not normalized, applying softmax");
            softmax(&scores)
        };

        let (class_index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .ok_or_else(|| {
                SignError::Inference("Classifier output contains no finite scores".to_string())
            })?;

        Ok(Self {
            probabilities,
            class_index,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

/// Non-finite entries are ignored, as they are by the argmax
fn is_distribution(scores: &[f32]) -> bool {
    let finite = || scores.iter().copied().filter(|s| s.is_finite());
    let sum: f32 = finite().sum();
    finite().all(|p| (0.0..=1.0).contains(&p)) && (sum - 1.0).abs() < 1e-3
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores
        .iter()
        .map(|s| if s.is_finite() { (s - max).exp() } else { 0.0 })
        .collect();
    let total: f32 = exps.iter().sum();
    if total > 0.0 {
        exps.into_iter().map(|e| e / total).collect()
    } else {
        exps
    }
}

/// The fixed, ordered label set
#[derive(Debug, Clone, Copy, Default)]
pub struct GestureLabelSet;

impl GestureLabelSet {
    pub fn labels(&self) -> &'static [&'static str] {
        &GESTURE_CLASSES
    }

    pub fn len(&self) -> usize {
        GESTURE_CLASSES.len()
    }

    pub fn is_empty(&self) -> bool {
        GESTURE_CLASSES.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&'static str> {
        GESTURE_CLASSES.get(index).copied()
    }
}

/// Response body of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct GesturePrediction {
    pub class_index: usize,
    pub confidence: f32,
    pub gesture: String,
}

/// Stages of the request pipeline, used to tag failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    DataUri,
    Base64Decode,
    ImageDecode,
    LandmarkExtraction,
    Inference,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::DataUri => "data URI parsing",
            PipelineStage::Base64Decode => "base64 decoding",
            PipelineStage::ImageDecode => "image decoding",
            PipelineStage::LandmarkExtraction => "landmark extraction",
            PipelineStage::Inference => "inference",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> [[f32; 3]; NUM_LANDMARKS] {
        let mut points = [[0.0; 3]; NUM_LANDMARKS];
        for (i, p) in points.iter_mut().enumerate() {
            *p = [i as f32 * 0.01, 0.5, -0.02];
        }
        points
    }

    #[test]
    fn sentinel_has_63_zeros() {
        let v = LandmarkVector::zeros();
        assert_eq!(v.len(), 63);
        assert!(v.is_no_hand());
    }

    #[test]
    fn points_flatten_in_landmark_order() {
        let v = LandmarkVector::from_points(&sample_points());
        assert_eq!(v.len(), 63);
        assert_eq!(&v.as_slice()[3..6], &[0.01, 0.5, -0.02]);
        assert!(!v.is_no_hand());
    }

    #[test]
    fn reshape_is_lossless() {
        let v = LandmarkVector::from_points(&sample_points());
        let tensor = FeatureTensor::from_landmarks(&v);
        assert_eq!(tensor.shape(), &FeatureTensor::SHAPE);
        assert_eq!(tensor.flatten(), v);
        assert_eq!(FeatureTensor::from_landmarks(&tensor.flatten()), tensor);
    }

    #[test]
    fn argmax_of_distribution() {
        let mut scores = vec![0.0; 37];
        scores[4] = 0.7;
        scores[9] = 0.3;
        let result = PredictionResult::from_scores(scores).unwrap();
        assert_eq!(result.class_index, 4);
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn logits_are_softmaxed() {
        let result = PredictionResult::from_scores(vec![1.0, 5.0, -2.0]).unwrap();
        assert_eq!(result.class_index, 1);
        assert!(result.confidence > 0.9 && result.confidence <= 1.0);
        let total: f32 = result.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ties_keep_the_first_index() {
        let result = PredictionResult::from_scores(vec![0.5, 0.5]).unwrap();
        assert_eq!(result.class_index, 0);
    }

    #[test]
    fn nan_scores_are_skipped() {
        let result = PredictionResult::from_scores(vec![f32::NAN, 2.0, 1.0]).unwrap();
        assert_eq!(result.class_index, 1);
        assert!(PredictionResult::from_scores(vec![f32::NAN]).is_err());
        assert!(PredictionResult::from_scores(Vec::new()).is_err());
    }

    #[test]
    fn nan_does_not_force_a_second_softmax() {
        let result = PredictionResult::from_scores(vec![f32::NAN, 0.7, 0.3]).unwrap();
        assert_eq!(result.class_index, 1);
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn label_set_order() {
        let labels = GestureLabelSet;
        assert_eq!(labels.len(), 37);
        assert_eq!(labels.label(0), Some("A"));
        assert_eq!(labels.label(25), Some("Z"));
        assert_eq!(labels.label(26), Some("0"));
        assert_eq!(labels.label(36), Some("10"));
        assert_eq!(labels.label(37), None);
        assert_eq!(labels.labels(), &GESTURE_CLASSES[..]);
    }
}
