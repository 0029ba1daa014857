pub mod pipeline;
pub mod types;

pub use pipeline::GesturePipeline;
pub use types::{
    FeatureTensor, GestureLabelSet, GesturePrediction, LandmarkVector, PipelineStage,
    PredictionResult, GESTURE_CLASSES, LANDMARK_DIMS, LANDMARK_FEATURES, NUM_LANDMARKS,
};
