pub mod classifier;
pub mod landmarker;
pub mod manager;
pub mod session;

pub use classifier::{GestureModel, OnnxClassifier};
pub use landmarker::{HandLandmarker, HandLandmarks, LandmarkExtractor, OnnxHandLandmarker};
pub use manager::{ModelManager, ModelSlot, ServiceStatus};
pub use session::TensorShape;
