pub mod config;
pub mod gesture;
pub mod image;
pub mod models;
pub mod utils;
pub mod web;

// Re-export the main types
pub use config::Config;
pub use gesture::{GesturePrediction, GESTURE_CLASSES};
pub use utils::error::SignError;

pub type Result<T> = std::result::Result<T, SignError>;
