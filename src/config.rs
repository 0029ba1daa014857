use crate::utils::error::SignError;
use crate::Result;
use std::net::SocketAddr;
use std::path::PathBuf;

/// File name of the trained gesture classifier inside the models directory
pub const CLASSIFIER_MODEL_FILE: &str = "sign_language_model.onnx";

/// File name of the hand landmark network inside the models directory
pub const LANDMARKER_MODEL_FILE: &str = "hand_landmark.onnx";

#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (host:port)
    pub bind_addr: String,

    /// Directory holding the model files
    pub models_dir: PathBuf,

    /// Number of runtime worker threads
    pub workers: usize,

    /// Debug mode
    pub dev_mode: bool,

    /// ONNX Runtime settings
    pub onnx_config: OnnxConfig,

    /// HTTP server settings
    pub server_config: ServerConfig,

    /// Hand landmark detection settings
    pub landmarker_config: LandmarkerConfig,
}

#[derive(Debug, Clone)]
pub struct OnnxConfig {
    /// Intra-op CPU threads per session
    pub intra_threads: usize,

    /// Enable full graph optimization
    pub enable_optimization: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone)]
pub struct LandmarkerConfig {
    /// Side length of the square landmark model input, used when the model
    /// does not declare a fixed one
    pub input_size: u32,

    /// Minimum hand presence score for a detection to count
    pub min_detection_confidence: f32,
}

impl Default for LandmarkerConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            min_detection_confidence: 0.5,
        }
    }
}

impl Config {
    pub fn new(
        host: &str,
        port: u16,
        models_dir: impl Into<PathBuf>,
        workers: Option<usize>,
        dev_mode: bool,
        min_detection_confidence: f32,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&min_detection_confidence) {
            return Err(SignError::Config(format!(
                "min detection confidence must be within [0, 1], got {}",
                min_detection_confidence
            )));
        }

        let cpu_cores = num_cpus::get();
        let workers = workers.unwrap_or(cpu_cores).max(1);

        let onnx_config = OnnxConfig {
            intra_threads: (cpu_cores / 2).max(1),
            enable_optimization: true,
        };

        let server_config = ServerConfig {
            request_timeout: if dev_mode { 300 } else { 60 },
            max_request_size: 16 * 1024 * 1024, // 16MB
        };

        let config = Self {
            bind_addr: format!("{}:{}", host, port),
            models_dir: models_dir.into(),
            workers,
            dev_mode,
            onnx_config,
            server_config,
            landmarker_config: LandmarkerConfig {
                min_detection_confidence,
                ..LandmarkerConfig::default()
            },
        };

        config.socket_addr()?;
        Ok(config)
    }

    /// Parsed bind address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            SignError::Config(format!("Invalid bind address {}: {}", self.bind_addr, e))
        })
    }

    /// Path of the gesture classifier
    pub fn classifier_model_path(&self) -> PathBuf {
        self.models_dir.join(CLASSIFIER_MODEL_FILE)
    }

    /// Path of the hand landmark model
    pub fn landmarker_model_path(&self) -> PathBuf {
        self.models_dir.join(LANDMARKER_MODEL_FILE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            models_dir: PathBuf::from("models"),
            workers: 1,
            dev_mode: false,
            onnx_config: OnnxConfig {
                intra_threads: 1,
                enable_optimization: true,
            },
            server_config: ServerConfig {
                request_timeout: 60,
                max_request_size: 16 * 1024 * 1024,
            },
            landmarker_config: LandmarkerConfig::default(),
        }
    }
}
