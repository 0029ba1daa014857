use crate::utils::error::SignError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};

pub struct ImageLoader;

impl ImageLoader {
    /// Strip the data URI header (`data:image/png;base64,`), keeping
    /// everything after the first comma. Input without a header is rejected.
    pub fn strip_data_uri(image_data: &str) -> Result<&str> {
        let payload = match image_data.trim().split_once(',') {
            Some((_header, payload)) => payload,
            None => {
                return Err(SignError::InvalidInput(
                    "Data URI has no comma-separated payload".to_string(),
                ));
            }
        };

        if payload.trim().is_empty() {
            return Err(SignError::InvalidInput("Empty image data".to_string()));
        }

        Ok(payload.trim())
    }

    /// Decode base64 text, enforcing the size limit on the decoded bytes.
    /// Line breaks from MIME-wrapped payloads are ignored.
    pub fn decode_base64(encoded: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let compact: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let image_bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;

        if image_bytes.len() > max_bytes {
            return Err(SignError::FileTooLarge(image_bytes.len(), max_bytes));
        }

        Ok(image_bytes)
    }

    /// Decode raw bytes into an image
    pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
        if let Some(format) = Self::detect_format(bytes) {
            if !Self::is_supported_format(format) {
                return Err(SignError::InvalidInput(format!(
                    "Unsupported image format: {:?}",
                    format
                )));
            }
        }

        let image = image::load_from_memory(bytes)?;
        let (width, height) = image.dimensions();
        tracing::debug!("Image decoded successfully, size: {}x{}", width, height);

        Ok(image)
    }

    pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(
            format,
            ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Bmp
                | ImageFormat::WebP
                | ImageFormat::Gif
        )
    }
}
