use crate::{
    gesture::{FeatureTensor, PipelineStage},
    image::ImageLoader,
    models::{HandLandmarker, LandmarkExtractor},
    utils::error::SignError,
    Result,
};

pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Data URI → decoded image → landmarks → (1, 1, 63) feature tensor.
    ///
    /// Every failure is logged with the stage and input size, then re-signalled
    /// as [`SignError::Preprocessing`].
    pub fn preprocess(
        image_data: &str,
        landmarker: &dyn HandLandmarker,
        max_image_bytes: usize,
    ) -> Result<FeatureTensor> {
        let input_len = image_data.len();
        let fail = move |stage: PipelineStage| {
            move |e: SignError| {
                tracing::error!(%stage, input_len, "Error in preprocessing: {}", e);
                e.at_stage(stage)
            }
        };

        let encoded = ImageLoader::strip_data_uri(image_data).map_err(fail(PipelineStage::DataUri))?;
        let bytes = ImageLoader::decode_base64(encoded, max_image_bytes)
            .map_err(fail(PipelineStage::Base64Decode))?;
        let image = ImageLoader::decode_image(&bytes).map_err(fail(PipelineStage::ImageDecode))?;

        let rgb = image.to_rgb8();
        let landmarks = LandmarkExtractor::extract(landmarker, &rgb)
            .map_err(fail(PipelineStage::LandmarkExtraction))?;
        tracing::debug!("Extracted {} landmark features", landmarks.len());

        let features = FeatureTensor::from_landmarks(&landmarks);
        tracing::debug!("Reshaped features to: {:?}", features.shape());

        Ok(features)
    }
}
