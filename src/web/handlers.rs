use crate::{
    gesture::{GesturePipeline, GesturePrediction},
    models::ServiceStatus,
    web::{
        extractors::{PredictRequest, RequestId},
        AppState,
    },
    Result,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde_json::Value;
use std::time::Instant;

/// `GET /status`: model health, never an error
pub async fn status_handler(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.models.status())
}

/// `POST /predict`
pub async fn predict_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<GesturePrediction>> {
    // Availability is checked before the body is looked at
    let pipeline = state.models.pipeline()?;
    let request = PredictRequest::from_payload(payload)?;

    let start_time = Instant::now();
    tracing::info!(
        "Processing prediction request: request_id={}, image_len={}",
        request_id,
        request.image.len()
    );

    let prediction = GesturePipeline::run(pipeline, request.image)
        .await
        .map_err(|e| {
            tracing::error!("Prediction error: request_id={}, {}", request_id, e);
            e
        })?;

    tracing::info!(
        "Prediction completed: request_id={}, gesture={}, confidence={:.4}, time={:.3}s",
        request_id,
        prediction.gesture,
        prediction.confidence,
        start_time.elapsed().as_secs_f32()
    );

    Ok(Json(prediction))
}
