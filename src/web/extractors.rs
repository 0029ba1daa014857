use crate::utils::error::SignError;
use crate::Result;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts},
    http::request::Parts,
    Json,
};
use serde_json::Value;

/// Validated body of `POST /predict`
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    /// Data URI (or bare base64) of the frame
    pub image: String,
}

impl PredictRequest {
    /// Validate the raw JSON payload. The body is only parsed once the
    /// caller has confirmed the model is available.
    pub fn from_payload(payload: std::result::Result<Json<Value>, JsonRejection>) -> Result<Self> {
        let Json(value) = payload.map_err(|rejection| {
            SignError::InvalidInput(format!("Invalid JSON payload: {}", rejection.body_text()))
        })?;

        match value.get("image") {
            None | Some(Value::Null) => Err(SignError::MissingImage),
            Some(Value::String(image)) if image.trim().is_empty() => Err(SignError::MissingImage),
            Some(Value::String(image)) => Ok(Self {
                image: image.clone(),
            }),
            Some(other) => Err(SignError::InvalidInput(format!(
                "Field 'image' must be a string, got {}",
                json_type_name(other)
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Request ID from the `X-Request-ID` header, or a fresh UUID
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get("X-Request-ID")
            .and_then(|value| value.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Ok(RequestId(request_id))
    }
}
