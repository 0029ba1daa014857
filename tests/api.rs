use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::Engine;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use sign_gesture::{
    gesture::{FeatureTensor, NUM_LANDMARKS},
    models::{GestureModel, HandLandmarker, HandLandmarks, ModelManager, ModelSlot, TensorShape},
    web::{create_app, AppState},
    Config, Result, GESTURE_CLASSES,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Sees a hand whenever the top-left pixel is not black
#[derive(Default)]
struct PixelLandmarker {
    calls: AtomicUsize,
}

impl HandLandmarker for PixelLandmarker {
    fn detect(&self, image: &RgbImage) -> Result<Option<HandLandmarks>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.get_pixel(0, 0) == &Rgb([0, 0, 0]) {
            return Ok(None);
        }
        Ok(Some(HandLandmarks::new([[0.5, 0.5, 0.0]; NUM_LANDMARKS], 0.99)))
    }
}

/// Class "B" for a hand, class "A" for the no-hand sentinel
struct SentinelAwareClassifier;

impl GestureModel for SentinelAwareClassifier {
    fn input_shape(&self) -> TensorShape {
        TensorShape::from_dims(&[-1, 1, 63])
    }

    fn predict(&self, features: &FeatureTensor) -> Result<Vec<f32>> {
        assert_eq!(features.shape(), &[1, 1, 63]);
        let mut scores = vec![0.01; GESTURE_CLASSES.len()];
        let index = if features.flatten().is_no_hand() { 0 } else { 1 };
        scores[index] = 1.0 - 0.01 * (GESTURE_CLASSES.len() - 1) as f32;
        Ok(scores)
    }
}

struct FailingClassifier;

impl GestureModel for FailingClassifier {
    fn input_shape(&self) -> TensorShape {
        TensorShape::from_dims(&[1, 1, 63])
    }

    fn predict(&self, _features: &FeatureTensor) -> Result<Vec<f32>> {
        Err(sign_gesture::SignError::Inference("forward pass failed".to_string()))
    }
}

fn app_with(
    classifier: ModelSlot<dyn GestureModel>,
    landmarker: Arc<PixelLandmarker>,
) -> Router {
    let config = Config::default();
    let landmarker: Arc<dyn HandLandmarker> = landmarker;
    let models = ModelManager::from_parts(
        classifier,
        ModelSlot::Loaded(landmarker),
        config.server_config.max_request_size,
    );
    create_app(AppState::new(config, Arc::new(models)))
}

fn healthy_app(landmarker: Arc<PixelLandmarker>) -> Router {
    let classifier: Arc<dyn GestureModel> = Arc::new(SentinelAwareClassifier);
    app_with(ModelSlot::Loaded(classifier), landmarker)
}

fn data_uri(pixel: [u8; 3]) -> String {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb(pixel)))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn assert_valid_triple(body: &Value) {
    let index = body["class_index"].as_u64().unwrap() as usize;
    let confidence = body["confidence"].as_f64().unwrap();
    let gesture = body["gesture"].as_str().unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert_eq!(GESTURE_CLASSES[index], gesture);
}

#[tokio::test]
async fn status_reports_loaded_model() {
    let app = healthy_app(Arc::default());
    let (status, body) = send(
        app,
        Request::builder().uri("/status").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model_input_shape"], "(None, 1, 63)");
    assert_eq!(body["classes"].as_array().unwrap().len(), GESTURE_CLASSES.len());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn status_reports_unloaded_model_and_stays_constant() {
    let app = app_with(ModelSlot::Failed("missing file".to_string()), Arc::default());

    for _ in 0..2 {
        let (status, body) = send(
            app.clone(),
            Request::builder().uri("/status").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["model_loaded"], false);
        assert!(body["error"].as_str().unwrap().contains("missing file"));
        assert!(body.get("classes").is_none());
    }
}

#[tokio::test]
async fn predict_with_hand_returns_gesture() {
    let landmarker = Arc::new(PixelLandmarker::default());
    let app = healthy_app(Arc::clone(&landmarker));

    let (status, body) = send(app, predict_request(json!({"image": data_uri([220, 190, 170])}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gesture"], "B");
    assert_eq!(body["class_index"], 1);
    assert_valid_triple(&body);
    assert_eq!(landmarker.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn predict_without_hand_still_succeeds() {
    let app = healthy_app(Arc::default());

    let (status, body) = send(app, predict_request(json!({"image": data_uri([0, 0, 0])}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gesture"], "A");
    assert_valid_triple(&body);
}

#[tokio::test]
async fn predict_without_image_field_is_400() {
    let app = healthy_app(Arc::default());

    let (status, body) = send(app, predict_request(json!({"frame": "x"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No image data provided"}));
}

#[tokio::test]
async fn predict_with_malformed_json_is_400() {
    let app = healthy_app(Arc::default());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn predict_with_unloaded_model_is_503_and_skips_preprocessing() {
    let landmarker = Arc::new(PixelLandmarker::default());
    let app = app_with(
        ModelSlot::Failed("missing file".to_string()),
        Arc::clone(&landmarker),
    );

    let (status, body) = send(app, predict_request(json!({"image": data_uri([220, 190, 170])}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"error": "Model not loaded"}));
    assert_eq!(landmarker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn predict_with_undecodable_image_is_500() {
    let app = healthy_app(Arc::default());

    let (status, body) = send(
        app,
        predict_request(json!({"image": "data:image/png;base64,!!!not-base64!!!"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("base64"));
}

#[tokio::test]
async fn predict_with_headerless_image_is_500() {
    let landmarker = Arc::new(PixelLandmarker::default());
    let app = healthy_app(Arc::clone(&landmarker));
    let uri = data_uri([220, 190, 170]);
    let (_header, bare) = uri.split_once(',').unwrap();

    let (status, body) = send(app, predict_request(json!({"image": bare}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("comma"));
    assert_eq!(landmarker.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn inference_failure_is_500_with_message() {
    let classifier: Arc<dyn GestureModel> = Arc::new(FailingClassifier);
    let app = app_with(ModelSlot::Loaded(classifier), Arc::default());

    let (status, body) = send(app, predict_request(json!({"image": data_uri([220, 190, 170])}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("forward pass failed"));
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let app = healthy_app(Arc::default());
    let request = Request::builder()
        .uri("/status")
        .header(header::ORIGIN, "http://frontend.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn health_is_always_ok() {
    let app = app_with(ModelSlot::Failed("missing file".to_string()), Arc::default());
    let (status, body) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
