//! Request-level checks that need no database or upstream services.
//!
//! Run with: cargo test --test router_test

use agrisense::common::AppState;
use agrisense::config::Config;
use agrisense::ingest::message::decode;
use agrisense::ingest::{self, SensorMessage};
use agrisense::routes::build_router;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tokio::sync::mpsc::Receiver;
use tower::ServiceExt;

fn app() -> (Router, Receiver<SensorMessage>) {
    let config = Config {
        disable_rate_limiting: true,
        ..Config::default()
    };
    let (tx, rx) = ingest::queue(8);
    let state = AppState::new(DatabaseConnection::Disconnected, config, tx).unwrap();
    (build_router(state), rx)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn liveness_does_not_touch_database() {
    let (app, _rx) = app();
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readiness_fails_without_database() {
    let (app, _rx) = app();
    let response = app
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_prediction_type_is_rejected() {
    let (app, _rx) = app();
    let response = app
        .oneshot(post_json(
            "/api/predictions",
            &json!({ "predictionType": "harvest" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid prediction type: harvest");
}

#[tokio::test]
async fn sensor_history_requires_device_id() {
    let (app, _rx) = app();
    let response = app
        .oneshot(
            Request::get("/api/sensor-data/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_topic_is_rejected() {
    let (app, mut rx) = app();
    let response = app
        .oneshot(post_json(
            "/api/messages",
            &json!({ "topic": "sensors/SOIL_SENSOR_1/humidity", "payload": { "humidity": 1 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn valid_message_is_queued() {
    let (app, mut rx) = app();
    let response = app
        .oneshot(post_json(
            "/api/messages",
            &json!({ "topic": "sensors/SOIL_SENSOR_3/moisture", "payload": { "moisture": 41.5 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = json_body(response).await;
    assert_eq!(body["topic"], "sensors/SOIL_SENSOR_3/moisture");

    let message = rx.try_recv().unwrap();
    assert_eq!(message.topic.to_string(), "sensors/SOIL_SENSOR_3/moisture");
    let update = decode(message.topic.channel, &message.payload).unwrap();
    assert_eq!(update.fields.moisture, Some(41.5));
}

#[test]
fn unusable_prediction_ceiling_is_rejected_at_startup() {
    let config = Config {
        prediction_max_output: f64::NAN,
        ..Config::default()
    };
    let (tx, _rx) = ingest::queue(1);
    assert!(AppState::new(DatabaseConnection::Disconnected, config, tx).is_err());
}

#[tokio::test]
async fn soil_guidance_accepts_short_name() {
    let (app, _rx) = app();
    let response = app
        .oneshot(
            Request::get("/api/recommendations/soil/red")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["soilType"], "Red Soil");
    assert_eq!(body["suitableCrops"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn unknown_leaf_condition_is_not_found() {
    let (app, _rx) = app();
    let response = app
        .oneshot(
            Request::get("/api/recommendations/disease/rust")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
