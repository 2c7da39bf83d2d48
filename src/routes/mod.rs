pub mod classify;
pub mod health;
pub mod images;
pub mod messages;
pub mod predictions;
mod rate_limit;
pub mod recommendations;
pub mod sensor_data;
pub mod sensors;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::ClientIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

const BODY_LIMIT: usize = 1024 * 1024;
/// Classification requests carry a full 224x224x3 pixel array as JSON.
const IMAGE_BODY_LIMIT: usize = 8 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        health::readyz,
        sensors::list_devices,
        sensors::register_device,
        sensors::get_device,
        sensors::deactivate_device,
        sensor_data::get_sensor_data,
        sensor_data::create_sensor_data,
        sensor_data::get_summary,
        sensor_data::export_sensor_data,
        predictions::create_prediction,
        predictions::create_model_prediction,
        classify::classify_soil,
        classify::classify_disease,
        classify::model_info,
        images::record_soil_image,
        images::record_disease_image,
        recommendations::soil_recommendations,
        recommendations::disease_recommendations,
        messages::publish_message,
    ),
    components(
        schemas(
            sensors::DeviceResponse,
            sensors::DeviceDetailResponse,
            sensors::Location,
            sensor_data::ReadingResponse,
            sensor_data::NpkReading,
            sensor_data::SensorDataResponse,
            sensor_data::NewSensorDataRequest,
            sensor_data::NewSensorDataResponse,
            sensor_data::SummaryResponse,
            predictions::PredictionRequest,
            predictions::PredictionResponse,
            predictions::ModelPredictionRequest,
            predictions::ModelPredictionResponse,
            classify::ClassifyRequest,
            classify::ModelInfoResponse,
            classify::ModelDescription,
            images::ImageRecordRequest,
            images::ImageRecordResponse,
            recommendations::SoilAdvisoryResponse,
            recommendations::DiseaseAdvisoryResponse,
            messages::PublishRequest,
            messages::PublishResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sensors", description = "Device registration and lifecycle"),
        (name = "sensor-data", description = "Readings, summaries and exports"),
        (name = "predictions", description = "Rule-based and model-based recommendations"),
        (name = "classification", description = "Soil and leaf image classification"),
        (name = "images", description = "Classified image records"),
        (name = "recommendations", description = "Static agronomy guidance"),
        (name = "ingest", description = "Pub/sub sensor message bridge"),
    ),
    info(
        title = "AgriSense API",
        description = "Soil-sensor telemetry with agronomic recommendations",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            read_rate = %format!("{}/s burst {}", config.rate_limit_read_per_second, config.rate_limit_read_burst),
            write_rate = %format!("{}/s burst {}", config.rate_limit_write_per_second, config.rate_limit_write_burst),
            "Rate limiting configured"
        );
    }

    // Base routes without rate limiting
    let read_routes_base = Router::new()
        .route("/sensors", get(sensors::list_devices))
        .route("/sensors/{device_id}", get(sensors::get_device))
        .route("/sensor-data", get(sensor_data::get_sensor_data))
        .route("/sensor-data/summary", get(sensor_data::get_summary))
        .route("/sensor-data/export", get(sensor_data::export_sensor_data))
        .route("/model-info", get(classify::model_info))
        .route(
            "/recommendations/soil/{soil_type}",
            get(recommendations::soil_recommendations),
        )
        .route(
            "/recommendations/disease/{condition}",
            get(recommendations::disease_recommendations),
        );

    let write_routes_base = Router::new()
        .route("/sensors", post(sensors::register_device))
        .route("/sensors/{device_id}", delete(sensors::deactivate_device))
        .route("/sensor-data", post(sensor_data::create_sensor_data))
        .route("/predictions", post(predictions::create_prediction))
        .route(
            "/predictions/model",
            post(predictions::create_model_prediction),
        )
        .route("/soil-images", post(images::record_soil_image))
        .route("/disease-images", post(images::record_disease_image))
        .route("/messages", post(messages::publish_message));

    let image_routes_base = Router::new()
        .route("/classify/soil", post(classify::classify_soil))
        .route("/classify/disease", post(classify::classify_disease));

    // Combine API routes, conditionally applying rate limiting
    let (api_routes, image_routes) = if config.disable_rate_limiting {
        (
            Router::new().merge(read_routes_base).merge(write_routes_base),
            image_routes_base,
        )
    } else {
        let read_limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor)
            .per_second(config.rate_limit_read_per_second.max(1))
            .burst_size(config.rate_limit_read_burst.max(1))
            .finish()
            .expect("read rate limiter parameters are non-zero");

        let write_limiter = Arc::new(
            GovernorConfigBuilder::default()
                .key_extractor(ClientIpKeyExtractor)
                .per_second(config.rate_limit_write_per_second.max(1))
                .burst_size(config.rate_limit_write_burst.max(1))
                .finish()
                .expect("write rate limiter parameters are non-zero"),
        );

        (
            Router::new()
                .merge(read_routes_base.layer(GovernorLayer {
                    config: Arc::new(read_limiter),
                }))
                .merge(write_routes_base.layer(GovernorLayer {
                    config: write_limiter.clone(),
                })),
            image_routes_base.layer(GovernorLayer {
                config: write_limiter,
            }),
        )
    };

    let api_routes = api_routes
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .merge(
            image_routes
                .layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT))
                .layer(RequestBodyLimitLayer::new(IMAGE_BODY_LIMIT)),
        );

    // Health check routes (NO rate limiting)
    let health_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Combine all routes
    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
