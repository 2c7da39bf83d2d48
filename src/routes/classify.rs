use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::AppState;
use crate::error::AppResult;
use crate::inference::adapter::{
    DiseaseClassification, SoilClassification, IMAGE_CHANNELS, IMAGE_SIDE,
};
use crate::inference::ModelKind;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassifyRequest {
    /// 224x224 RGB image, row-major NHWC, each channel scaled to [0, 1]
    pub pixels: Vec<f32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    pub kind: ModelKind,
    /// Name on the model server
    pub model: String,
    #[schema(value_type = String)]
    pub architecture: &'static str,
    #[schema(value_type = String)]
    pub task: &'static str,
    #[schema(value_type = Vec<String>)]
    pub purpose: &'static [&'static str],
    pub input_shape: Vec<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfoResponse {
    pub models: Vec<ModelDescription>,
    /// Sessions currently held by the process-wide cache
    pub loaded_sessions: u64,
}

/// Classify a soil photograph
#[utoipa::path(
    post,
    path = "/api/classify/soil",
    request_body = ClassifyRequest,
    responses(
        (status = 200, description = "Soil class with guidance", body = SoilClassification),
        (status = 400, description = "Malformed image"),
        (status = 502, description = "Model server failure"),
    ),
    tag = "classification"
)]
pub async fn classify_soil(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> AppResult<Json<SoilClassification>> {
    Ok(Json(state.predictor.classify_soil(request.pixels).await?))
}

/// Classify a leaf photograph
#[utoipa::path(
    post,
    path = "/api/classify/disease",
    request_body = ClassifyRequest,
    responses(
        (status = 200, description = "Leaf condition with guidance", body = DiseaseClassification),
        (status = 400, description = "Malformed image"),
        (status = 502, description = "Model server failure"),
    ),
    tag = "classification"
)]
pub async fn classify_disease(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> AppResult<Json<DiseaseClassification>> {
    Ok(Json(state.predictor.classify_disease(request.pixels).await?))
}

/// Models behind the prediction and classification endpoints
#[utoipa::path(
    get,
    path = "/api/model-info",
    responses(
        (status = 200, description = "Model descriptions", body = ModelInfoResponse),
    ),
    tag = "classification"
)]
pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfoResponse> {
    let config = &state.config;
    let image_shape = vec![IMAGE_SIDE, IMAGE_SIDE, IMAGE_CHANNELS];

    let models = vec![
        ModelDescription {
            kind: ModelKind::Xgboost,
            model: config.model_name(ModelKind::Xgboost).to_string(),
            architecture: "XGBoost + Random Forest",
            task: "Regression",
            purpose: &["Crop recommendations", "Yield estimation", "Soil optimisation"],
            input_shape: vec![crate::inference::features::FEATURE_COUNT],
        },
        ModelDescription {
            kind: ModelKind::Soil,
            model: config.model_name(ModelKind::Soil).to_string(),
            architecture: "MobileNet v2",
            task: "Image Classification",
            purpose: &["Soil type identification"],
            input_shape: image_shape.clone(),
        },
        ModelDescription {
            kind: ModelKind::Disease,
            model: config.model_name(ModelKind::Disease).to_string(),
            architecture: "MobileNet v2",
            task: "Image Classification",
            purpose: &["Plant disease detection"],
            input_shape: image_shape,
        },
    ];

    Json(ModelInfoResponse {
        models,
        loaded_sessions: state.predictor.sessions().loaded(),
    })
}
