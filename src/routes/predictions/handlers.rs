use axum::{extract::State, Json};

use crate::analytics::{aggregate, recommend, PredictionType, ReadingSample};
use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::inference::{FeatureVector, Forecast, ForecastKind, Season};
use crate::services::readings::{
    climate_history, latest_readings_for_active_devices, latest_weather,
};

use super::types::{
    ModelPredictionRequest, ModelPredictionResponse, PredictionRequest, PredictionResponse,
};

/// Paired reading/weather samples averaged for a climate assessment.
const CLIMATE_HISTORY: u64 = 30;

/// Rule-based recommendation over the fleet's latest readings
#[utoipa::path(
    post,
    path = "/api/predictions",
    request_body = PredictionRequest,
    responses(
        (status = 200, description = "Aggregated data and recommendation", body = PredictionResponse),
        (status = 400, description = "Missing or unknown predictionType"),
        (status = 404, description = "No sensor data available"),
    ),
    tag = "predictions"
)]
pub async fn create_prediction(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> AppResult<Json<PredictionResponse>> {
    let kind: PredictionType = request
        .prediction_type
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("predictionType is required".to_string()))?
        .parse()?;

    let readings = latest_readings_for_active_devices(&state.db).await?;
    if readings.is_empty() {
        return Err(AppError::NoData("No sensor data available".to_string()));
    }

    let samples: Vec<ReadingSample> = readings.iter().map(ReadingSample::from).collect();
    let aggregated_data = aggregate(&samples);
    tracing::debug!(%kind, devices = samples.len(), "Computing recommendation");

    Ok(Json(PredictionResponse {
        predictions: recommend(kind, &aggregated_data),
        aggregated_data,
    }))
}

/// Model-backed forecast with a low-confidence fallback
///
/// When the model server fails the response still succeeds, with `error: true`
/// and a fallback `result`.
#[utoipa::path(
    post,
    path = "/api/predictions/model",
    request_body = ModelPredictionRequest,
    responses(
        (status = 200, description = "Forecast (possibly a fallback)", body = ModelPredictionResponse),
        (status = 400, description = "Missing or unknown kind"),
        (status = 404, description = "Climate assessment without any weather history"),
    ),
    tag = "predictions"
)]
pub async fn create_model_prediction(
    State(state): State<AppState>,
    Json(request): Json<ModelPredictionRequest>,
) -> AppResult<Json<ModelPredictionResponse>> {
    let kind: ForecastKind = request
        .kind
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("kind is required".to_string()))?
        .parse()?;

    let readings = latest_readings_for_active_devices(&state.db).await?;
    let weather = latest_weather(&state.db).await?;
    let has_enough_data = !readings.is_empty() && weather.is_some();

    let samples: Vec<ReadingSample> = readings.iter().map(ReadingSample::from).collect();
    let aggregated_data = aggregate(&samples);
    let features = FeatureVector::from_metrics(&aggregated_data, weather.as_ref(), Season::current());

    let predictor = &state.predictor;
    let outcome = match kind {
        ForecastKind::Yield => predictor
            .predict_yield(&features, has_enough_data)
            .await
            .map(Forecast::Yield),
        ForecastKind::Crop => predictor
            .predict_crop_suitability(&features, has_enough_data)
            .await
            .map(Forecast::Crop),
        ForecastKind::Soil => predictor
            .predict_soil_optimization(&aggregated_data, has_enough_data)
            .await
            .map(Forecast::Soil),
        ForecastKind::Climate => {
            let history = climate_history(&state.db, CLIMATE_HISTORY).await?;
            predictor
                .assess_climate_impact(&history, has_enough_data)
                .await
                .map(Forecast::Climate)
        }
    };

    let (result, message) = match outcome {
        Ok(result) => (result, None),
        Err(AppError::Inference(msg)) => {
            tracing::warn!(?kind, error = %msg, "Model prediction failed, using fallback");
            (Forecast::fallback(kind), Some(msg))
        }
        Err(e) => return Err(e),
    };

    Ok(Json(ModelPredictionResponse {
        kind,
        aggregated_data,
        has_enough_data,
        error: message.is_some(),
        result,
        message,
    }))
}
