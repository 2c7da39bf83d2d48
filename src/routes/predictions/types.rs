use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analytics::{AggregatedMetrics, Prediction};
use crate::inference::{Forecast, ForecastKind};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    /// One of `crop`, `irrigation`, `fertilizer`
    pub prediction_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub aggregated_data: AggregatedMetrics,
    pub predictions: Prediction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModelPredictionRequest {
    /// One of `yield`, `crop`, `soil`, `climate`
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModelPredictionResponse {
    pub kind: ForecastKind,
    pub aggregated_data: AggregatedMetrics,
    /// False when readings or weather were missing; confidence is then capped
    pub has_enough_data: bool,
    pub result: Forecast,
    /// True when the model was unreachable and `result` is a fallback estimate
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
