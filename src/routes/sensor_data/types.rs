use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::analytics::AggregatedMetrics;
use crate::entity::sensor_readings;
use crate::routes::sensors::DeviceResponse;
use crate::services::readings::ReadingPayload;
use crate::weather::WeatherConditions;

/// Default and maximum number of readings in a history window.
pub const DEFAULT_HISTORY: u64 = 30;
pub const MAX_HISTORY: u64 = 500;

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct NpkReading {
    pub nitrogen: Option<f64>,
    pub phosphorous: Option<f64>,
    pub potassium: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadingResponse {
    pub id: Uuid,
    pub npk: NpkReading,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<sensor_readings::Model> for ReadingResponse {
    fn from(r: sensor_readings::Model) -> Self {
        Self {
            id: r.id,
            npk: NpkReading {
                nitrogen: r.nitrogen,
                phosphorous: r.phosphorous,
                potassium: r.potassium,
            },
            moisture: r.moisture,
            temperature: r.temperature,
            timestamp: r.timestamp.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataQuery {
    /// Device identifier (`SOIL_SENSOR_<n>`)
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub device_id: Option<String>,
    /// Number of most recent readings (default 30, max 500)
    pub limit: Option<u64>,
}

impl HistoryQuery {
    #[must_use]
    pub fn window(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataResponse {
    pub device: DeviceResponse,
    /// Latest reading, null when the device has not reported yet
    pub sensor_data: Option<ReadingResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSensorDataRequest {
    pub device_id: Option<String>,
    pub sensor_data: Option<ReadingPayload>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NewSensorDataResponse {
    pub reading: ReadingResponse,
    /// Null when the weather provider was unavailable
    pub weather: Option<WeatherConditions>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub device_id: String,
    pub readings: usize,
    pub aggregated_data: AggregatedMetrics,
}
