use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entity::devices;
use crate::routes::sensor_data::ReadingResponse;

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub device_id: String,
    pub name: String,
    pub location: Location,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<devices::Model> for DeviceResponse {
    fn from(d: devices::Model) -> Self {
        Self {
            device_id: d.device_id,
            name: d.name,
            location: Location {
                latitude: d.latitude,
                longitude: d.longitude,
            },
            is_active: d.is_active,
            created_at: d.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailResponse {
    #[serde(flatten)]
    pub device: DeviceResponse,
    pub latest_reading: Option<ReadingResponse>,
}
