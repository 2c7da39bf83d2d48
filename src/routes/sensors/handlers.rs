use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::common::AppState;
use crate::error::AppResult;
use crate::services::devices::{self, NewDevice};
use crate::services::readings::latest_reading;

use super::types::{DeviceDetailResponse, DeviceResponse};

/// List active devices
#[utoipa::path(
    get,
    path = "/api/sensors",
    responses(
        (status = 200, description = "Active devices in identifier order", body = Vec<DeviceResponse>),
    ),
    tag = "sensors"
)]
pub async fn list_devices(State(state): State<AppState>) -> AppResult<Json<Vec<DeviceResponse>>> {
    let active = devices::list_active_devices(&state.db).await?;
    Ok(Json(active.into_iter().map(DeviceResponse::from).collect()))
}

/// Register a device under the next free `SOIL_SENSOR_<n>` identifier
#[utoipa::path(
    post,
    path = "/api/sensors",
    request_body = NewDevice,
    responses(
        (status = 201, description = "Device registered", body = DeviceResponse),
        (status = 400, description = "Invalid name or coordinates"),
        (status = 409, description = "Identifier claimed by a concurrent registration"),
    ),
    tag = "sensors"
)]
pub async fn register_device(
    State(state): State<AppState>,
    Json(request): Json<NewDevice>,
) -> AppResult<(StatusCode, Json<DeviceResponse>)> {
    let device = devices::register_device(&state.db, request).await?;
    Ok((StatusCode::CREATED, Json(device.into())))
}

/// Device with its latest reading
#[utoipa::path(
    get,
    path = "/api/sensors/{device_id}",
    params(
        ("device_id" = String, Path, description = "Device identifier (SOIL_SENSOR_<n>)"),
    ),
    responses(
        (status = 200, description = "Device found", body = DeviceDetailResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "Device not found"),
    ),
    tag = "sensors"
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DeviceDetailResponse>> {
    let device = devices::find_device(&state.db, &device_id).await?;
    let latest = latest_reading(&state.db, device.id).await?;

    Ok(Json(DeviceDetailResponse {
        device: device.into(),
        latest_reading: latest.map(Into::into),
    }))
}

/// Deactivate a device; its readings are kept but no longer aggregated
#[utoipa::path(
    delete,
    path = "/api/sensors/{device_id}",
    params(
        ("device_id" = String, Path, description = "Device identifier (SOIL_SENSOR_<n>)"),
    ),
    responses(
        (status = 200, description = "Device deactivated", body = DeviceResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "Device not found"),
    ),
    tag = "sensors"
)]
pub async fn deactivate_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DeviceResponse>> {
    let device = devices::deactivate_device(&state.db, &device_id).await?;
    Ok(Json(device.into()))
}
