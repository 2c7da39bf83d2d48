use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use chrono::Utc;
use tokio_stream::wrappers::ReceiverStream;

use crate::analytics::{aggregate, ReadingSample};
use crate::common::AppState;
use crate::entity::{devices, sensor_readings};
use crate::error::{AppError, AppResult};
use crate::services::{devices::find_device, readings};

use super::types::{
    HistoryQuery, NewSensorDataRequest, NewSensorDataResponse, ReadingResponse, SensorDataQuery,
    SensorDataResponse, SummaryResponse,
};

fn require_device_id(device_id: Option<&str>) -> AppResult<&str> {
    device_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("deviceId is required".to_string()))
}

async fn history(
    state: &AppState,
    query: &HistoryQuery,
) -> AppResult<(devices::Model, Vec<sensor_readings::Model>)> {
    let device = find_device(&state.db, require_device_id(query.device_id.as_deref())?).await?;
    let rows = readings::recent_readings(&state.db, device.id, query.window()).await?;
    Ok((device, rows))
}

/// Latest reading of one device
#[utoipa::path(
    get,
    path = "/api/sensor-data",
    params(SensorDataQuery),
    responses(
        (status = 200, description = "Device and its latest reading", body = SensorDataResponse),
        (status = 400, description = "Missing or malformed deviceId"),
        (status = 404, description = "Device not found"),
    ),
    tag = "sensor-data"
)]
pub async fn get_sensor_data(
    State(state): State<AppState>,
    Query(query): Query<SensorDataQuery>,
) -> AppResult<Json<SensorDataResponse>> {
    let device = find_device(&state.db, require_device_id(query.device_id.as_deref())?).await?;
    let latest = readings::latest_reading(&state.db, device.id).await?;

    Ok(Json(SensorDataResponse {
        device: device.into(),
        sensor_data: latest.map(ReadingResponse::from),
    }))
}

/// Store a reading and the weather at the device location
///
/// A weather provider failure does not fail the request; `weather` is null instead.
#[utoipa::path(
    post,
    path = "/api/sensor-data",
    request_body = NewSensorDataRequest,
    responses(
        (status = 201, description = "Reading stored", body = NewSensorDataResponse),
        (status = 400, description = "Invalid request or inactive device"),
        (status = 404, description = "Device not found"),
    ),
    tag = "sensor-data"
)]
pub async fn create_sensor_data(
    State(state): State<AppState>,
    Json(request): Json<NewSensorDataRequest>,
) -> AppResult<(StatusCode, Json<NewSensorDataResponse>)> {
    let device_id = require_device_id(request.device_id.as_deref())?;
    let payload = request
        .sensor_data
        .ok_or_else(|| AppError::BadRequest("sensorData is required".to_string()))?;

    let (fields, captured_at) = payload.into_parts();
    if fields.is_empty() {
        return Err(AppError::BadRequest(
            "sensorData carries no measurements".to_string(),
        ));
    }
    fields.validate()?;

    let device = find_device(&state.db, device_id).await?;
    if !device.is_active {
        return Err(AppError::BadRequest(format!(
            "Device '{device_id}' is inactive"
        )));
    }

    let recorded = readings::record_reading(
        &state.db,
        &state.weather,
        &device,
        &fields,
        captured_at.unwrap_or_else(Utc::now),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(NewSensorDataResponse {
            reading: recorded.reading.into(),
            weather: recorded.weather,
        }),
    ))
}

/// Device-level aggregate over its most recent readings
#[utoipa::path(
    get,
    path = "/api/sensor-data/summary",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Aggregated metrics", body = SummaryResponse),
        (status = 400, description = "Missing or malformed deviceId"),
        (status = 404, description = "Device not found or no readings"),
    ),
    tag = "sensor-data"
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<SummaryResponse>> {
    let (device, rows) = history(&state, &query).await?;
    if rows.is_empty() {
        return Err(AppError::NoData("No sensor data available".to_string()));
    }

    let samples: Vec<ReadingSample> = rows.iter().map(ReadingSample::from).collect();
    Ok(Json(SummaryResponse {
        device_id: device.device_id,
        readings: rows.len(),
        aggregated_data: aggregate(&samples),
    }))
}

/// Reading history as CSV, newest first
#[utoipa::path(
    get,
    path = "/api/sensor-data/export",
    params(HistoryQuery),
    responses(
        (status = 200, description = "CSV export", body = String, content_type = "text/csv"),
        (status = 400, description = "Missing or malformed deviceId"),
        (status = 404, description = "Device not found"),
    ),
    tag = "sensor-data"
)]
pub async fn export_sensor_data(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Response> {
    let (device, rows) = history(&state, &query).await?;
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Vec<u8>, std::io::Error>>(100);

    tokio::spawn(async move {
        let header = csv_record(&[
            "timestamp",
            "nitrogen",
            "phosphorous",
            "potassium",
            "moisture",
            "temperature",
        ]);
        if tx.send(header).await.is_err() {
            return;
        }

        for row in rows {
            let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
            let record = csv_record(&[
                row.timestamp.with_timezone(&Utc).to_rfc3339(),
                cell(row.nitrogen),
                cell(row.phosphorous),
                cell(row.potassium),
                cell(row.moisture),
                cell(row.temperature),
            ]);
            if tx.send(record).await.is_err() {
                break;
            }
        }
    });

    let disposition = format!("attachment; filename=\"{}.csv\"", device.device_id);
    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// One CSV line, quoted as needed.
fn csv_record<S: AsRef<[u8]>>(fields: &[S]) -> Result<Vec<u8>, std::io::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_must_be_present() {
        assert!(require_device_id(None).is_err());
        assert!(require_device_id(Some("  ")).is_err());
        assert_eq!(require_device_id(Some("SOIL_SENSOR_1")).unwrap(), "SOIL_SENSOR_1");
    }

    #[test]
    fn csv_lines_are_terminated_and_quoted() {
        let line = csv_record(&["2026-10-19T06:30:00+00:00", "40", "", "a,b"]).unwrap();
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "2026-10-19T06:30:00+00:00,40,,\"a,b\"\n"
        );
    }
}
