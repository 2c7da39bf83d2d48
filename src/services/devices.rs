//! Device registration and lifecycle.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, SqlErr,
};
use std::future::Future;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::devices;
use crate::error::{AppError, AppResult};

pub const DEVICE_ID_PREFIX: &str = "SOIL_SENSOR_";
const MAX_NAME_LEN: usize = 128;
/// Registrations racing for the same identifier retry this many times in total.
const REGISTER_ATTEMPTS: usize = 3;

/// Numeric suffix of a well-formed identifier (`SOIL_SENSOR_<digits>`).
#[must_use]
pub fn device_number(device_id: &str) -> Option<u64> {
    let digits = device_id.strip_prefix(DEVICE_ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// # Errors
///
/// Returns `AppError::BadRequest` unless `device_id` matches `SOIL_SENSOR_<digits>`.
pub fn validate_device_id(device_id: &str) -> AppResult<()> {
    device_number(device_id).map(|_| ()).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Invalid device ID '{device_id}': expected {DEVICE_ID_PREFIX}<number>"
        ))
    })
}

/// Identifier following the highest numeric suffix among `existing`.
pub fn next_device_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let next = existing
        .into_iter()
        .filter_map(device_number)
        .max()
        .map_or(1, |n| n + 1);
    format!("{DEVICE_ID_PREFIX}{next}")
}

/// Registration request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewDevice {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl NewDevice {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an empty name or out-of-range coordinates.
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Device name is required".to_string()));
        }
        if self.name.trim().chars().count() > MAX_NAME_LEN {
            return Err(AppError::BadRequest(format!(
                "Device name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::BadRequest(format!(
                "Latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::BadRequest(format!(
                "Longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Active devices in identifier order (numeric suffix, not lexicographic).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn list_active_devices(db: &DatabaseConnection) -> AppResult<Vec<devices::Model>> {
    let mut active = devices::Entity::find()
        .filter(devices::Column::IsActive.eq(true))
        .all(db)
        .await?;
    active.sort_by_key(|d| device_number(&d.device_id));
    Ok(active)
}

/// # Errors
///
/// Returns `AppError::BadRequest` for a malformed identifier and
/// `AppError::NotFound` when no device has it.
pub async fn find_device(db: &DatabaseConnection, device_id: &str) -> AppResult<devices::Model> {
    validate_device_id(device_id)?;
    devices::Entity::find()
        .filter(devices::Column::DeviceId.eq(device_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Device '{device_id}' not found")))
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Run `op` until it succeeds, retrying while `is_conflict` matches its error.
async fn retry_on_conflict<T, F, Fut>(
    attempts: usize,
    is_conflict: impl Fn(&DbErr) -> bool,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if is_conflict(&e) => {
                tracing::debug!(attempt, error = %e, "Device identifier taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(AppError::Conflict(
        "Device identifier was claimed concurrently, please retry".to_string(),
    ))
}

async fn insert_next_device(
    db: &DatabaseConnection,
    name: &str,
    latitude: f64,
    longitude: f64,
) -> Result<devices::Model, DbErr> {
    let existing: Vec<String> = devices::Entity::find()
        .select_only()
        .column(devices::Column::DeviceId)
        .into_tuple()
        .all(db)
        .await?;

    devices::ActiveModel {
        id: Set(Uuid::new_v4()),
        device_id: Set(next_device_id(existing.iter().map(String::as_str))),
        name: Set(name.to_string()),
        latitude: Set(latitude),
        longitude: Set(longitude),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
}

/// Create a device under the next free identifier.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for invalid input, `AppError::Conflict` when
/// concurrent registrations keep claiming the identifier, or a database error.
pub async fn register_device(
    db: &DatabaseConnection,
    request: NewDevice,
) -> AppResult<devices::Model> {
    request.validate()?;

    let name = request.name.trim();
    let (latitude, longitude) = (request.latitude, request.longitude);
    let device = retry_on_conflict(REGISTER_ATTEMPTS, is_unique_violation, move || {
        insert_next_device(db, name, latitude, longitude)
    })
    .await?;

    tracing::info!(device_id = %device.device_id, name = %device.name, "Registered device");
    Ok(device)
}

/// Mark a device inactive. Its readings are kept.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown device, or a database error.
pub async fn deactivate_device(
    db: &DatabaseConnection,
    device_id: &str,
) -> AppResult<devices::Model> {
    let device = find_device(db, device_id).await?;
    if !device.is_active {
        return Ok(device);
    }

    let mut active: devices::ActiveModel = device.into();
    active.is_active = Set(false);
    let device = active.update(db).await?;

    tracing::info!(device_id = %device.device_id, "Deactivated device");
    Ok(device)
}
