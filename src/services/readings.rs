//! Reading store: append-only sensor readings and their weather samples.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::{Npk, ReadingSample};
use crate::entity::{devices, sensor_readings, weather_samples};
use crate::error::{AppError, AppResult};
use crate::inference::ClimateObservation;
use crate::services::devices::list_active_devices;
use crate::weather::{WeatherClient, WeatherConditions};

/// Measured values of one reading; any field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadingFields {
    pub nitrogen: Option<f64>,
    pub phosphorous: Option<f64>,
    pub potassium: Option<f64>,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
}

impl ReadingFields {
    #[must_use]
    pub fn with_npk(mut self, npk: Npk) -> Self {
        self.nitrogen = Some(npk.nitrogen);
        self.phosphorous = Some(npk.phosphorous);
        self.potassium = Some(npk.potassium);
        self
    }

    /// Overlay every field present in `newer`.
    pub fn merge(&mut self, newer: &ReadingFields) {
        let pairs = [
            (&mut self.nitrogen, newer.nitrogen),
            (&mut self.phosphorous, newer.phosphorous),
            (&mut self.potassium, newer.potassium),
            (&mut self.moisture, newer.moisture),
            (&mut self.temperature, newer.temperature),
        ];
        for (slot, value) in pairs {
            if value.is_some() {
                *slot = value;
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for non-finite values, negative NPK, or
    /// moisture outside [0, 100].
    pub fn validate(&self) -> AppResult<()> {
        let all = [
            ("nitrogen", self.nitrogen),
            ("phosphorous", self.phosphorous),
            ("potassium", self.potassium),
            ("moisture", self.moisture),
            ("temperature", self.temperature),
        ];
        for (name, value) in all {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(AppError::BadRequest(format!("{name} must be a finite number")));
            }
        }

        for (name, value) in &all[..3] {
            if value.is_some_and(|v| v < 0.0) {
                return Err(AppError::BadRequest(format!("{name} must not be negative")));
            }
        }

        if self.moisture.is_some_and(|m| !(0.0..=100.0).contains(&m)) {
            return Err(AppError::BadRequest(
                "moisture must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wire shape of a full reading: nested NPK plus an optional capture time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, ToSchema)]
pub struct ReadingPayload {
    pub npk: Option<Npk>,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
    /// Defaults to the time of receipt
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReadingPayload {
    #[must_use]
    pub fn into_parts(self) -> (ReadingFields, Option<DateTime<Utc>>) {
        let fields = ReadingFields {
            moisture: self.moisture,
            temperature: self.temperature,
            ..ReadingFields::default()
        };
        let fields = match self.npk {
            Some(npk) => fields.with_npk(npk),
            None => fields,
        };
        (fields, self.timestamp)
    }
}

impl From<&sensor_readings::Model> for ReadingFields {
    fn from(r: &sensor_readings::Model) -> Self {
        Self {
            nitrogen: r.nitrogen,
            phosphorous: r.phosphorous,
            potassium: r.potassium,
            moisture: r.moisture,
            temperature: r.temperature,
        }
    }
}

/// Most recent reading of one device by capture time.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn latest_reading(
    db: &DatabaseConnection,
    device: Uuid,
) -> AppResult<Option<sensor_readings::Model>> {
    Ok(sensor_readings::Entity::find()
        .filter(sensor_readings::Column::DeviceId.eq(device))
        .order_by_desc(sensor_readings::Column::Timestamp)
        .one(db)
        .await?)
}

/// Latest reading of each active device; devices without readings are skipped.
///
/// # Errors
///
/// Returns an error if any database query fails.
pub async fn latest_readings_for_active_devices(
    db: &DatabaseConnection,
) -> AppResult<Vec<sensor_readings::Model>> {
    let devices = list_active_devices(db).await?;
    let latest = try_join_all(devices.iter().map(|d| latest_reading(db, d.id))).await?;
    Ok(latest.into_iter().flatten().collect())
}

/// Up to `limit` most recent readings of one device, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn recent_readings(
    db: &DatabaseConnection,
    device: Uuid,
    limit: u64,
) -> AppResult<Vec<sensor_readings::Model>> {
    Ok(sensor_readings::Entity::find()
        .filter(sensor_readings::Column::DeviceId.eq(device))
        .order_by_desc(sensor_readings::Column::Timestamp)
        .limit(limit)
        .all(db)
        .await?)
}

/// # Errors
///
/// Returns `AppError::BadRequest` for invalid fields, or a database error.
pub async fn append_reading(
    db: &DatabaseConnection,
    device: Uuid,
    fields: &ReadingFields,
    captured_at: DateTime<Utc>,
) -> AppResult<sensor_readings::Model> {
    fields.validate()?;

    let reading = sensor_readings::ActiveModel {
        id: Set(Uuid::new_v4()),
        device_id: Set(device),
        nitrogen: Set(fields.nitrogen),
        phosphorous: Set(fields.phosphorous),
        potassium: Set(fields.potassium),
        moisture: Set(fields.moisture),
        temperature: Set(fields.temperature),
        timestamp: Set(captured_at.into()),
    };
    Ok(reading.insert(db).await?)
}

/// # Errors
///
/// Returns an error if the insert fails.
pub async fn record_weather(
    db: &DatabaseConnection,
    reading: Uuid,
    conditions: &WeatherConditions,
) -> AppResult<weather_samples::Model> {
    let sample = weather_samples::ActiveModel {
        id: Set(Uuid::new_v4()),
        sensor_reading_id: Set(reading),
        temperature: Set(conditions.temperature),
        humidity: Set(conditions.humidity),
        wind_speed: Set(conditions.wind_speed),
        wind_direction: Set(conditions.wind_direction.clone()),
        precipitation: Set(conditions.precipitation),
        condition: Set(conditions.condition.clone()),
        timestamp: Set(Utc::now().into()),
    };
    Ok(sample.insert(db).await?)
}

/// A persisted reading and the weather captured alongside it, if any.
#[derive(Debug, Clone)]
pub struct RecordedReading {
    pub reading: sensor_readings::Model,
    pub weather: Option<WeatherConditions>,
}

/// Append a reading, then attach the weather at the device location.
///
/// The reading is committed first; a weather failure is logged and leaves it
/// in place with no weather sample.
///
/// # Errors
///
/// Returns an error only if the reading itself cannot be stored.
pub async fn record_reading(
    db: &DatabaseConnection,
    weather: &WeatherClient,
    device: &devices::Model,
    fields: &ReadingFields,
    captured_at: DateTime<Utc>,
) -> AppResult<RecordedReading> {
    let reading = append_reading(db, device.id, fields, captured_at).await?;
    tracing::debug!(device_id = %device.device_id, reading_id = %reading.id, "Stored reading");

    if !weather.is_configured() {
        return Ok(RecordedReading {
            reading,
            weather: None,
        });
    }

    let conditions = match weather.fetch(device.latitude, device.longitude).await {
        Ok(conditions) => conditions,
        Err(e) => {
            tracing::warn!(device_id = %device.device_id, error = %e, "Weather fetch failed");
            return Ok(RecordedReading {
                reading,
                weather: None,
            });
        }
    };

    if let Err(e) = record_weather(db, reading.id, &conditions).await {
        tracing::warn!(device_id = %device.device_id, error = %e, "Failed to store weather sample");
        return Ok(RecordedReading {
            reading,
            weather: None,
        });
    }

    Ok(RecordedReading {
        reading,
        weather: Some(conditions),
    })
}

/// Most recently stored weather sample across all devices.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn latest_weather(db: &DatabaseConnection) -> AppResult<Option<WeatherConditions>> {
    Ok(weather_samples::Entity::find()
        .order_by_desc(weather_samples::Column::Timestamp)
        .one(db)
        .await?
        .map(WeatherConditions::from))
}

/// Up to `limit` most recent readings of active devices that have a weather
/// sample, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn climate_history(
    db: &DatabaseConnection,
    limit: u64,
) -> AppResult<Vec<ClimateObservation>> {
    let rows = sensor_readings::Entity::find()
        .find_also_related(weather_samples::Entity)
        .join(JoinType::InnerJoin, sensor_readings::Relation::Device.def())
        .filter(devices::Column::IsActive.eq(true))
        .filter(weather_samples::Column::Id.is_not_null())
        .order_by_desc(sensor_readings::Column::Timestamp)
        .limit(limit)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(reading, weather)| {
            weather.map(|w| ClimateObservation {
                reading: ReadingSample::from(&reading),
                weather: WeatherConditions::from(w),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_earlier_values_for_absent_fields() {
        let mut frame = ReadingFields {
            moisture: Some(40.0),
            temperature: Some(28.0),
            ..ReadingFields::default()
        };
        let update = ReadingFields {
            temperature: Some(30.5),
            ..ReadingFields::default()
        }
        .with_npk(Npk {
            nitrogen: 50.0,
            phosphorous: 20.0,
            potassium: 80.0,
        });

        frame.merge(&update);
        assert_eq!(frame.moisture, Some(40.0));
        assert_eq!(frame.temperature, Some(30.5));
        assert_eq!(frame.potassium, Some(80.0));
    }

    #[test]
    fn validation_bounds() {
        let ok = ReadingFields {
            moisture: Some(100.0),
            temperature: Some(-4.0),
            ..ReadingFields::default()
        };
        assert!(ok.validate().is_ok());

        let wet = ReadingFields {
            moisture: Some(100.5),
            ..ReadingFields::default()
        };
        assert!(wet.validate().is_err());

        let negative = ReadingFields {
            phosphorous: Some(-1.0),
            ..ReadingFields::default()
        };
        assert!(negative.validate().is_err());

        let nan = ReadingFields {
            temperature: Some(f64::NAN),
            ..ReadingFields::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn empty_fields() {
        assert!(ReadingFields::default().is_empty());
        assert!(!ReadingFields {
            moisture: Some(0.0),
            ..ReadingFields::default()
        }
        .is_empty());
    }
}
