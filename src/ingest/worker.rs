//! Consumer side of the ingest queue.

use chrono::Utc;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::{AppError, AppResult};
use crate::ingest::message::{decode, FieldUpdate, SensorMessage};
use crate::services::devices::find_device;
use crate::services::readings::{record_reading, ReadingFields};
use crate::weather::WeatherClient;

pub type IngestSender = mpsc::Sender<SensorMessage>;
pub type IngestReceiver = mpsc::Receiver<SensorMessage>;

#[must_use]
pub fn queue(capacity: usize) -> (IngestSender, IngestReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Enqueue without waiting.
///
/// # Errors
///
/// Returns `AppError::ServiceUnavailable` when the queue is full or the
/// worker has stopped.
pub fn publish(tx: &IngestSender, message: SensorMessage) -> AppResult<()> {
    tx.try_send(message).map_err(|e| match e {
        TrySendError::Full(m) => {
            tracing::warn!(topic = %m.topic, "Ingest queue full, rejecting message");
            AppError::ServiceUnavailable("Ingest queue is full".to_string())
        }
        TrySendError::Closed(_) => {
            AppError::ServiceUnavailable("Ingest worker is not running".to_string())
        }
    })
}

/// Most recent value seen on each channel, per device.
#[derive(Debug, Default)]
pub struct DeviceFrames {
    frames: HashMap<String, ReadingFields>,
}

impl DeviceFrames {
    /// Merge `update` into a copy of the device frame. The frame itself is
    /// left untouched until [`DeviceFrames::commit`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when the update or the merged snapshot
    /// fails validation.
    pub fn stage(&self, device_id: &str, update: &ReadingFields) -> AppResult<ReadingFields> {
        update.validate()?;
        let mut snapshot = self.frames.get(device_id).copied().unwrap_or_default();
        snapshot.merge(update);
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn commit(&mut self, device_id: &str, snapshot: ReadingFields) {
        self.frames.insert(device_id.to_string(), snapshot);
    }

    #[must_use]
    pub fn current(&self, device_id: &str) -> Option<&ReadingFields> {
        self.frames.get(device_id)
    }

    pub fn forget(&mut self, device_id: &str) {
        self.frames.remove(device_id);
    }
}

async fn handle(
    db: &DatabaseConnection,
    weather: &WeatherClient,
    frames: &mut DeviceFrames,
    message: &SensorMessage,
) -> AppResult<()> {
    let FieldUpdate {
        fields,
        captured_at,
    } = decode(message.topic.channel, &message.payload)?;
    let snapshot = frames.stage(&message.topic.device_id, &fields)?;

    let device = find_device(db, &message.topic.device_id).await?;
    if !device.is_active {
        frames.forget(&device.device_id);
        return Err(AppError::BadRequest(format!(
            "Device '{}' is inactive",
            device.device_id
        )));
    }

    let recorded = record_reading(
        db,
        weather,
        &device,
        &snapshot,
        captured_at.unwrap_or_else(Utc::now),
    )
    .await?;
    frames.commit(&device.device_id, snapshot);

    tracing::debug!(
        topic = %message.topic,
        reading_id = %recorded.reading.id,
        weather = recorded.weather.is_some(),
        "Ingested sensor message"
    );
    Ok(())
}

/// Drain the queue until every sender is dropped. Each message is handled
/// independently; failures are logged and the message dropped.
pub async fn run_ingest_worker(
    db: DatabaseConnection,
    weather: Arc<WeatherClient>,
    mut rx: IngestReceiver,
) {
    tracing::info!("Ingest worker started");
    let mut frames = DeviceFrames::default();

    while let Some(message) = rx.recv().await {
        if let Err(e) = handle(&db, &weather, &mut frames, &message).await {
            tracing::warn!(topic = %message.topic, error = %e, "Dropped sensor message");
        }
    }

    tracing::info!("Ingest worker stopped");
}
