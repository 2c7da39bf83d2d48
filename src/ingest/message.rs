//! Topic grammar and payload decoding for sensor messages.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;

use crate::analytics::Npk;
use crate::error::AppError;
use crate::services::devices::device_number;
use crate::services::readings::{ReadingFields, ReadingPayload};

pub const TOPIC_ROOT: &str = "sensors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Npk,
    Moisture,
    Temperature,
    Reading,
}

impl Channel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Npk => "npk",
            Self::Moisture => "moisture",
            Self::Temperature => "temperature",
            Self::Reading => "reading",
        }
    }
}

/// `sensors/<deviceId>/<channel>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub device_id: String,
    pub channel: Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Invalid topic '{0}': expected sensors/<deviceId>/<npk|moisture|temperature|reading>")]
    InvalidTopic(String),
    #[error("Malformed {channel} payload: {reason}")]
    MalformedPayload {
        channel: &'static str,
        reason: String,
    },
}

impl From<MessageError> for AppError {
    fn from(e: MessageError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl FromStr for Topic {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MessageError::InvalidTopic(s.to_string());

        let mut parts = s.split('/');
        let (Some(TOPIC_ROOT), Some(device_id), Some(channel), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        device_number(device_id).ok_or_else(invalid)?;
        let channel = match channel {
            "npk" => Channel::Npk,
            "moisture" => Channel::Moisture,
            "temperature" => Channel::Temperature,
            "reading" => Channel::Reading,
            _ => return Err(invalid()),
        };

        Ok(Self {
            device_id: device_id.to_string(),
            channel,
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TOPIC_ROOT}/{}/{}", self.device_id, self.channel.as_str())
    }
}

/// A message waiting in the ingest queue. The payload is decoded by the worker.
#[derive(Debug, Clone)]
pub struct SensorMessage {
    pub topic: Topic,
    pub payload: serde_json::Value,
}

/// Decoded contribution of one message to a device frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldUpdate {
    pub fields: ReadingFields,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct MoistureBody {
    moisture: f64,
}

#[derive(Deserialize)]
struct TemperatureBody {
    temperature: f64,
}

fn parse<T: DeserializeOwned>(
    channel: Channel,
    payload: &serde_json::Value,
) -> Result<T, MessageError> {
    T::deserialize(payload).map_err(|e| MessageError::MalformedPayload {
        channel: channel.as_str(),
        reason: e.to_string(),
    })
}

/// # Errors
///
/// Returns `MessageError::MalformedPayload` when the payload does not have
/// the shape required by `channel` or carries no measurement.
pub fn decode(channel: Channel, payload: &serde_json::Value) -> Result<FieldUpdate, MessageError> {
    let update = match channel {
        Channel::Npk => FieldUpdate {
            fields: ReadingFields::default().with_npk(parse::<Npk>(channel, payload)?),
            captured_at: None,
        },
        Channel::Moisture => FieldUpdate {
            fields: ReadingFields {
                moisture: Some(parse::<MoistureBody>(channel, payload)?.moisture),
                ..ReadingFields::default()
            },
            captured_at: None,
        },
        Channel::Temperature => FieldUpdate {
            fields: ReadingFields {
                temperature: Some(parse::<TemperatureBody>(channel, payload)?.temperature),
                ..ReadingFields::default()
            },
            captured_at: None,
        },
        Channel::Reading => {
            let (fields, captured_at) = parse::<ReadingPayload>(channel, payload)?.into_parts();
            FieldUpdate {
                fields,
                captured_at,
            }
        }
    };

    if update.fields.is_empty() {
        return Err(MessageError::MalformedPayload {
            channel: channel.as_str(),
            reason: "no measurements".to_string(),
        });
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn topic_round_trips_through_display() {
        let topic: Topic = "sensors/SOIL_SENSOR_3/moisture".parse().unwrap();
        assert_eq!(topic.device_id, "SOIL_SENSOR_3");
        assert_eq!(topic.channel, Channel::Moisture);
        assert_eq!(topic.to_string(), "sensors/SOIL_SENSOR_3/moisture");
    }

    #[test]
    fn malformed_topics_are_rejected() {
        for topic in [
            "sensors/SOIL_SENSOR_3",
            "sensors/SOIL_SENSOR_3/ph",
            "sensors/pump-1/npk",
            "devices/SOIL_SENSOR_3/npk",
            "sensors/SOIL_SENSOR_3/npk/extra",
            "",
        ] {
            assert!(topic.parse::<Topic>().is_err(), "{topic}");
        }
    }

    #[test]
    fn npk_channel_sets_all_three_nutrients() {
        let update = decode(
            Channel::Npk,
            &json!({"nitrogen": 45.0, "phosphorous": 22.5, "potassium": 110.0}),
        )
        .unwrap();
        assert_eq!(update.fields.phosphorous, Some(22.5));
        assert_eq!(update.fields.moisture, None);
    }

    #[test]
    fn reading_channel_carries_timestamp() {
        let update = decode(
            Channel::Reading,
            &json!({
                "npk": {"nitrogen": 45, "phosphorous": 22, "potassium": 110},
                "moisture": 38.2,
                "timestamp": "2026-10-19T06:30:00Z"
            }),
        )
        .unwrap();
        assert_eq!(update.fields.moisture, Some(38.2));
        assert_eq!(
            update.captured_at.unwrap().to_rfc3339(),
            "2026-10-19T06:30:00+00:00"
        );
    }

    #[test]
    fn wrong_shapes_are_malformed() {
        assert!(matches!(
            decode(Channel::Moisture, &json!({"temperature": 20.0})),
            Err(MessageError::MalformedPayload { channel: "moisture", .. })
        ));
        assert!(decode(Channel::Reading, &json!({})).is_err());
        assert!(decode(Channel::Temperature, &json!("hot")).is_err());
    }
}
