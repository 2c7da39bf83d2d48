//! Reduction of raw sensor readings into fleet- or device-level means.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::soil_quality::soil_quality;
use crate::entity::sensor_readings;

/// Values used when there is nothing to average.
pub const DEFAULT_NPK: Npk = Npk {
    nitrogen: 40.0,
    phosphorous: 30.0,
    potassium: 45.0,
};
pub const DEFAULT_MOISTURE: f64 = 50.0;
pub const DEFAULT_TEMPERATURE: f64 = 25.0;

/// Nitrogen / phosphorous / potassium concentrations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Npk {
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
}

impl Npk {
    /// True when any component is zero or not a number.
    #[must_use]
    pub fn has_missing_component(&self) -> bool {
        [self.nitrogen, self.phosphorous, self.potassium]
            .into_iter()
            .any(is_missing)
    }
}

/// Zero and NaN both count as "not supplied".
pub(crate) fn is_missing(value: f64) -> bool {
    value == 0.0 || value.is_nan()
}

/// One reading as seen by the aggregator. Absent fields count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReadingSample {
    pub nitrogen: Option<f64>,
    pub phosphorous: Option<f64>,
    pub potassium: Option<f64>,
    pub moisture: Option<f64>,
    pub temperature: Option<f64>,
}

impl From<&sensor_readings::Model> for ReadingSample {
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

/// Mean sensor values plus the soil quality derived from the mean NPK.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMetrics {
    pub average_temp: f64,
    pub average_moisture: f64,
    pub average_npk: Npk,
    /// 0-100 composite index
    pub soil_quality: u8,
}

impl AggregatedMetrics {
    #[must_use]
    pub fn new(average_temp: f64, average_moisture: f64, average_npk: Npk) -> Self {
        Self {
            average_temp,
            average_moisture,
            average_npk,
            soil_quality: soil_quality(&average_npk),
        }
    }

    /// Record returned for an empty reading set.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(DEFAULT_TEMPERATURE, DEFAULT_MOISTURE, DEFAULT_NPK)
    }
}

/// Arithmetic mean of every field over all `samples`.
///
/// A sample missing a field contributes 0 to that field's sum but still counts
/// toward the divisor. An empty slice yields [`AggregatedMetrics::fallback`].
#[must_use]
pub fn aggregate(samples: &[ReadingSample]) -> AggregatedMetrics {
    if samples.is_empty() {
        return AggregatedMetrics::fallback();
    }

    let mut npk = Npk::default();
    let mut moisture = 0.0;
    let mut temperature = 0.0;

    for s in samples {
        npk.nitrogen += s.nitrogen.unwrap_or(0.0);
        npk.phosphorous += s.phosphorous.unwrap_or(0.0);
        npk.potassium += s.potassium.unwrap_or(0.0);
        moisture += s.moisture.unwrap_or(0.0);
        temperature += s.temperature.unwrap_or(0.0);
    }

    #[allow(clippy::cast_precision_loss)]
    let count = samples.len() as f64;

    AggregatedMetrics::new(
        temperature / count,
        moisture / count,
        Npk {
            nitrogen: npk.nitrogen / count,
            phosphorous: npk.phosphorous / count,
            potassium: npk.potassium / count,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(n: f64, p: f64, k: f64, m: f64, t: f64) -> ReadingSample {
        ReadingSample {
            nitrogen: Some(n),
            phosphorous: Some(p),
            potassium: Some(k),
            moisture: Some(m),
            temperature: Some(t),
        }
    }

    #[test]
    fn empty_input_uses_fallback() {
        let m = aggregate(&[]);
        assert_eq!(m.average_npk, DEFAULT_NPK);
        assert_eq!(m.average_moisture, 50.0);
        assert_eq!(m.average_temp, 25.0);
    }

    #[test]
    fn single_sample_passes_through() {
        let m = aggregate(&[full(10.0, 20.0, 30.0, 40.0, 22.5)]);
        assert_eq!(m.average_npk.nitrogen, 10.0);
        assert_eq!(m.average_temp, 22.5);
    }

    #[test]
    fn missing_field_still_counts_in_divisor() {
        let partial = ReadingSample {
            moisture: Some(80.0),
            ..ReadingSample::default()
        };
        let m = aggregate(&[full(60.0, 60.0, 60.0, 40.0, 30.0), partial]);
        assert_eq!(m.average_npk.nitrogen, 30.0);
        assert_eq!(m.average_moisture, 60.0);
        assert_eq!(m.average_temp, 15.0);
    }

    #[test]
    fn soil_quality_tracks_mean_npk() {
        let m = aggregate(&[full(140.0, 125.0, 200.0, 50.0, 25.0)]);
        assert_eq!(m.soil_quality, 100);
    }

    #[test]
    fn missing_component_detection() {
        assert!(!DEFAULT_NPK.has_missing_component());
        let npk = Npk {
            potassium: 0.0,
            ..DEFAULT_NPK
        };
        assert!(npk.has_missing_component());
        let npk = Npk {
            nitrogen: f64::NAN,
            ..DEFAULT_NPK
        };
        assert!(npk.has_missing_component());
    }
}
