//! Named model inputs and their fixed positional encoding.

use chrono::{Datelike, Utc};

use crate::analytics::{soil_quality, AggregatedMetrics, Npk, ReadingSample};
use crate::error::AppError;
use crate::weather::WeatherConditions;

pub const FEATURE_COUNT: usize = 12;

const NEUTRAL_TEMPERATURE: f64 = 25.0;
const NEUTRAL_HUMIDITY: f64 = 50.0;
const NEUTRAL_PH: f64 = 7.0;

/// Meteorological season, indexed 0-3 starting with December-February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Season {
    #[default]
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Season for a 1-based calendar month: `(month mod 12) / 3`.
    #[must_use]
    pub fn from_month(month: u32) -> Self {
        match (month % 12) / 3 {
            0 => Self::Winter,
            1 => Self::Spring,
            2 => Self::Summer,
            _ => Self::Autumn,
        }
    }

    #[must_use]
    pub fn current() -> Self {
        Self::from_month(Utc::now().month())
    }

    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Inputs of the tabular regression model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    /// Precipitation over the last hour, mm
    pub rainfall: f64,
    pub ph: f64,
    /// Volumetric moisture, percent
    pub moisture: f64,
    pub soil_quality: f64,
    pub season: Season,
    /// Placeholder category, always 0 until soil classification feeds it
    pub soil_type: u8,
    /// Placeholder category, always 0 until crop selection feeds it
    pub crop_type: u8,
}

/// A stored reading paired with the weather sampled when it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct ClimateObservation {
    pub reading: ReadingSample,
    pub weather: WeatherConditions,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidFeature {
    #[error("Feature {0} is not a finite number")]
    NotFinite(&'static str),
    #[error("Feature {name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl From<InvalidFeature> for AppError {
    fn from(e: InvalidFeature) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl FeatureVector {
    /// Features for the fleet aggregate, filling climate slots from the most
    /// recent weather sample and neutral values when there is none.
    #[must_use]
    pub fn from_metrics(
        metrics: &AggregatedMetrics,
        weather: Option<&WeatherConditions>,
        season: Season,
    ) -> Self {
        let temperature = if metrics.average_temp != 0.0 {
            metrics.average_temp
        } else {
            weather.map_or(NEUTRAL_TEMPERATURE, |w| w.temperature)
        };

        Self {
            nitrogen: metrics.average_npk.nitrogen,
            phosphorous: metrics.average_npk.phosphorous,
            potassium: metrics.average_npk.potassium,
            temperature,
            humidity: weather.map_or(NEUTRAL_HUMIDITY, |w| w.humidity),
            rainfall: weather.map_or(0.0, |w| w.precipitation),
            ph: NEUTRAL_PH,
            moisture: metrics.average_moisture,
            soil_quality: f64::from(metrics.soil_quality),
            season,
            soil_type: 0,
            crop_type: 0,
        }
    }

    /// Soil-only features with a neutral climate, used for optimisation runs.
    #[must_use]
    pub fn neutral_climate(metrics: &AggregatedMetrics) -> Self {
        Self {
            temperature: NEUTRAL_TEMPERATURE,
            humidity: NEUTRAL_HUMIDITY,
            rainfall: 0.0,
            season: Season::Winter,
            ..Self::from_metrics(metrics, None, Season::Winter)
        }
    }

    /// Mean features over paired reading/weather history, with neutral pH and
    /// season 0. Missing sensor fields count as 0. `None` for empty history.
    #[must_use]
    pub fn from_history(history: &[ClimateObservation]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }

        let mut mean = Self {
            nitrogen: 0.0,
            phosphorous: 0.0,
            potassium: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            rainfall: 0.0,
            ph: NEUTRAL_PH,
            moisture: 0.0,
            soil_quality: 0.0,
            season: Season::Winter,
            soil_type: 0,
            crop_type: 0,
        };

        for ClimateObservation { reading, weather } in history {
            let npk = Npk {
                nitrogen: reading.nitrogen.unwrap_or(0.0),
                phosphorous: reading.phosphorous.unwrap_or(0.0),
                potassium: reading.potassium.unwrap_or(0.0),
            };
            mean.nitrogen += npk.nitrogen;
            mean.phosphorous += npk.phosphorous;
            mean.potassium += npk.potassium;
            mean.temperature += weather.temperature;
            mean.humidity += weather.humidity;
            mean.rainfall += weather.precipitation;
            mean.moisture += reading.moisture.unwrap_or(0.0);
            mean.soil_quality += f64::from(soil_quality(&npk));
        }

        #[allow(clippy::cast_precision_loss)]
        let count = history.len() as f64;
        for slot in [
            &mut mean.nitrogen,
            &mut mean.phosphorous,
            &mut mean.potassium,
            &mut mean.temperature,
            &mut mean.humidity,
            &mut mean.rainfall,
            &mut mean.moisture,
            &mut mean.soil_quality,
        ] {
            *slot /= count;
        }
        Some(mean)
    }

    /// # Errors
    ///
    /// Returns the first feature that is not finite or falls outside its domain.
    pub fn validate(&self) -> Result<(), InvalidFeature> {
        let named = [
            ("nitrogen", self.nitrogen),
            ("phosphorous", self.phosphorous),
            ("potassium", self.potassium),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("rainfall", self.rainfall),
            ("ph", self.ph),
            ("moisture", self.moisture),
            ("soil_quality", self.soil_quality),
        ];
        if let Some((name, _)) = named.into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(InvalidFeature::NotFinite(name));
        }

        let bounded = [
            ("nitrogen", self.nitrogen, 0.0, f64::MAX),
            ("phosphorous", self.phosphorous, 0.0, f64::MAX),
            ("potassium", self.potassium, 0.0, f64::MAX),
            ("rainfall", self.rainfall, 0.0, f64::MAX),
            ("humidity", self.humidity, 0.0, 100.0),
            ("moisture", self.moisture, 0.0, 100.0),
            ("ph", self.ph, 0.0, 14.0),
            ("soil_quality", self.soil_quality, 0.0, 100.0),
        ];
        for (name, value, min, max) in bounded {
            if !(min..=max).contains(&value) {
                return Err(InvalidFeature::OutOfRange {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    /// Positional encoding consumed by the model. Slot order is fixed:
    /// N, P, K, temperature, humidity, rainfall, pH, moisture, soil quality,
    /// season, soil type, crop type.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_array(&self) -> [f32; FEATURE_COUNT] {
        [
            self.nitrogen as f32,
            self.phosphorous as f32,
            self.potassium as f32,
            self.temperature as f32,
            self.humidity as f32,
            self.rainfall as f32,
            self.ph as f32,
            self.moisture as f32,
            self.soil_quality as f32,
            f32::from(self.season.index()),
            f32::from(self.soil_type),
            f32::from(self.crop_type),
        ]
    }
}
