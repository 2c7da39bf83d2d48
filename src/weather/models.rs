use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::weather_samples;

/// Response from the OpenWeather current-weather endpoint (metric units).
/// Only the fields consumed here are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeatherResponse {
    pub main: MainBlock,
    pub wind: WindBlock,
    #[serde(default)]
    pub rain: Option<RainBlock>,
    #[serde(default)]
    pub weather: Vec<ConditionBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindBlock {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RainBlock {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionBlock {
    pub main: String,
}

/// Weather at a device location at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherConditions {
    /// Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    /// Metres per second
    pub wind_speed: f64,
    /// Eight-point compass direction
    pub wind_direction: String,
    /// Millimetres over the last hour
    pub precipitation: f64,
    pub condition: String,
}

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Nearest eight-point compass direction for a bearing in degrees.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn wind_direction(degrees: f64) -> &'static str {
    let sector = (degrees / 45.0).round() as i64;
    // rem_euclid keeps the index in 0..8
    #[allow(clippy::cast_sign_loss)]
    let index = sector.rem_euclid(8) as usize;
    COMPASS[index]
}

impl From<CurrentWeatherResponse> for WeatherConditions {
    fn from(r: CurrentWeatherResponse) -> Self {
        Self {
            temperature: r.main.temp,
            humidity: r.main.humidity,
            wind_speed: r.wind.speed,
            wind_direction: wind_direction(r.wind.deg).to_string(),
            precipitation: r.rain.and_then(|rain| rain.one_hour).unwrap_or(0.0),
            condition: r
                .weather
                .into_iter()
                .next()
                .map_or_else(|| "Unknown".to_string(), |w| w.main),
        }
    }
}

impl From<weather_samples::Model> for WeatherConditions {
    fn from(m: weather_samples::Model) -> Self {
        Self {
            temperature: m.temperature,
            humidity: m.humidity,
            wind_speed: m.wind_speed,
            wind_direction: m.wind_direction,
            precipitation: m.precipitation,
            condition: m.condition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compass_points() {
        assert_eq!(wind_direction(0.0), "N");
        assert_eq!(wind_direction(44.0), "NE");
        assert_eq!(wind_direction(180.0), "S");
        assert_eq!(wind_direction(337.0), "NW");
        assert_eq!(wind_direction(350.0), "N");
        assert_eq!(wind_direction(-90.0), "W");
    }

    #[test]
    fn parses_provider_payload() {
        let body = serde_json::json!({
            "coord": {"lon": 78.7, "lat": 10.8},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
            "main": {"temp": 29.4, "feels_like": 33.1, "humidity": 78, "pressure": 1008},
            "wind": {"speed": 4.1, "deg": 225},
            "rain": {"1h": 0.6},
            "name": "Thanjavur"
        });
        let parsed: CurrentWeatherResponse = serde_json::from_value(body).unwrap();
        let conditions = WeatherConditions::from(parsed);

        assert_eq!(conditions.temperature, 29.4);
        assert_eq!(conditions.humidity, 78.0);
        assert_eq!(conditions.wind_direction, "SW");
        assert_eq!(conditions.precipitation, 0.6);
        assert_eq!(conditions.condition, "Rain");
    }

    #[test]
    fn dry_weather_has_zero_precipitation() {
        let body = serde_json::json!({
            "weather": [{"main": "Clear"}],
            "main": {"temp": 33.0, "humidity": 40},
            "wind": {"speed": 1.0, "deg": 90}
        });
        let parsed: CurrentWeatherResponse = serde_json::from_value(body).unwrap();
        assert_eq!(WeatherConditions::from(parsed).precipitation, 0.0);
    }
}
