use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::weather::models::{CurrentWeatherResponse, WeatherConditions};

pub struct WeatherClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeatherClient {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.weather_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.openweather_base_url.clone(),
            api_key: config.openweather_api_key.clone(),
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current conditions at a coordinate.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Weather` if no API key is configured, the request
    /// fails, or the provider answers with an error status.
    pub async fn fetch(&self, latitude: f64, longitude: f64) -> AppResult<WeatherConditions> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Weather("No API key configured".to_string()))?;

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Weather(format!("Request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Weather("Rate limited (429)".to_string()));
        }

        if !response.status().is_success() {
            return Err(AppError::Weather(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let body: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| AppError::Weather(format!("Failed to parse response: {e}")))?;

        Ok(body.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = WeatherClient::new(&Config::default()).unwrap();
        assert!(!client.is_configured());
        assert!(matches!(
            client.fetch(10.8, 78.7).await,
            Err(AppError::Weather(_))
        ));
    }
}
