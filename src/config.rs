use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Weather provider (OpenWeather current weather)
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub weather_timeout_seconds: u64,

    // Model server
    pub inference_base_url: String,
    pub inference_timeout_seconds: u64,
    pub model_xgboost_name: String,
    pub model_soil_name: String,
    pub model_disease_name: String,
    pub prediction_max_output: f64,

    // Pub/sub ingestion
    pub ingest_queue_capacity: usize,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_read_per_second: u64,
    pub rate_limit_read_burst: u32,
    pub rate_limit_write_per_second: u64,
    pub rate_limit_write_burst: u32,

    // Application metadata
    pub deployment: Deployment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),

            openweather_api_key: None,
            openweather_base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            weather_timeout_seconds: 10,

            inference_base_url: "http://localhost:8080".to_string(),
            inference_timeout_seconds: 30,
            model_xgboost_name: "xgb_model".to_string(),
            model_soil_name: "soil_model".to_string(),
            model_disease_name: "plant_disease_model".to_string(),
            prediction_max_output: 100.0, // quintals/hectare

            ingest_queue_capacity: 256,

            api_host: "0.0.0.0".to_string(),
            api_port: 3000,

            disable_rate_limiting: false,
            rate_limit_read_per_second: 10,
            rate_limit_read_burst: 60,
            rate_limit_write_per_second: 2,
            rate_limit_write_burst: 30,

            deployment: Deployment::Local,
        }
    }
}

/// Read `key` and parse it, keeping `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not
    /// set, or `ConfigError::Invalid` if a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,

            // Weather provider
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or(defaults.openweather_base_url),
            weather_timeout_seconds: env_or(
                "WEATHER_TIMEOUT_SECONDS",
                defaults.weather_timeout_seconds,
            ),

            // Model server
            inference_base_url: env::var("INFERENCE_BASE_URL")
                .unwrap_or(defaults.inference_base_url),
            inference_timeout_seconds: env_or(
                "INFERENCE_TIMEOUT_SECONDS",
                defaults.inference_timeout_seconds,
            ),
            model_xgboost_name: env::var("MODEL_XGBOOST_NAME")
                .unwrap_or(defaults.model_xgboost_name),
            model_soil_name: env::var("MODEL_SOIL_NAME").unwrap_or(defaults.model_soil_name),
            model_disease_name: env::var("MODEL_DISEASE_NAME")
                .unwrap_or(defaults.model_disease_name),
            prediction_max_output: env_or("PREDICTION_MAX_OUTPUT", defaults.prediction_max_output),

            // Pub/sub ingestion
            ingest_queue_capacity: env_or("INGEST_QUEUE_CAPACITY", defaults.ingest_queue_capacity)
                .max(1),

            // API settings
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: env_or("API_PORT", defaults.api_port),

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", defaults.disable_rate_limiting),
            rate_limit_read_per_second: env_or(
                "RATE_LIMIT_READ_PER_SECOND",
                defaults.rate_limit_read_per_second,
            ),
            rate_limit_read_burst: env_or("RATE_LIMIT_READ_BURST", defaults.rate_limit_read_burst),
            rate_limit_write_per_second: env_or(
                "RATE_LIMIT_WRITE_PER_SECOND",
                defaults.rate_limit_write_per_second,
            ),
            rate_limit_write_burst: env_or(
                "RATE_LIMIT_WRITE_BURST",
                defaults.rate_limit_write_burst,
            ),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when `prediction_max_output` is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.prediction_max_output;
        if !max.is_finite() || max <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "PREDICTION_MAX_OUTPUT",
                reason: format!("must be a positive finite number, got {max}"),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Model-server name for a model kind.
    #[must_use]
    pub fn model_name(&self, kind: crate::inference::ModelKind) -> &str {
        use crate::inference::ModelKind;
        match kind {
            ModelKind::Xgboost => &self.model_xgboost_name,
            ModelKind::Soil => &self.model_soil_name,
            ModelKind::Disease => &self.model_disease_name,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ModelKind;

    #[test]
    fn deployment_aliases() {
        assert_eq!(Deployment::from_str("Production"), Deployment::Prod);
        assert_eq!(Deployment::from_str("staging"), Deployment::Stage);
        assert_eq!(Deployment::from_str("dev"), Deployment::Dev);
        assert_eq!(Deployment::from_str("anything-else"), Deployment::Local);
    }

    #[test]
    fn defaults_bind_all_interfaces() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.openweather_api_key.is_none());
    }

    #[test]
    fn model_names_follow_kind() {
        let config = Config::default();
        assert_eq!(config.model_name(ModelKind::Xgboost), "xgb_model");
        assert_eq!(config.model_name(ModelKind::Soil), "soil_model");
        assert_eq!(config.model_name(ModelKind::Disease), "plant_disease_model");
    }

    #[test]
    fn default_prediction_ceiling_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn prediction_ceiling_must_be_positive_and_finite() {
        for bad in [f64::NAN, f64::INFINITY, 0.0, -10.0] {
            let config = Config {
                prediction_max_output: bad,
                ..Config::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::Invalid {
                        key: "PREDICTION_MAX_OUTPUT",
                        ..
                    })
                ),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn env_or_falls_back_on_missing_key() {
        assert_eq!(env_or("AGRISENSE_TEST_KEY_THAT_IS_NEVER_SET", 42_u16), 42);
    }
}
