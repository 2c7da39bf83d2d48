use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::inference::{HttpInferenceRuntime, PredictionAdapter, SessionCache};
use crate::ingest::IngestSender;
use crate::weather::WeatherClient;

pub type Predictor = PredictionAdapter<HttpInferenceRuntime>;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub weather: Arc<WeatherClient>,
    pub predictor: Arc<Predictor>,
    pub ingest_tx: IngestSender,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an outbound HTTP
    /// client cannot be built.
    pub fn new(db: DatabaseConnection, config: Config, ingest_tx: IngestSender) -> AppResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let weather = WeatherClient::new(&config)?;
        let runtime = HttpInferenceRuntime::new(&config)?;
        let predictor = PredictionAdapter::new(runtime, SessionCache::default(), config.clone());

        Ok(Self {
            db,
            config,
            weather: Arc::new(weather),
            predictor: Arc::new(predictor),
            ingest_tx,
        })
    }
}
