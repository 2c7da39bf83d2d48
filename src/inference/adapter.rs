//! Wraps the external models: builds their inputs, caches their sessions and
//! normalises what they return.

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::analytics::advisory::{LeafCondition, LeafGuidance, SoilClass, SoilGuidance};
use crate::analytics::{npk_advice, AggregatedMetrics};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::inference::features::{ClimateObservation, FeatureVector};
use crate::inference::runtime::{InferenceRuntime, ModelSession, Tensor};

/// Crop labels in the order of the regression model's outputs.
pub const CROP_NAMES: [&str; 8] = [
    "Wheat", "Rice", "Corn", "Sugarcane", "Cotton", "Potato", "Tomato", "Soybean",
];

/// Square side and channel count of classifier inputs (NHWC).
pub const IMAGE_SIDE: usize = 224;
pub const IMAGE_CHANNELS: usize = 3;
pub const IMAGE_LEN: usize = IMAGE_SIDE * IMAGE_SIDE * IMAGE_CHANNELS;

/// Confidence ceiling when the caller lacks sensor or weather data.
const LIMITED_DATA_CONFIDENCE: f64 = 60.0;
const FALLBACK_CONFIDENCE: f64 = 30.0;
/// Historical wheat average (quintals/hectare) scaled down for a conservative guess.
const FALLBACK_YIELD: f64 = 35.0 * 0.15;
/// Moderate risk.
const FALLBACK_CLIMATE_RISK: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Xgboost,
    Soil,
    Disease,
}

/// Process-lifetime memo of loaded sessions. Unbounded, never expires, and
/// concurrent misses for one kind share a single load.
#[derive(Clone)]
pub struct SessionCache {
    sessions: Cache<ModelKind, Arc<ModelSession>>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self {
            sessions: Cache::builder().build(),
        }
    }
}

impl SessionCache {
    async fn get_or_load<R: InferenceRuntime>(
        &self,
        kind: ModelKind,
        model: &str,
        runtime: &R,
    ) -> AppResult<Arc<ModelSession>> {
        self.sessions
            .try_get_with(kind, async {
                tracing::info!(?kind, model, "Loading model session");
                runtime.load(model).await.map(Arc::new)
            })
            .await
            .map_err(|e| match e.as_ref() {
                AppError::Inference(msg) => AppError::Inference(msg.clone()),
                other => AppError::Inference(other.to_string()),
            })
    }

    #[must_use]
    pub fn loaded(&self) -> u64 {
        self.sessions.entry_count()
    }
}

/// Which model-backed forecast to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ForecastKind {
    Yield,
    Crop,
    Soil,
    Climate,
}

impl FromStr for ForecastKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yield" => Ok(Self::Yield),
            "crop" => Ok(Self::Crop),
            "soil" => Ok(Self::Soil),
            "climate" => Ok(Self::Climate),
            other => Err(AppError::BadRequest(format!("Invalid model prediction kind: {other}"))),
        }
    }
}

/// Normalised regression output.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ModelPrediction {
    /// Each raw output clamped to [0, max]
    pub prediction: Vec<f64>,
    /// Percent in [0, 100]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CropScore {
    #[schema(value_type = String)]
    pub crop: &'static str,
    pub suitability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CropSuitability {
    pub prediction: Vec<f64>,
    pub confidence: f64,
    pub crop_scores: Vec<CropScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoilOptimization {
    pub prediction: Vec<f64>,
    pub confidence: f64,
    pub current_quality: u8,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Forecast {
    Yield(ModelPrediction),
    Crop(CropSuitability),
    Soil(SoilOptimization),
    Climate(ModelPrediction),
}

impl Forecast {
    /// Low-confidence stand-in returned when the model cannot be reached.
    #[must_use]
    pub fn fallback(kind: ForecastKind) -> Self {
        match kind {
            ForecastKind::Yield => Self::Yield(ModelPrediction {
                prediction: vec![FALLBACK_YIELD],
                confidence: FALLBACK_CONFIDENCE,
            }),
            ForecastKind::Crop => Self::Crop(CropSuitability {
                prediction: vec![0.3, 0.2, 0.15, 0.1, 0.1, 0.05, 0.05, 0.05],
                confidence: FALLBACK_CONFIDENCE,
                crop_scores: CROP_NAMES
                    .into_iter()
                    .zip([30.0, 25.0, 20.0, 15.0, 15.0, 10.0, 10.0, 10.0])
                    .map(|(crop, suitability)| CropScore { crop, suitability })
                    .collect(),
            }),
            ForecastKind::Soil => Self::Soil(SoilOptimization {
                prediction: vec![0.65],
                confidence: FALLBACK_CONFIDENCE,
                current_quality: 65,
                recommendations: vec![
                    "Maintain regular soil testing".to_string(),
                    "Consider adding organic matter".to_string(),
                    "Monitor moisture levels".to_string(),
                ],
            }),
            ForecastKind::Climate => Self::Climate(ModelPrediction {
                prediction: vec![FALLBACK_CLIMATE_RISK],
                confidence: FALLBACK_CONFIDENCE,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoilClassification {
    pub soil_type: SoilClass,
    pub confidence: f64,
    pub guidance: SoilGuidance,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DiseaseClassification {
    pub condition: LeafCondition,
    pub confidence: f64,
    pub guidance: LeafGuidance,
}

pub struct PredictionAdapter<R> {
    runtime: R,
    sessions: SessionCache,
    config: Arc<Config>,
}

impl<R: InferenceRuntime> PredictionAdapter<R> {
    pub fn new(runtime: R, sessions: SessionCache, config: Arc<Config>) -> Self {
        Self {
            runtime,
            sessions,
            config,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    async fn run_model(&self, kind: ModelKind, input: Tensor) -> AppResult<Vec<f32>> {
        let model = self.config.model_name(kind);
        let session = self.sessions.get_or_load(kind, model, &self.runtime).await?;

        let inputs = HashMap::from([(session.primary_input()?.to_string(), input)]);
        let mut outputs = self.runtime.run(&session, inputs).await?;

        let output = outputs
            .remove(session.primary_output()?)
            .ok_or_else(|| AppError::Inference(format!("Model {model} returned no output")))?;
        if output.data.is_empty() {
            return Err(AppError::Inference(format!("Model {model} returned an empty output")));
        }
        Ok(output.data)
    }

    /// Run the regression model on `features`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for invalid features and
    /// `AppError::Inference` when the runtime fails.
    pub async fn predict(
        &self,
        features: &FeatureVector,
        has_enough_data: bool,
    ) -> AppResult<ModelPrediction> {
        features.validate()?;
        let raw = self
            .run_model(ModelKind::Xgboost, Tensor::row(features.to_array().to_vec()))
            .await?;

        let max = self.config.prediction_max_output;
        let prediction = raw
            .iter()
            .map(|&v| finite_or_zero(f64::from(v)).min(max).max(0.0))
            .collect();

        let peak = raw
            .iter()
            .map(|&v| finite_or_zero(f64::from(v)))
            .fold(f64::NEG_INFINITY, f64::max);
        let confidence = (peak * 100.0).clamp(0.0, 100.0);
        let confidence = if has_enough_data {
            confidence
        } else {
            confidence.min(LIMITED_DATA_CONFIDENCE)
        };

        Ok(ModelPrediction {
            prediction,
            confidence,
        })
    }

    /// # Errors
    ///
    /// Propagates [`Self::predict`] failures.
    pub async fn predict_yield(
        &self,
        features: &FeatureVector,
        has_enough_data: bool,
    ) -> AppResult<ModelPrediction> {
        self.predict(features, has_enough_data).await
    }

    /// Per-crop suitability, normalised so the eight scores sum to 100.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::predict`] failures.
    pub async fn predict_crop_suitability(
        &self,
        features: &FeatureVector,
        has_enough_data: bool,
    ) -> AppResult<CropSuitability> {
        let ModelPrediction {
            prediction,
            confidence,
        } = self.predict(features, has_enough_data).await?;

        Ok(CropSuitability {
            crop_scores: crop_scores(&prediction),
            prediction,
            confidence,
        })
    }

    /// Model run on soil features under a neutral climate, plus the current
    /// quality score and corrective NPK advice.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::predict`] failures.
    pub async fn predict_soil_optimization(
        &self,
        metrics: &AggregatedMetrics,
        has_enough_data: bool,
    ) -> AppResult<SoilOptimization> {
        let features = FeatureVector::neutral_climate(metrics);
        let ModelPrediction {
            prediction,
            confidence,
        } = self.predict(&features, has_enough_data).await?;

        Ok(SoilOptimization {
            prediction,
            confidence,
            current_quality: metrics.soil_quality,
            recommendations: npk_advice(&metrics.average_npk)
                .into_iter()
                .map(|advice| advice.message)
                .collect(),
        })
    }

    /// Climate risk in [0, 1] from the mean of paired reading/weather history.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NoData` for empty history, otherwise propagates
    /// [`Self::predict`] failures.
    pub async fn assess_climate_impact(
        &self,
        history: &[ClimateObservation],
        has_enough_data: bool,
    ) -> AppResult<ModelPrediction> {
        let features = FeatureVector::from_history(history).ok_or_else(|| {
            AppError::NoData("No readings with weather samples available".to_string())
        })?;
        let ModelPrediction {
            prediction,
            confidence,
        } = self.predict(&features, has_enough_data).await?;

        let risk = prediction.first().copied().unwrap_or(0.0).clamp(0.0, 1.0);
        Ok(ModelPrediction {
            prediction: vec![risk],
            confidence,
        })
    }

    /// Top class index and its score as a percentage.
    async fn classify(&self, kind: ModelKind, pixels: Vec<f32>) -> AppResult<(usize, f64)> {
        validate_pixels(&pixels)?;
        let input = Tensor::new(pixels, vec![1, IMAGE_SIDE, IMAGE_SIDE, IMAGE_CHANNELS])?;
        let scores = self.run_model(kind, input).await?;

        let (index, top) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, s)| {
                if s > best.1 { (i, s) } else { best }
            });
        Ok((index, (f64::from(top) * 100.0).clamp(0.0, 100.0)))
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a malformed image and
    /// `AppError::Inference` when the model fails or answers with an unknown class.
    pub async fn classify_soil(&self, pixels: Vec<f32>) -> AppResult<SoilClassification> {
        let (index, confidence) = self.classify(ModelKind::Soil, pixels).await?;
        let soil_type = *SoilClass::ALL
            .get(index)
            .ok_or_else(|| AppError::Inference(format!("Unknown soil class index {index}")))?;

        Ok(SoilClassification {
            soil_type,
            confidence,
            guidance: soil_type.guidance(),
        })
    }

    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a malformed image and
    /// `AppError::Inference` when the model fails or answers with an unknown class.
    pub async fn classify_disease(&self, pixels: Vec<f32>) -> AppResult<DiseaseClassification> {
        let (index, confidence) = self.classify(ModelKind::Disease, pixels).await?;
        let condition = *LeafCondition::ALL
            .get(index)
            .ok_or_else(|| AppError::Inference(format!("Unknown leaf condition index {index}")))?;

        Ok(DiseaseClassification {
            condition,
            confidence,
            guidance: condition.guidance(),
        })
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn crop_scores(prediction: &[f64]) -> Vec<CropScore> {
    let sum: f64 = prediction.iter().take(CROP_NAMES.len()).sum();
    CROP_NAMES
        .into_iter()
        .enumerate()
        .map(|(i, crop)| {
            let score = prediction.get(i).copied().unwrap_or(0.0);
            let suitability = if sum > 0.0 {
                (score / sum * 100.0).clamp(0.0, 100.0)
            } else {
                0.0
            };
            CropScore { crop, suitability }
        })
        .collect()
}

fn validate_pixels(pixels: &[f32]) -> AppResult<()> {
    if pixels.len() != IMAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "Expected {IMAGE_LEN} pixel values ({IMAGE_SIDE}x{IMAGE_SIDE}x{IMAGE_CHANNELS}), got {}",
            pixels.len()
        )));
    }
    if pixels.iter().any(|p| !(0.0..=1.0).contains(p)) {
        return Err(AppError::BadRequest(
            "Pixel values must be normalised to [0, 1]".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Npk;
    use crate::inference::features::Season;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeRuntime {
        loads: AtomicUsize,
        output: Vec<f32>,
        reachable: bool,
    }

    impl FakeRuntime {
        fn answering(output: Vec<f32>) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                output,
                reachable: true,
            }
        }

        fn unreachable() -> Self {
            Self {
                reachable: false,
                ..Self::answering(vec![])
            }
        }
    }

    impl InferenceRuntime for FakeRuntime {
        async fn load(&self, model: &str) -> AppResult<ModelSession> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if !self.reachable {
                return Err(AppError::Inference(format!("{model} unreachable")));
            }
            Ok(ModelSession {
                model: model.to_string(),
                input_names: vec!["input".to_string()],
                output_names: vec!["output".to_string()],
            })
        }

        async fn run(
            &self,
            _session: &ModelSession,
            inputs: HashMap<String, Tensor>,
        ) -> AppResult<HashMap<String, Tensor>> {
            assert!(inputs.contains_key("input"));
            Ok(HashMap::from([(
                "output".to_string(),
                Tensor::row(self.output.clone()),
            )]))
        }
    }

    fn adapter(runtime: FakeRuntime) -> PredictionAdapter<FakeRuntime> {
        PredictionAdapter::new(runtime, SessionCache::default(), Arc::new(Config::default()))
    }

    fn metrics() -> AggregatedMetrics {
        AggregatedMetrics::new(
            27.0,
            55.0,
            Npk {
                nitrogen: 10.0,
                phosphorous: 60.0,
                potassium: 90.0,
            },
        )
    }

    fn features() -> FeatureVector {
        FeatureVector::from_metrics(&metrics(), None, Season::Spring)
    }

    #[tokio::test]
    async fn outputs_are_clamped_and_confidence_scaled() {
        let adapter = adapter(FakeRuntime::answering(vec![0.42, 250.0, -3.0]));
        let result = adapter.predict(&features(), true).await.unwrap();
        assert_eq!(result.prediction, vec![f64::from(0.42_f32), 100.0, 0.0]);
        assert_eq!(result.confidence, 100.0);
    }

    #[tokio::test]
    async fn unusable_ceiling_does_not_panic() {
        let config = Config {
            prediction_max_output: f64::NAN,
            ..Config::default()
        };
        let adapter = PredictionAdapter::new(
            FakeRuntime::answering(vec![0.42, -3.0]),
            SessionCache::default(),
            Arc::new(config),
        );
        let result = adapter.predict(&features(), true).await.unwrap();
        assert_eq!(result.prediction, vec![f64::from(0.42_f32), 0.0]);
    }

    fn observation(moisture: f64) -> ClimateObservation {
        ClimateObservation {
            reading: crate::analytics::ReadingSample {
                nitrogen: Some(60.0),
                phosphorous: Some(40.0),
                potassium: Some(80.0),
                moisture: Some(moisture),
                temperature: Some(26.0),
            },
            weather: crate::weather::WeatherConditions {
                temperature: 29.0,
                humidity: 65.0,
                wind_speed: 2.0,
                wind_direction: "S".to_string(),
                precipitation: 0.0,
                condition: "Clear".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn climate_risk_is_bounded_to_unit_range() {
        let saturated = adapter(FakeRuntime::answering(vec![3.5]));
        let result = saturated
            .assess_climate_impact(&[observation(40.0), observation(50.0)], true)
            .await
            .unwrap();
        assert_eq!(result.prediction, vec![1.0]);
        assert_eq!(result.confidence, 100.0);

        let moderate = adapter(FakeRuntime::answering(vec![0.25]));
        let result = moderate
            .assess_climate_impact(&[observation(40.0)], false)
            .await
            .unwrap();
        assert_eq!(result.prediction, vec![f64::from(0.25_f32)]);
        assert_eq!(result.confidence, 25.0);
    }

    #[tokio::test]
    async fn climate_without_history_is_no_data() {
        let adapter = adapter(FakeRuntime::answering(vec![0.5]));
        assert!(matches!(
            adapter.assess_climate_impact(&[], true).await,
            Err(AppError::NoData(_))
        ));
        assert_eq!(adapter.runtime.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn climate_fallback_is_moderate_risk() {
        let Forecast::Climate(fallback) = Forecast::fallback(ForecastKind::Climate) else {
            panic!("expected climate fallback");
        };
        assert_eq!(fallback.prediction, vec![0.4]);
        assert_eq!(fallback.confidence, 30.0);
        assert_eq!("climate".parse::<ForecastKind>().unwrap(), ForecastKind::Climate);
    }

    #[tokio::test]
    async fn limited_data_caps_confidence() {
        let adapter = adapter(FakeRuntime::answering(vec![0.9]));
        let result = adapter.predict(&features(), false).await.unwrap();
        assert_eq!(result.confidence, 60.0);
    }

    #[tokio::test]
    async fn sessions_load_once_per_kind() {
        let adapter = adapter(FakeRuntime::answering(vec![0.5]));
        for _ in 0..3 {
            adapter.predict(&features(), true).await.unwrap();
        }
        assert_eq!(adapter.runtime.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_loads_are_not_cached() {
        let adapter = adapter(FakeRuntime::unreachable());
        assert!(matches!(
            adapter.predict(&features(), true).await,
            Err(AppError::Inference(msg)) if msg == "xgb_model unreachable"
        ));
        assert!(adapter.predict(&features(), true).await.is_err());
        assert_eq!(adapter.runtime.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_features_never_reach_the_runtime() {
        let adapter = adapter(FakeRuntime::answering(vec![0.5]));
        let mut bad = features();
        bad.moisture = 120.0;
        assert!(matches!(
            adapter.predict(&bad, true).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(adapter.runtime.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn crop_scores_sum_to_hundred() {
        let adapter = adapter(FakeRuntime::answering(vec![4.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        let result = adapter
            .predict_crop_suitability(&features(), true)
            .await
            .unwrap();
        assert_eq!(result.crop_scores.len(), 8);
        assert_eq!(result.crop_scores[0].crop, "Wheat");
        assert_eq!(result.crop_scores[0].suitability, 50.0);
        let total: f64 = result.crop_scores.iter().map(|c| c.suitability).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn all_zero_scores_do_not_divide_by_zero() {
        let scores = crop_scores(&[0.0; 8]);
        assert!(scores.iter().all(|c| c.suitability == 0.0));
    }

    #[tokio::test]
    async fn soil_optimization_reports_quality_and_advice() {
        let adapter = adapter(FakeRuntime::answering(vec![0.7]));
        let result = adapter
            .predict_soil_optimization(&metrics(), true)
            .await
            .unwrap();
        assert_eq!(result.current_quality, metrics().soil_quality);
        assert_eq!(
            result.recommendations,
            vec!["Low nitrogen: Increase by 70.0 units"]
        );
    }

    #[tokio::test]
    async fn soil_image_maps_argmax_to_class() {
        let adapter = adapter(FakeRuntime::answering(vec![0.1, 0.05, 0.8, 0.05]));
        let result = adapter.classify_soil(vec![0.5; IMAGE_LEN]).await.unwrap();
        assert_eq!(result.soil_type, SoilClass::Clay);
        assert!((result.confidence - 80.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn unknown_class_index_is_an_inference_error() {
        let adapter = adapter(FakeRuntime::answering(vec![0.0, 0.0, 0.0, 0.0, 0.9]));
        assert!(matches!(
            adapter.classify_disease(vec![0.5; IMAGE_LEN]).await,
            Err(AppError::Inference(_))
        ));
    }

    #[tokio::test]
    async fn malformed_images_are_rejected() {
        let adapter = adapter(FakeRuntime::answering(vec![1.0]));
        assert!(matches!(
            adapter.classify_soil(vec![0.5; 10]).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            adapter.classify_soil(vec![255.0; IMAGE_LEN]).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn fallbacks_are_low_confidence() {
        for kind in [ForecastKind::Yield, ForecastKind::Crop, ForecastKind::Soil] {
            let confidence = match Forecast::fallback(kind) {
                Forecast::Yield(p) => p.confidence,
                Forecast::Crop(c) => c.confidence,
                Forecast::Soil(s) => s.confidence,
                Forecast::Climate(p) => p.confidence,
            };
            assert_eq!(confidence, 30.0);
        }
    }

    #[test]
    fn forecast_kind_parsing() {
        assert_eq!("yield".parse::<ForecastKind>().unwrap(), ForecastKind::Yield);
        assert!(matches!(
            "climate".parse::<ForecastKind>(),
            Err(AppError::BadRequest(_))
        ));
    }
}
