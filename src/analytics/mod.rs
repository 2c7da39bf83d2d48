//! Pure computations over sensor readings: aggregation, soil scoring and the
//! rule-based recommenders.

pub mod advisory;
pub mod aggregate;
pub mod rules;
pub mod soil_quality;

pub use aggregate::{aggregate, AggregatedMetrics, Npk, ReadingSample};
pub use rules::{recommend, Prediction, PredictionType};
pub use soil_quality::{npk_advice, soil_quality, NutrientAdvice};
