pub mod adapter;
pub mod client;
pub mod features;
pub mod protocol;
pub mod runtime;

pub use adapter::{Forecast, ForecastKind, ModelKind, PredictionAdapter, SessionCache};
pub use client::HttpInferenceRuntime;
pub use features::{ClimateObservation, FeatureVector, Season};
pub use runtime::{InferenceRuntime, ModelSession, Tensor};
