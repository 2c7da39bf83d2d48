mod handlers;
mod types;

pub use handlers::{create_model_prediction, create_prediction};
pub use types::{
    ModelPredictionRequest, ModelPredictionResponse, PredictionRequest, PredictionResponse,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_create_model_prediction, __path_create_prediction};
