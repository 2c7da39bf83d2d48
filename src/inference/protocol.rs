//! Request and response bodies of the Open Inference Protocol (v2).

use serde::{Deserialize, Serialize};

/// `GET /v2/models/{name}`
#[derive(Debug, Deserialize)]
pub struct ModelMetadataResponse {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<String>,
    pub platform: Option<String>,
    #[serde(default)]
    pub inputs: Vec<TensorMetadata>,
    #[serde(default)]
    pub outputs: Vec<TensorMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct TensorMetadata {
    pub name: String,
    pub datatype: String,
    /// -1 marks a variable dimension
    pub shape: Vec<i64>,
}

/// `POST /v2/models/{name}/infer`
#[derive(Debug, Serialize)]
pub struct InferRequest {
    pub inputs: Vec<InferInput>,
}

#[derive(Debug, Serialize)]
pub struct InferInput {
    pub name: String,
    pub shape: Vec<usize>,
    pub datatype: &'static str,
    pub data: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct InferResponse {
    pub model_name: String,
    #[serde(default)]
    pub outputs: Vec<InferOutput>,
}

/// Only numeric outputs are consumed; `data` is flattened row-major.
#[derive(Debug, Deserialize)]
pub struct InferOutput {
    pub name: String,
    pub shape: Vec<usize>,
    pub datatype: String,
    pub data: Vec<f64>,
}

pub const FP32: &str = "FP32";
