use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::inference::protocol::{
    InferInput, InferRequest, InferResponse, ModelMetadataResponse, FP32,
};
use crate::inference::runtime::{InferenceRuntime, ModelSession, Tensor};

/// Model server reached over the Open Inference Protocol (v2) REST API.
pub struct HttpInferenceRuntime {
    http_client: Client,
    base_url: String,
}

impl HttpInferenceRuntime {
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.inference_timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.inference_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/v2/models/{model}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(AppError::Inference(format!(
            "HTTP {}: {}",
            response.status(),
            response.text().await.unwrap_or_default()
        )))
    }
}

impl InferenceRuntime for HttpInferenceRuntime {
    async fn load(&self, model: &str) -> AppResult<ModelSession> {
        let response = self
            .http_client
            .get(self.model_url(model))
            .send()
            .await
            .map_err(|e| AppError::Inference(format!("Failed to load {model} model: {e}")))?;

        let metadata: ModelMetadataResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Inference(format!("Malformed metadata for {model}: {e}")))?;

        tracing::info!(
            model = %metadata.name,
            platform = ?metadata.platform,
            versions = ?metadata.versions,
            "Model session loaded"
        );

        session_from_metadata(metadata)
    }

    async fn run(
        &self,
        session: &ModelSession,
        inputs: HashMap<String, Tensor>,
    ) -> AppResult<HashMap<String, Tensor>> {
        let request = InferRequest {
            inputs: inputs
                .into_iter()
                .map(|(name, tensor)| InferInput {
                    name,
                    shape: tensor.shape,
                    datatype: FP32,
                    data: tensor.data,
                })
                .collect(),
        };

        let response = self
            .http_client
            .post(format!("{}/infer", self.model_url(&session.model)))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Inference(format!("Request failed: {e}")))?;

        let body: InferResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Inference(format!("Failed to parse response: {e}")))?;

        Ok(tensors_from_response(body))
    }
}

fn session_from_metadata(metadata: ModelMetadataResponse) -> AppResult<ModelSession> {
    if metadata.inputs.is_empty() || metadata.outputs.is_empty() {
        return Err(AppError::Inference(format!(
            "Model {} is malformed: missing input or output tensors",
            metadata.name
        )));
    }

    Ok(ModelSession {
        model: metadata.name,
        input_names: metadata.inputs.into_iter().map(|t| t.name).collect(),
        output_names: metadata.outputs.into_iter().map(|t| t.name).collect(),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn tensors_from_response(body: InferResponse) -> HashMap<String, Tensor> {
    tracing::debug!(model = %body.model_name, outputs = body.outputs.len(), "Inference complete");
    body.outputs
        .into_iter()
        .map(|out| {
            let tensor = Tensor {
                data: out.data.into_iter().map(|v| v as f32).collect(),
                shape: out.shape,
            };
            (out.name, tensor)
        })
        .collect()
}
