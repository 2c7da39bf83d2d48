//! The capability the prediction adapter is written against: load a model
//! session, then run named tensors through it.

use std::collections::HashMap;
use std::future::Future;

use crate::error::{AppError, AppResult};

/// Dense row-major `f32` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

impl Tensor {
    /// # Errors
    ///
    /// Returns `AppError::Inference` if `shape` does not describe `data.len()` elements.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> AppResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(AppError::Inference(format!(
                "Tensor shape {shape:?} expects {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self { data, shape })
    }

    /// A single-row batch: shape `[1, len]`.
    #[must_use]
    pub fn row(data: Vec<f32>) -> Self {
        let shape = vec![1, data.len()];
        Self { data, shape }
    }
}

/// Handle to a loaded model plus the tensor names it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSession {
    pub model: String,
    pub input_names: Vec<String>,
    pub output_names: Vec<String>,
}

impl ModelSession {
    /// # Errors
    ///
    /// Returns `AppError::Inference` if the model declares no inputs.
    pub fn primary_input(&self) -> AppResult<&str> {
        self.input_names
            .first()
            .map(String::as_str)
            .ok_or_else(|| AppError::Inference(format!("Model {} declares no inputs", self.model)))
    }

    /// # Errors
    ///
    /// Returns `AppError::Inference` if the model declares no outputs.
    pub fn primary_output(&self) -> AppResult<&str> {
        self.output_names
            .first()
            .map(String::as_str)
            .ok_or_else(|| AppError::Inference(format!("Model {} declares no outputs", self.model)))
    }
}

/// An inference engine that owns the models; this crate only invokes it.
pub trait InferenceRuntime: Send + Sync + 'static {
    /// Acquire a session for `model`. Fails when the model is unreachable or malformed.
    fn load(&self, model: &str) -> impl Future<Output = AppResult<ModelSession>> + Send;

    /// Run `inputs` through `session`, returning the model outputs by name.
    fn run(
        &self,
        session: &ModelSession,
        inputs: HashMap<String, Tensor>,
    ) -> impl Future<Output = AppResult<HashMap<String, Tensor>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_must_cover_data() {
        assert!(Tensor::new(vec![0.0; 6], vec![2, 3]).is_ok());
        assert!(Tensor::new(vec![0.0; 5], vec![2, 3]).is_err());
    }

    #[test]
    fn row_tensor_is_a_batch_of_one() {
        let t = Tensor::row(vec![1.0, 2.0, 3.0]);
        assert_eq!(t.shape, vec![1, 3]);
    }

    #[test]
    fn session_without_outputs_is_rejected() {
        let session = ModelSession {
            model: "m".to_string(),
            input_names: vec!["x".to_string()],
            output_names: vec![],
        };
        assert_eq!(session.primary_input().unwrap(), "x");
        assert!(session.primary_output().is_err());
    }
}
