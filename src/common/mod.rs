mod state;

pub use state::{AppState, Predictor};
