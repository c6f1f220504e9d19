// Salary prediction: model bundle loading, feature alignment, inference.
// Inference is CPU-bound and runs inside tokio::task::spawn_blocking.

pub mod bundle;
pub mod encoder;
pub mod handlers;
pub mod pipeline;
pub mod regressor;

use thiserror::Error;

pub use bundle::ModelBundle;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Model or encoder not loaded")]
    ModelUnavailable,

    #[error("Encoder not fitted properly")]
    EncoderNotReady,

    #[error("Prediction failed: {0}")]
    Failed(String),
}
