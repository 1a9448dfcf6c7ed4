use thiserror::Error;

use acc_core::AccError;
use acc_matrix::MatrixError;
use acc_network::NetworkError;
use acc_output::OutputError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline configuration error: {0}")]
    Config(String),

    #[error("checkpoint {path}: {message}")]
    Checkpoint { path: String, message: String },

    #[error("no cost row was computed for origin node {0}")]
    MissingRow(i64),

    #[error(transparent)]
    Core(#[from] AccError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
