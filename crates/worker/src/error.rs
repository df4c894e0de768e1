use kino_core::error::CoreError;
use kino_pipeline::error::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid step input: {0}")]
    Input(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
