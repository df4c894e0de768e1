use kino_core::error::CoreError;

/// Error type for command execution and asset rendering.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("empty command: no program given")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed (exit code {exit_code:?}): {stderr}")]
    CommandFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {elapsed_ms}ms")]
    Timeout { program: String, elapsed_ms: u64 },

    #[error("no thumbnail candidates to choose from")]
    NoCandidates,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
