//! Process execution for planned ffmpeg/ffprobe commands.
//!
//! [`CommandRunner`] is the seam between planning and execution: the
//! renderer only ever sees argument lists, so tests substitute a runner
//! that fakes the tool's side effects.

use std::process::Stdio;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use kino_core::ffmpeg::CommandArgs;

use crate::error::PipelineError;

/// Default wall-clock limit for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Maximum stderr bytes kept in a [`PipelineError::CommandFailed`].
const MAX_STDERR_BYTES: usize = 4 * 1024;

/// Captured result of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Runs one fully-formed argument list (program name first).
///
/// A non-zero exit must be reported as [`PipelineError::CommandFailed`].
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        args: &[String],
    ) -> impl std::future::Future<Output = Result<CommandOutput, PipelineError>> + Send;
}

/// [`CommandRunner`] that spawns real child processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, PipelineError> {
        let (program, rest) = args.split_first().ok_or(PipelineError::EmptyCommand)?;

        // `kill_on_drop` reaps the child when the timeout drops the wait future.
        let child = tokio::process::Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PipelineError::Spawn {
                program: program.clone(),
                source,
            })?;

        let start = Instant::now();
        tracing::debug!(program = %program, args = ?rest, "Spawned command");

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_elapsed) => {
                return Err(PipelineError::Timeout {
                    program: program.clone(),
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(PipelineError::CommandFailed {
                program: program.clone(),
                exit_code: output.status.code(),
                stderr: tail(&stderr, MAX_STDERR_BYTES).to_string(),
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            duration_ms,
        })
    }
}

/// Run `commands` with at most `workers` in flight.
///
/// Results come back in the same order as `commands`; one failure does not
/// stop the others.
pub async fn run_commands<R: CommandRunner>(
    runner: &R,
    commands: &[CommandArgs],
    workers: usize,
) -> Vec<Result<CommandOutput, PipelineError>> {
    stream::iter(commands)
        .map(|args| async move {
            let result = runner.run(args).await;
            if let Err(e) = &result {
                tracing::warn!(command = ?args, error = %e, "Command failed");
            }
            result
        })
        .buffered(workers.max(1))
        .collect()
        .await
}

/// Last `max` bytes of `s`, cut on a char boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
