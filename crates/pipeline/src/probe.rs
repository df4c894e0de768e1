//! Source media probing.

use kino_core::ffmpeg::{build_probe_command, parse_duration, parse_framerate, FfprobeOutput};

use crate::error::PipelineError;
use crate::runner::CommandRunner;

/// Duration and frame rate of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub fps: f64,
}

/// Run ffprobe on `input_path` and parse its JSON report.
pub async fn probe_media<R: CommandRunner>(
    runner: &R,
    input_path: &str,
) -> Result<MediaInfo, PipelineError> {
    let output = runner.run(&build_probe_command(input_path)).await?;
    let probe: FfprobeOutput = serde_json::from_str(&output.stdout).map_err(|e| {
        kino_core::error::CoreError::InvalidInput(format!("unparseable ffprobe output: {e}"))
    })?;

    Ok(MediaInfo {
        duration_secs: parse_duration(&probe),
        fps: parse_framerate(&probe),
    })
}

/// Source duration in seconds, `0.0` when ffprobe is missing or fails.
///
/// A zero duration disables the duration-based clamping in timecode repair.
pub async fn probe_duration<R: CommandRunner>(runner: &R, input_path: &str) -> f64 {
    match probe_media(runner, input_path).await {
        Ok(info) => info.duration_secs,
        Err(e) => {
            tracing::warn!(input_path, error = %e, "Could not probe source duration");
            0.0
        }
    }
}
