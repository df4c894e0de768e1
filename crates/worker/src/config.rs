//! Worker configuration from the environment.
//!
//! | Variable                     | Default     | Description                              |
//! |------------------------------|-------------|------------------------------------------|
//! | `KINO_FPS`                   | `24`        | Frame rate of upstream timecodes (> 0)   |
//! | `KINO_THUMBNAIL_OFFSETS`     | `-8,0,8`    | Candidate frame offsets, in order        |
//! | `KINO_FFMPEG_PRESET`         | `ultrafast` | x264 preset for rendered clips           |
//! | `KINO_FFMPEG_CRF`            | `18`        | x264 CRF for rendered clips              |
//! | `KINO_USE_NVENC`             | `false`     | Render clips with `h264_nvenc`           |
//! | `KINO_RENDER_WORKERS`        | 2 (1 on single-core hosts) | Scenes rendered concurrently |
//! | `KINO_COMMAND_TIMEOUT_SECS`  | `600`       | Kill a single ffmpeg run after this long |
//! | `KINO_WORK_DIR`              | `.`         | Root holding `uploads/` and `media/`     |
//! | `KINO_MEDIA_BASE_URL`        | `/media`    | Public prefix of rendered asset URLs     |
//! | `KINO_EAGER_POSTER_CANDIDATES` | `false`   | Render poster candidates with the scenes |

use std::path::PathBuf;
use std::time::Duration;

use kino_core::ffmpeg::{X264Settings, DEFAULT_X264_CRF, DEFAULT_X264_PRESET};
use kino_core::thumbnails::{parse_thumbnail_offsets, DEFAULT_THUMBNAIL_OFFSETS};
use kino_core::timecode::{validate_fps, DEFAULT_FPS};
use kino_pipeline::render::ClipEncoder;

use crate::error::WorkerError;

/// Default per-command timeout in seconds.
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Default public prefix for rendered assets.
const DEFAULT_MEDIA_BASE_URL: &str = "/media";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub fps: u32,
    pub thumbnail_offsets: Vec<i32>,
    pub x264: X264Settings,
    pub use_nvenc: bool,
    pub render_workers: usize,
    pub command_timeout: Duration,
    pub work_dir: PathBuf,
    pub media_base_url: String,
    pub eager_poster_candidates: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            thumbnail_offsets: DEFAULT_THUMBNAIL_OFFSETS.to_vec(),
            x264: X264Settings::default(),
            use_nvenc: false,
            render_workers: default_render_workers(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            work_dir: PathBuf::from("."),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            eager_poster_candidates: false,
        }
    }
}

impl WorkerConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let fps = match lookup("KINO_FPS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| WorkerError::Config(format!("KINO_FPS must be a positive integer, got '{raw}'")))?,
            None => defaults.fps,
        };
        validate_fps(fps)?;

        let thumbnail_offsets = match lookup("KINO_THUMBNAIL_OFFSETS") {
            Some(raw) => parse_thumbnail_offsets(Some(&raw)),
            None => defaults.thumbnail_offsets,
        };

        let x264 = X264Settings {
            preset: lookup("KINO_FFMPEG_PRESET").unwrap_or_else(|| DEFAULT_X264_PRESET.to_string()),
            crf: lookup("KINO_FFMPEG_CRF").unwrap_or_else(|| DEFAULT_X264_CRF.to_string()),
        };

        let render_workers = lookup("KINO_RENDER_WORKERS")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .map(|n| n.max(1))
            .unwrap_or(defaults.render_workers);

        let command_timeout = lookup("KINO_COMMAND_TIMEOUT_SECS")
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.command_timeout);

        Ok(Self {
            fps,
            thumbnail_offsets,
            x264,
            use_nvenc: lookup("KINO_USE_NVENC").is_some_and(|raw| parse_bool(&raw)),
            render_workers,
            command_timeout,
            work_dir: lookup("KINO_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            media_base_url: lookup("KINO_MEDIA_BASE_URL").unwrap_or(defaults.media_base_url),
            eager_poster_candidates: lookup("KINO_EAGER_POSTER_CANDIDATES")
                .is_some_and(|raw| parse_bool(&raw)),
        })
    }

    /// Encoder selected by `KINO_USE_NVENC` and the x264 settings.
    pub fn clip_encoder(&self) -> ClipEncoder {
        if self.use_nvenc {
            ClipEncoder::Nvenc
        } else {
            ClipEncoder::X264(self.x264.clone())
        }
    }

    /// Location of a project's uploaded source video.
    pub fn source_video(&self, project_id: &str) -> PathBuf {
        self.work_dir.join("uploads").join(format!("{project_id}.mp4"))
    }

    /// Directory receiving a project's rendered clips and thumbnails.
    pub fn project_media_dir(&self, project_id: &str) -> PathBuf {
        self.work_dir.join("media").join(project_id)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_render_workers() -> usize {
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    if cpus >= 2 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<WorkerConfig, WorkerError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.fps, 24);
        assert_eq!(config.thumbnail_offsets, vec![-8, 0, 8]);
        assert_eq!(config.x264, X264Settings::default());
        assert!(!config.use_nvenc);
        assert!(config.render_workers >= 1);
        assert_eq!(config.command_timeout, Duration::from_secs(600));
        assert_eq!(config.media_base_url, "/media");
        assert!(!config.eager_poster_candidates);
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("KINO_FPS", "30"),
            ("KINO_THUMBNAIL_OFFSETS", "0, 12, 12"),
            ("KINO_FFMPEG_PRESET", "medium"),
            ("KINO_FFMPEG_CRF", "23"),
            ("KINO_USE_NVENC", "Yes"),
            ("KINO_RENDER_WORKERS", "0"),
            ("KINO_WORK_DIR", "/srv/kino"),
            ("KINO_EAGER_POSTER_CANDIDATES", "true"),
        ])
        .unwrap();

        assert_eq!(config.fps, 30);
        assert_eq!(config.thumbnail_offsets, vec![0, 12]);
        assert_eq!(config.x264.preset, "medium");
        assert_eq!(config.x264.crf, "23");
        assert_eq!(config.clip_encoder(), ClipEncoder::Nvenc);
        assert_eq!(config.render_workers, 1);
        assert!(config.eager_poster_candidates);
        assert_eq!(config.source_video("p1"), PathBuf::from("/srv/kino/uploads/p1.mp4"));
        assert_eq!(config.project_media_dir("p1"), PathBuf::from("/srv/kino/media/p1"));
    }

    #[test]
    fn rejects_zero_fps() {
        assert_matches!(load(&[("KINO_FPS", "0")]), Err(WorkerError::Core(_)));
    }

    #[test]
    fn rejects_non_numeric_fps() {
        assert_matches!(load(&[("KINO_FPS", "24fps")]), Err(WorkerError::Config(_)));
    }

    #[test]
    fn bool_parsing() {
        assert!(parse_bool(" on "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool(""));
    }
}
