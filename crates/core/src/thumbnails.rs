//! Thumbnail candidate planning.
//!
//! A scene's nominal best frame (`thumbnail_tc`) is bracketed by a small set
//! of frame offsets. Each (scene, offset) pair becomes one
//! [`ThumbnailDirective`]: the computed timecode plus the ffmpeg argument
//! list that extracts it. The planner is pure; the pipeline runs the
//! commands and keeps the sharpest result.

use serde::{Deserialize, Serialize};

use crate::ffmpeg::{build_thumbnail_command, CommandArgs};
use crate::naming::{candidate_filename, source_video_path, thumbnail_output_path};
use crate::storyboard::SceneGroup;
use crate::timecode::{seconds_to_timecode, timecode_to_seconds};

/// Frame offsets applied around the nominal thumbnail frame, in order.
pub const DEFAULT_THUMBNAIL_OFFSETS: [i32; 3] = [-8, 0, 8];

/// Scene fields read by the thumbnail step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSceneRef {
    pub scene_number: i64,
    pub thumbnail_tc: String,
}

/// Input of the thumbnail step.
///
/// `fps` is optional on the wire; the worker falls back to its configured
/// frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub project_id: String,
    #[serde(default)]
    pub scenes: Vec<SceneGroup<ThumbnailSceneRef>>,
    #[serde(default)]
    pub fps: Option<u32>,
}

/// One candidate extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailDirective {
    pub storyboard_index: usize,
    pub scene_number: i64,
    pub offset: i32,
    pub timecode: String,
    pub command: CommandArgs,
}

/// Output of the thumbnail step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailPlan {
    pub project_id: String,
    pub fps: u32,
    pub commands: Vec<ThumbnailDirective>,
}

/// Timecode `offset` frames away from `base_tc`.
///
/// The shifted position is computed in seconds and truncated back to a
/// frame, so negative results clamp to the first frame.
pub fn offset_timecode(base_tc: &str, offset: i32, fps: u32) -> String {
    let base_seconds = timecode_to_seconds(base_tc, fps);
    let candidate_seconds = base_seconds + f64::from(offset) / f64::from(fps);
    seconds_to_timecode(candidate_seconds, fps)
}

/// Plan one directive per (storyboard, scene, offset).
///
/// Directives follow storyboard order, then scene order, then the declared
/// offset order. Offsets are not sorted.
///
/// ```
/// use kino_core::storyboard::SceneGroup;
/// use kino_core::thumbnails::{plan_thumbnail_directives, ThumbnailSceneRef};
///
/// let groups = vec![SceneGroup {
///     scenes: vec![ThumbnailSceneRef { scene_number: 1, thumbnail_tc: "00:00:10.00".into() }],
/// }];
/// let plan = plan_thumbnail_directives("p1", &groups, 24, &[-8, 0, 8]);
/// let tcs: Vec<&str> = plan.commands.iter().map(|d| d.timecode.as_str()).collect();
/// assert_eq!(tcs, ["00:00:09.16", "00:00:10.00", "00:00:10.08"]);
/// ```
pub fn plan_thumbnail_directives(
    project_id: &str,
    groups: &[SceneGroup<ThumbnailSceneRef>],
    fps: u32,
    offsets: &[i32],
) -> ThumbnailPlan {
    let input_path = source_video_path(project_id);
    let input_path = input_path.as_str();

    let commands = groups
        .iter()
        .enumerate()
        .flat_map(|(storyboard_index, group)| {
            group.scenes.iter().map(move |scene| (storyboard_index, scene))
        })
        .flat_map(move |(storyboard_index, scene)| {
            offsets.iter().map(move |&offset| {
                let timecode = offset_timecode(&scene.thumbnail_tc, offset, fps);
                let output_path =
                    thumbnail_output_path(project_id, storyboard_index, scene.scene_number, offset);
                ThumbnailDirective {
                    storyboard_index,
                    scene_number: scene.scene_number,
                    offset,
                    command: build_thumbnail_command(input_path, &timecode, &output_path),
                    timecode,
                }
            })
        })
        .collect();

    ThumbnailPlan {
        project_id: project_id.to_string(),
        fps,
        commands,
    }
}

/// Build the candidate commands for a single scene, writing into `output_dir`.
///
/// Files are named `thumb_<suffix>.webp` with the offset sign spelled out
/// (`thumb_m8.webp`, `thumb_p0.webp`). The last element of each command is
/// its output path.
pub fn build_thumbnail_commands(
    input_path: &str,
    thumbnail_tc: &str,
    output_dir: &str,
    offsets: &[i32],
    fps: u32,
) -> Vec<CommandArgs> {
    offsets
        .iter()
        .map(|&offset| {
            let timecode = offset_timecode(thumbnail_tc, offset, fps);
            let output_path = format!("{output_dir}/{}", candidate_filename(offset));
            build_thumbnail_command(input_path, &timecode, &output_path)
        })
        .collect()
}

/// Parse a comma-separated offset list such as `"-8, 0, 8"`.
///
/// Blank and non-integer tokens are skipped and duplicates dropped while
/// keeping first-seen order. An empty result falls back to `[0]`.
pub fn parse_thumbnail_offsets(raw: Option<&str>) -> Vec<i32> {
    let mut parsed: Vec<i32> = Vec::new();
    for token in raw.unwrap_or_default().split(',').map(str::trim) {
        if let Ok(offset) = token.parse::<i32>() {
            if !parsed.contains(&offset) {
                parsed.push(offset);
            }
        }
    }

    if parsed.is_empty() {
        vec![0]
    } else {
        parsed
    }
}
