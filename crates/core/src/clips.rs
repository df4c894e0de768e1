//! Clip-extraction planning.
//!
//! Each scene is cut from the project's source video between its
//! `start_tc` and `end_tc`, which are trusted as frame-accurate and passed
//! through untouched. Every scene gets a draft and a high-quality variant
//! writing to the same deterministic path.

use serde::{Deserialize, Serialize};

use crate::ffmpeg::{build_preset_clip_command, ClipPreset, ClipRequest, CommandArgs};
use crate::naming::{clip_output_path, source_video_path};
use crate::storyboard::SceneGroup;

/// Scene fields read by the clip step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSceneRef {
    pub scene_number: i64,
    pub start_tc: String,
    pub end_tc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storyboard_id: Option<String>,
}

/// Input of the clip step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipExtractRequest {
    pub project_id: String,
    #[serde(default)]
    pub scenes: Vec<SceneGroup<ClipSceneRef>>,
}

/// Both encoder variants for one scene.
///
/// `cpu` is the draft preset, `prod` the high-quality one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipCommandSet {
    pub storyboard_index: usize,
    pub scene_number: i64,
    pub cpu: CommandArgs,
    pub prod: CommandArgs,
}

/// Output of the clip step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipPlan {
    pub project_id: String,
    pub commands: Vec<ClipCommandSet>,
}

/// Plan draft and high-quality clip commands for every scene, in
/// (storyboard, scene) order.
pub fn plan_clip_commands(request: &ClipExtractRequest) -> ClipPlan {
    let project_id = request.project_id.as_str();
    let input_path = source_video_path(project_id);

    let commands = request
        .scenes
        .iter()
        .enumerate()
        .flat_map(|(storyboard_index, group)| {
            group.scenes.iter().map(move |scene| (storyboard_index, scene))
        })
        .map(|(storyboard_index, scene)| {
            let clip = ClipRequest {
                input_path: input_path.clone(),
                start_tc: scene.start_tc.clone(),
                end_tc: scene.end_tc.clone(),
                output_path: clip_output_path(project_id, storyboard_index, scene.scene_number),
            };
            ClipCommandSet {
                storyboard_index,
                scene_number: scene.scene_number,
                cpu: build_preset_clip_command(&clip, ClipPreset::Draft),
                prod: build_preset_clip_command(&clip, ClipPreset::HighQuality),
            }
        })
        .collect();

    ClipPlan {
        project_id: project_id.to_string(),
        commands,
    }
}
