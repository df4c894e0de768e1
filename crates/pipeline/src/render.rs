//! Per-scene asset rendering: one clip plus one chosen thumbnail.
//!
//! Layout under the project's media directory, with storyboards and scenes
//! numbered from 1:
//!
//! ```text
//! clips/board_{n}/scene_{nn}.mp4
//! thumbs/board_{n}/scene_{nn}.webp
//! thumbs/board_{n}/scene_{nn}_candidates/   (removed after selection)
//! ```

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use kino_core::ffmpeg::{
    build_nvenc_clip_command, build_x264_clip_command, ClipRequest, X264Settings,
};
use kino_core::naming::{board_dir_name, media_url, scene_asset_names};
use kino_core::storyboard::StoryboardResponse;
use kino_core::thumbnails::build_thumbnail_commands;
use serde::Serialize;

use crate::error::PipelineError;
use crate::runner::CommandRunner;
use crate::sharpness::pick_sharpest;

/// Video encoder used for scene clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipEncoder {
    X264(X264Settings),
    Nvenc,
}

impl Default for ClipEncoder {
    fn default() -> Self {
        Self::X264(X264Settings::default())
    }
}

/// Everything needed to render one scene.
#[derive(Debug, Clone)]
pub struct SceneRenderRequest {
    pub input_path: PathBuf,
    pub clip_dir: PathBuf,
    pub thumb_dir: PathBuf,
    pub scene_asset_index: usize,
    pub start_tc: String,
    pub end_tc: String,
    pub thumbnail_tc: String,
    pub fps: u32,
    pub offsets: Vec<i32>,
    pub encoder: ClipEncoder,
}

/// File names of a rendered scene, relative to its clip/thumb directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneAssets {
    pub clip_name: String,
    pub thumb_name: String,
}

/// Render the clip, extract the thumbnail candidates, keep the sharpest.
///
/// Candidate files and their scratch directory are removed afterwards.
pub async fn render_scene_assets<R: CommandRunner>(
    runner: &R,
    request: &SceneRenderRequest,
) -> Result<SceneAssets, PipelineError> {
    let (clip_name, thumb_name) = scene_asset_names(request.scene_asset_index);
    let clip_path = request.clip_dir.join(&clip_name);
    let thumb_path = request.thumb_dir.join(&thumb_name);
    let input_path = path_str(&request.input_path);

    tokio::fs::create_dir_all(&request.clip_dir).await?;
    tokio::fs::create_dir_all(&request.thumb_dir).await?;

    let clip = ClipRequest {
        input_path: input_path.clone(),
        start_tc: request.start_tc.clone(),
        end_tc: request.end_tc.clone(),
        output_path: path_str(&clip_path),
    };
    let clip_command = match &request.encoder {
        ClipEncoder::X264(settings) => build_x264_clip_command(&clip, settings),
        ClipEncoder::Nvenc => build_nvenc_clip_command(&clip),
    };
    runner.run(&clip_command).await?;

    let candidate_dir = request
        .thumb_dir
        .join(format!("scene_{:02}_candidates", request.scene_asset_index));
    extract_sharpest_frame(
        runner,
        &input_path,
        &request.thumbnail_tc,
        &candidate_dir,
        &request.offsets,
        request.fps,
        &thumb_path,
    )
    .await?;

    Ok(SceneAssets {
        clip_name,
        thumb_name,
    })
}

/// Extract one candidate per offset around `timecode` into `scratch_dir`
/// and copy the sharpest to `output`.
///
/// The candidates and `scratch_dir` are removed whether or not extraction
/// succeeded.
pub(crate) async fn extract_sharpest_frame<R: CommandRunner>(
    runner: &R,
    input_path: &str,
    timecode: &str,
    scratch_dir: &Path,
    offsets: &[i32],
    fps: u32,
    output: &Path,
) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(scratch_dir).await?;

    let commands = build_thumbnail_commands(input_path, timecode, &path_str(scratch_dir), offsets, fps);
    let candidates: Vec<PathBuf> = commands
        .iter()
        .filter_map(|command| command.last())
        .map(PathBuf::from)
        .collect();

    let result = async {
        for command in &commands {
            runner.run(command).await?;
        }
        let picked = {
            let candidates = candidates.clone();
            tokio::task::spawn_blocking(move || pick_sharpest(&candidates)).await??
        };
        tokio::fs::copy(&picked, output).await?;
        Ok::<_, PipelineError>(())
    }
    .await;

    for path in &candidates {
        if let Err(e) = remove_ignoring_missing(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove thumbnail candidate");
        }
    }
    // Left behind if something else wrote into it.
    let _ = tokio::fs::remove_dir(scratch_dir).await;

    result
}

// ---------------------------------------------------------------------------
// Whole-storyboard rendering
// ---------------------------------------------------------------------------

/// Settings shared by every scene of a storyboard render.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Project media directory; `clips/` and `thumbs/` are created inside.
    pub project_dir: PathBuf,
    pub input_path: PathBuf,
    pub media_base_url: String,
    pub fps: u32,
    pub offsets: Vec<i32>,
    pub encoder: ClipEncoder,
    /// Scenes rendered concurrently.
    pub workers: usize,
}

/// Per-scene failure recorded by [`render_storyboards`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneFailure {
    pub storyboard_index: usize,
    pub scene_number: i64,
    pub error: String,
}

/// Summary of a storyboard render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub rendered: usize,
    pub failures: Vec<SceneFailure>,
    /// First non-empty scene thumbnail, used as the project poster.
    pub poster_url: Option<String>,
}

/// Render every scene and fill in its `clip_url` / `thumbnail_url`.
///
/// Scenes are rendered with at most `settings.workers` in flight. A failing
/// scene keeps its URLs unset and is listed in the report; the others
/// still render. The poster is the first freshly rendered, non-empty
/// thumbnail in storyboard order, else the first scene that already had a
/// `thumbnail_url`.
pub async fn render_storyboards<R: CommandRunner>(
    runner: &R,
    project_id: &str,
    response: &mut StoryboardResponse,
    settings: &RenderSettings,
) -> RenderReport {
    let jobs: Vec<(usize, usize, i64, SceneRenderRequest)> = response
        .storyboards
        .iter()
        .enumerate()
        .flat_map(|(board_index, board)| {
            board
                .scenes
                .iter()
                .enumerate()
                .map(move |(scene_index, scene)| (board_index, scene_index, scene))
        })
        .map(|(board_index, scene_index, scene)| {
            let request = SceneRenderRequest {
                input_path: settings.input_path.clone(),
                clip_dir: settings.project_dir.join("clips").join(board_dir_name(board_index)),
                thumb_dir: settings.project_dir.join("thumbs").join(board_dir_name(board_index)),
                scene_asset_index: scene_index + 1,
                start_tc: scene.start_tc.clone(),
                end_tc: scene.end_tc.clone(),
                thumbnail_tc: scene.thumbnail_tc.clone(),
                fps: settings.fps,
                offsets: settings.offsets.clone(),
                encoder: settings.encoder.clone(),
            };
            (board_index, scene_index, scene.scene_number, request)
        })
        .collect();

    tracing::info!(project_id, scenes = jobs.len(), workers = settings.workers, "Rendering scene assets");

    let results: Vec<_> = stream::iter(jobs)
        .map(|(board_index, scene_index, scene_number, request)| async move {
            let result = render_scene_assets(runner, &request).await;
            (board_index, scene_index, scene_number, result)
        })
        .buffered(settings.workers.max(1))
        .collect()
        .await;

    let mut report = RenderReport::default();
    for (board_index, scene_index, scene_number, result) in results {
        match result {
            Ok(assets) => {
                let board_dir = board_dir_name(board_index);
                let scene = &mut response.storyboards[board_index].scenes[scene_index];
                scene.clip_url = Some(media_url(
                    &settings.media_base_url,
                    project_id,
                    &format!("clips/{board_dir}/{}", assets.clip_name),
                ));
                let thumb_path = settings
                    .project_dir
                    .join("thumbs")
                    .join(&board_dir)
                    .join(&assets.thumb_name);
                let thumbnail_url = media_url(
                    &settings.media_base_url,
                    project_id,
                    &format!("thumbs/{board_dir}/{}", assets.thumb_name),
                );
                if report.poster_url.is_none() && non_empty_file(&thumb_path).await {
                    report.poster_url = Some(thumbnail_url.clone());
                }
                scene.thumbnail_url = Some(thumbnail_url);
                report.rendered += 1;
            }
            Err(e) => {
                tracing::warn!(
                    project_id,
                    storyboard_index = board_index,
                    scene_number,
                    error = %e,
                    "Scene render failed",
                );
                report.failures.push(SceneFailure {
                    storyboard_index: board_index,
                    scene_number,
                    error: e.to_string(),
                });
            }
        }
    }

    if report.poster_url.is_none() {
        report.poster_url = response
            .storyboards
            .iter()
            .flat_map(|board| board.scenes.iter())
            .filter_map(|scene| scene.thumbnail_url.as_deref())
            .find(|url| !url.is_empty())
            .map(str::to_string);
    }

    tracing::info!(
        project_id,
        rendered = report.rendered,
        failed = report.failures.len(),
        "Scene rendering finished",
    );
    report
}

pub(crate) async fn non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.len() > 0)
}

pub(crate) fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

async fn remove_ignoring_missing(path: &Path) -> Result<(), PipelineError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
