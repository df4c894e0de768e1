//! Workflow step handlers. Each step takes a JSON object and returns one.

use kino_core::clips::{plan_clip_commands, ClipExtractRequest};
use kino_core::posters::{build_poster_candidates, POSTER_CANDIDATE_LIMIT};
use kino_core::prompt::{storyboard_prompt_step, StoryboardPromptRequest};
use kino_core::storyboard::{
    normalize_scene_timecodes, parse_storyboards_payload, PosterCandidate, StoryboardResponse,
};
use kino_core::thumbnails::{plan_thumbnail_directives, ThumbnailRequest};
use kino_pipeline::posters::render_poster_candidates;
use kino_pipeline::probe::probe_duration;
use kino_pipeline::render::{render_storyboards, RenderSettings, SceneFailure};
use kino_pipeline::runner::CommandRunner;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WorkerConfig;
use crate::error::WorkerError;

/// Steps exposed on the command line, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Step {
    /// Record a video uploaded to remote storage.
    IngestUpload,
    /// Record a video stored on the local filesystem.
    IngestLocal,
    /// Echo a project status change to listeners.
    Notify,
    /// Assemble the storyboard generation request.
    StoryboardPrompt,
    /// Plan clip extraction commands.
    ExtractClips,
    /// Plan thumbnail candidate commands.
    Thumbnails,
    /// Repair storyboard timecodes against the source duration.
    Normalize,
    /// Render every scene's clip and thumbnail.
    Render,
    /// Render the project's poster candidate frames.
    Posters,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Self::IngestUpload => "ingest-upload",
            Self::IngestLocal => "ingest-local",
            Self::Notify => "notify",
            Self::StoryboardPrompt => "storyboard-prompt",
            Self::ExtractClips => "extract-clips",
            Self::Thumbnails => "thumbnails",
            Self::Normalize => "normalize",
            Self::Render => "render",
            Self::Posters => "posters",
        }
    }
}

// ---------------------------------------------------------------------------
// Step payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub project_id: String,
    pub asset_url: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAsset {
    pub project_id: String,
    pub asset_path: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub project_id: String,
    pub status: String,
}

/// Input of the `normalize` step.
#[derive(Debug, Clone, Deserialize)]
pub struct NormalizeRequest {
    pub project_id: String,
    /// Stored or freshly generated storyboard payload, in any accepted shape.
    pub payload: Value,
    /// Source duration; probed from the uploaded video when absent.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub fps: Option<u32>,
}

/// Input of the `render` step.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequest {
    pub project_id: String,
    pub payload: Value,
    #[serde(default)]
    pub fps: Option<u32>,
    /// Only read when poster candidates are rendered eagerly.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Input of the `posters` step.
#[derive(Debug, Clone, Deserialize)]
pub struct PostersRequest {
    pub project_id: String,
    pub payload: Value,
    /// Source duration; probed when absent or not positive.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
struct NormalizeOutput {
    project_id: String,
    duration_seconds: f64,
    repaired: usize,
    #[serde(flatten)]
    response: StoryboardResponse,
}

#[derive(Debug, Clone, Serialize)]
struct RenderOutput {
    project_id: String,
    rendered: usize,
    failures: Vec<SceneFailure>,
    poster_url: Option<String>,
    #[serde(flatten)]
    response: StoryboardResponse,
}

#[derive(Debug, Clone, Serialize)]
struct PostersOutput {
    project_id: String,
    poster_candidates: Vec<PosterCandidate>,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run `step` on `input`.
///
/// Only `normalize` (when probing), `render` and `posters` touch the
/// filesystem or spawn processes, through `runner`.
pub async fn run_step<R: CommandRunner>(
    step: Step,
    input: Value,
    config: &WorkerConfig,
    runner: &R,
) -> Result<Value, WorkerError> {
    tracing::debug!(step = step.name(), "Running step");

    let output = match step {
        Step::IngestUpload => {
            let asset: UploadedAsset = serde_json::from_value(input)?;
            tracing::info!(project_id = %asset.project_id, filename = %asset.filename, "Upload ingested");
            serde_json::json!({
                "project_id": asset.project_id,
                "asset_url": asset.asset_url,
                "filename": asset.filename,
                "status": "uploaded",
            })
        }
        Step::IngestLocal => {
            let asset: LocalAsset = serde_json::from_value(input)?;
            tracing::info!(project_id = %asset.project_id, asset_path = %asset.asset_path, "Local file ingested");
            serde_json::json!({
                "project_id": asset.project_id,
                "asset_path": asset.asset_path,
                "filename": asset.filename,
                "status": "local_stored",
            })
        }
        Step::Notify => {
            let notice: StatusNotice = serde_json::from_value(input)?;
            tracing::info!(project_id = %notice.project_id, status = %notice.status, "Status notified");
            serde_json::json!({
                "project_id": notice.project_id,
                "status": notice.status,
                "notified": true,
            })
        }
        Step::StoryboardPrompt => {
            let request: StoryboardPromptRequest = serde_json::from_value(input)?;
            serde_json::to_value(storyboard_prompt_step(request))?
        }
        Step::ExtractClips => {
            let request: ClipExtractRequest = serde_json::from_value(input)?;
            let plan = plan_clip_commands(&request);
            tracing::info!(project_id = %plan.project_id, clips = plan.commands.len(), "Clip commands planned");
            serde_json::to_value(plan)?
        }
        Step::Thumbnails => {
            let request: ThumbnailRequest = serde_json::from_value(input)?;
            let fps = request.fps.unwrap_or(config.fps);
            let plan = plan_thumbnail_directives(
                &request.project_id,
                &request.scenes,
                fps,
                &config.thumbnail_offsets,
            );
            tracing::info!(project_id = %plan.project_id, fps, frames = plan.commands.len(), "Thumbnail commands planned");
            serde_json::to_value(plan)?
        }
        Step::Normalize => {
            let request: NormalizeRequest = serde_json::from_value(input)?;
            serde_json::to_value(normalize(request, config, runner).await?)?
        }
        Step::Render => {
            let request: RenderRequest = serde_json::from_value(input)?;
            serde_json::to_value(render(request, config, runner).await?)?
        }
        Step::Posters => {
            let request: PostersRequest = serde_json::from_value(input)?;
            serde_json::to_value(posters(request, config, runner).await?)?
        }
    };

    Ok(output)
}

async fn normalize<R: CommandRunner>(
    request: NormalizeRequest,
    config: &WorkerConfig,
    runner: &R,
) -> Result<NormalizeOutput, WorkerError> {
    let mut response = parse_storyboards_payload(request.payload)?;
    let fps = request.fps.unwrap_or(config.fps);

    let duration_seconds = match request.duration_seconds {
        Some(duration) => duration,
        None => {
            let source = config.source_video(&request.project_id);
            probe_duration(runner, &source.to_string_lossy()).await
        }
    };

    let repaired = normalize_scene_timecodes(&mut response, duration_seconds, fps);
    tracing::info!(project_id = %request.project_id, duration_seconds, repaired, "Storyboard timecodes normalized");

    Ok(NormalizeOutput {
        project_id: request.project_id,
        duration_seconds,
        repaired,
        response,
    })
}

async fn render<R: CommandRunner>(
    request: RenderRequest,
    config: &WorkerConfig,
    runner: &R,
) -> Result<RenderOutput, WorkerError> {
    let mut response = parse_storyboards_payload(request.payload)?;
    let settings = render_settings(&request.project_id, request.fps, config);

    let report = render_storyboards(runner, &request.project_id, &mut response, &settings).await;

    if config.eager_poster_candidates {
        let duration = resolve_duration(&request.project_id, request.duration_seconds, config, runner).await;
        let candidates =
            build_poster_candidates(&response, POSTER_CANDIDATE_LIMIT, duration, settings.fps);
        let rendered = render_poster_candidates(runner, &request.project_id, candidates, &settings).await;
        response.poster_candidates = Some(rendered);
    }

    Ok(RenderOutput {
        project_id: request.project_id,
        rendered: report.rendered,
        failures: report.failures,
        poster_url: report.poster_url,
        response,
    })
}

async fn posters<R: CommandRunner>(
    request: PostersRequest,
    config: &WorkerConfig,
    runner: &R,
) -> Result<PostersOutput, WorkerError> {
    let response = parse_storyboards_payload(request.payload)?;
    let settings = render_settings(&request.project_id, request.fps, config);
    let duration = resolve_duration(&request.project_id, request.duration_seconds, config, runner).await;

    let limit = request.limit.unwrap_or(POSTER_CANDIDATE_LIMIT);
    let candidates = build_poster_candidates(&response, limit, duration, settings.fps);
    tracing::info!(project_id = %request.project_id, candidates = candidates.len(), "Poster candidates planned");

    let poster_candidates = render_poster_candidates(runner, &request.project_id, candidates, &settings).await;

    Ok(PostersOutput {
        project_id: request.project_id,
        poster_candidates,
    })
}

fn render_settings(project_id: &str, fps: Option<u32>, config: &WorkerConfig) -> RenderSettings {
    RenderSettings {
        project_dir: config.project_media_dir(project_id),
        input_path: config.source_video(project_id),
        media_base_url: config.media_base_url.clone(),
        fps: fps.unwrap_or(config.fps),
        offsets: config.thumbnail_offsets.clone(),
        encoder: config.clip_encoder(),
        workers: config.render_workers,
    }
}

/// Positive duration from the request, else from the uploaded video.
/// `None` when neither is known.
async fn resolve_duration<R: CommandRunner>(
    project_id: &str,
    requested: Option<f64>,
    config: &WorkerConfig,
    runner: &R,
) -> Option<f64> {
    let duration = match requested.filter(|d| *d > 0.0) {
        Some(duration) => duration,
        None => {
            let source = config.source_video(project_id);
            probe_duration(runner, &source.to_string_lossy()).await
        }
    };
    Some(duration).filter(|d| *d > 0.0)
}
