//! Poster candidate rendering.
//!
//! Each candidate gets the sharpest frame around its timestamp, written to
//! `posters/candidates/{id}.webp` under the project's media directory.

use kino_core::naming::{media_url, poster_candidate_id, POSTER_CANDIDATES_DIR};
use kino_core::storyboard::PosterCandidate;

use crate::render::{extract_sharpest_frame, non_empty_file, path_str, RenderSettings};
use crate::runner::CommandRunner;

/// Render `candidates` one after another and return those that produced a
/// non-empty image, with `id` and `image_url` set.
///
/// Candidates without a timestamp, failing extractions and empty outputs
/// are skipped and logged; they never fail the batch.
pub async fn render_poster_candidates<R: CommandRunner>(
    runner: &R,
    project_id: &str,
    candidates: Vec<PosterCandidate>,
    settings: &RenderSettings,
) -> Vec<PosterCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let posters_dir = settings.project_dir.join(POSTER_CANDIDATES_DIR);
    if let Err(e) = tokio::fs::create_dir_all(&posters_dir).await {
        tracing::warn!(project_id, error = %e, "Could not create poster directory");
        return Vec::new();
    }
    let input_path = path_str(&settings.input_path);

    let mut rendered = Vec::with_capacity(candidates.len());
    for mut candidate in candidates {
        if candidate.id.is_empty() {
            candidate.id = poster_candidate_id(rendered.len() + 1);
        }
        if candidate.timestamp.is_empty() {
            continue;
        }

        let output_name = format!("{}.webp", candidate.id);
        let output_path = posters_dir.join(&output_name);
        let scratch_dir = posters_dir.join(format!("{}_candidates", candidate.id));

        let extracted = extract_sharpest_frame(
            runner,
            &input_path,
            &candidate.timestamp,
            &scratch_dir,
            &settings.offsets,
            settings.fps,
            &output_path,
        )
        .await;

        if let Err(e) = extracted {
            tracing::warn!(
                project_id,
                candidate_id = %candidate.id,
                timestamp = %candidate.timestamp,
                error = %e,
                "Poster candidate render failed",
            );
            continue;
        }
        if !non_empty_file(&output_path).await {
            tracing::warn!(project_id, candidate_id = %candidate.id, "Poster candidate image is empty");
            let _ = tokio::fs::remove_file(&output_path).await;
            continue;
        }

        candidate.image_url = Some(media_url(
            &settings.media_base_url,
            project_id,
            &format!("{POSTER_CANDIDATES_DIR}/{output_name}"),
        ));
        rendered.push(candidate);
    }

    tracing::info!(project_id, rendered = rendered.len(), "Poster candidates rendered");
    rendered
}
