//! Poster candidate planning.
//!
//! Candidates come from the generator's own `poster_candidates` first, then
//! from each scene's thumbnail frame (or its start when no thumbnail is
//! set). Timestamps are deduplicated after normalization.

use std::collections::HashSet;

use crate::naming::poster_candidate_id;
use crate::storyboard::{PosterCandidate, StoryboardResponse};
use crate::timecode::{normalize_timestamp_seconds, seconds_to_timecode};

/// Maximum number of poster candidates offered per project.
pub const POSTER_CANDIDATE_LIMIT: usize = 20;

/// Collect up to `limit` poster candidates with fresh `poster_NN` ids.
///
/// With a `duration_seconds`, each timestamp is resolved and rewritten in
/// canonical form the same way scene timecodes are repaired; without one
/// it is kept verbatim. Candidates never carry an `image_url` here.
pub fn build_poster_candidates(
    response: &StoryboardResponse,
    limit: usize,
    duration_seconds: Option<f64>,
    fps: u32,
) -> Vec<PosterCandidate> {
    let upstream = response
        .poster_candidates
        .iter()
        .flatten()
        .map(|c| (c.timestamp.as_str(), c.description.as_deref()));

    let from_scenes = response
        .storyboards
        .iter()
        .flat_map(|board| board.scenes.iter())
        .map(|scene| {
            let timestamp = if scene.thumbnail_tc.is_empty() {
                scene.start_tc.as_str()
            } else {
                scene.thumbnail_tc.as_str()
            };
            let description = non_empty(&scene.description).or(non_empty(&scene.emotional_beat));
            (timestamp, description)
        });

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for (timestamp, description) in upstream.chain(from_scenes) {
        if candidates.len() >= limit {
            break;
        }
        if timestamp.is_empty() {
            continue;
        }
        let timestamp = match duration_seconds {
            Some(duration) => {
                seconds_to_timecode(normalize_timestamp_seconds(Some(timestamp), duration, fps), fps)
            }
            None => timestamp.to_string(),
        };
        if !seen.insert(timestamp.clone()) {
            continue;
        }
        candidates.push(PosterCandidate {
            id: poster_candidate_id(candidates.len() + 1),
            timestamp,
            description: description.and_then(non_empty).map(str::to_string),
            image_url: None,
        });
    }

    candidates
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.is_empty())
}
