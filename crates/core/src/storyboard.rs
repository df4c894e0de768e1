//! Storyboard data model and timecode repair.
//!
//! Storyboards arrive as JSON from the upstream generator. The model is
//! lenient about missing narrative fields; [`normalize_scene_timecodes`]
//! rewrites every timecode into canonical `HH:MM:SS.FF` form inside the
//! media's bounds before any command is planned from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::timecode::{frame_duration, normalize_timestamp_seconds, seconds_to_timecode};

/// Clip length (in frames) used when a scene's end does not follow its start.
const DEFAULT_CLIP_FRAMES: f64 = 12.0;

/// Floor for the repaired clip length in seconds.
const MIN_DEFAULT_CLIP_SECS: f64 = 1.0;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// One shot in a storyboard, bounded by start/end timecodes in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: i64,
    #[serde(default)]
    pub start_tc: String,
    #[serde(default)]
    pub end_tc: String,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub thumbnail_tc: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emotional_beat: String,
    #[serde(default)]
    pub music_idea: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// A complete trailer cut: an ordered list of scenes plus its pitch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storyboard {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub target_length: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

/// A single frame proposed as poster material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosterCandidate {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "timecode", alias = "tc")]
    pub timestamp: String,
    #[serde(default, alias = "reason", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// The generator's full response for one film.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryboardResponse {
    #[serde(default)]
    pub movie_title: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub storyboards: Vec<Storyboard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_candidates: Option<Vec<PosterCandidate>>,
}

/// Pipeline step input shape: one group per storyboard, holding only the
/// per-scene fields the step reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "S: Deserialize<'de>"))]
pub struct SceneGroup<S> {
    #[serde(default)]
    pub scenes: Vec<S>,
}

// ---------------------------------------------------------------------------
// Payload handling
// ---------------------------------------------------------------------------

/// Unwrap the shapes in which a storyboard payload may be stored.
///
/// - an object is returned as-is;
/// - a one-element array wrapping a response object is unwrapped;
/// - any other array is taken as the list of storyboards;
/// - everything else yields `None`.
pub fn normalize_storyboards_payload(payload: Value) -> Option<Value> {
    match payload {
        Value::Object(_) => Some(payload),
        Value::Array(mut items) => {
            let wraps_response = items.len() == 1
                && items[0].as_object().is_some_and(|obj| {
                    ["storyboards", "movie_title", "poster_candidates"]
                        .iter()
                        .any(|key| obj.contains_key(*key))
                });
            if wraps_response {
                items.pop()
            } else {
                Some(serde_json::json!({ "storyboards": items }))
            }
        }
        _ => None,
    }
}

/// Parse a stored or freshly generated payload into a [`StoryboardResponse`].
pub fn parse_storyboards_payload(payload: Value) -> Result<StoryboardResponse, CoreError> {
    let normalized = normalize_storyboards_payload(payload).ok_or_else(|| {
        CoreError::InvalidInput("storyboard payload must be an object or an array".to_string())
    })?;
    serde_json::from_value(normalized)
        .map_err(|e| CoreError::InvalidInput(format!("malformed storyboard payload: {e}")))
}

// ---------------------------------------------------------------------------
// Timecode repair
// ---------------------------------------------------------------------------

/// Rewrite every scene and poster-candidate timecode in canonical form.
///
/// Per scene:
/// - start/end/thumbnail are resolved with [`normalize_timestamp_seconds`];
/// - an end at or before `start + 1 frame` is pushed to
///   `start + max(1s, 12 frames)`, then clamped to the media duration;
/// - if the clip is still shorter than a frame, the start is pulled back;
/// - a thumbnail outside the clip moves to the clip midpoint;
/// - `duration_seconds` is recomputed, rounded to two decimals.
///
/// Returns how many scenes and candidates changed.
pub fn normalize_scene_timecodes(
    response: &mut StoryboardResponse,
    duration_seconds: f64,
    fps: u32,
) -> usize {
    let min_clip = frame_duration(fps);
    let default_clip = (DEFAULT_CLIP_FRAMES * min_clip).max(MIN_DEFAULT_CLIP_SECS).max(min_clip);
    let mut repaired = 0;

    for scene in response.storyboards.iter_mut().flat_map(|b| b.scenes.iter_mut()) {
        let original = (
            scene.start_tc.clone(),
            scene.end_tc.clone(),
            scene.thumbnail_tc.clone(),
        );

        let mut start = normalize_timestamp_seconds(non_empty(&scene.start_tc), duration_seconds, fps);
        let mut end = normalize_timestamp_seconds(non_empty(&scene.end_tc), duration_seconds, fps);

        if end <= start + min_clip {
            end = start + default_clip;
        }
        if duration_seconds > 0.0 {
            end = end.min(duration_seconds);
        }
        if end <= start + min_clip {
            start = (end - default_clip).max(0.0);
        }

        let thumbnail_source = non_empty(&scene.thumbnail_tc).or(non_empty(&scene.start_tc));
        let mut thumbnail = normalize_timestamp_seconds(thumbnail_source, duration_seconds, fps);
        if thumbnail < start || thumbnail > end {
            thumbnail = start + (end - start) / 2.0;
        }

        scene.start_tc = seconds_to_timecode(start, fps);
        scene.end_tc = seconds_to_timecode(end, fps);
        scene.thumbnail_tc = seconds_to_timecode(thumbnail, fps);
        scene.duration_seconds = round_hundredths((end - start).max(min_clip));

        if original != (scene.start_tc.clone(), scene.end_tc.clone(), scene.thumbnail_tc.clone()) {
            repaired += 1;
        }
    }

    for candidate in response.poster_candidates.iter_mut().flatten() {
        if candidate.timestamp.trim().is_empty() {
            continue;
        }
        let seconds = normalize_timestamp_seconds(Some(&candidate.timestamp), duration_seconds, fps);
        let normalized = seconds_to_timecode(seconds, fps);
        if candidate.timestamp != normalized {
            repaired += 1;
            candidate.timestamp = normalized;
        }
    }

    repaired
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.trim().is_empty())
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
