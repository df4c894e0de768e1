//! Storyboard generation prompt step.
//!
//! The step does not call the model itself; it packages the prompt and the
//! model identifier for the workflow engine's model-invocation node.

use serde::{Deserialize, Serialize};

/// Model identifier the prompt is written for.
pub const STORYBOARD_MODEL: &str = "gemini-3-pro-preview";

/// Instructions for producing five trailer storyboards as strict JSON.
pub const STORYBOARD_PROMPT: &str = r#"You are the world's best trailer editor with 20 years experience cutting trailers for Marvel, A24, and Apple. Your taste is flawless, your pacing is ruthless, and you obsess over emotional rhythm.

The user has uploaded a full feature film. Your single job is to create **5 dramatically different, Hollywood-caliber trailer storyboards** (not scripts, not videos — storyboards made of exact existing moments from the movie).

Output format must be EXACTLY this JSON structure (no extra text before or after):

{
  "movie_title": "detect automatically or use filename",
  "duration": "detect total length",
  "storyboards": [
    {
      "name": "Hype / Epic / Blockbuster Cut",
      "target_length": "2:15 - 2:30",
      "tone": "massive, relentless momentum, goosebumps guaranteed",
      "description": "One-sentence vibe summary (max 15 words)",
      "scenes": [
        {
          "scene_number": 1,
          "start_tc": "00:23:45.12",
          "end_tc": "00:23:49.08",
          "duration_seconds": 3.96,
          "thumbnail_tc": "00:23:47.00",
          "description": "Exact one-sentence description of what happens + why it's perfect here",
          "emotional_beat": "Intrigue / Mystery / First Wow Moment",
          "music_idea": "slow piano into massive braaam" 
        }
        // exactly 18–25 scenes per storyboard (never less than 18, never more than 28)
      ]
    },
    {
      "name": "Emotional / Character-Driven Cut",
      "target_length": "2:20",
      "tone": "tear-jerking, intimate, makes audience fall in love with characters",
      "description": "Heart-breakingly beautiful",
      "scenes": [ ... ]
    },
    {
      "name": "Dark / Intense / Thriller Cut",
      "target_length": "2:10",
      "tone": "unrelenting tension, psychological, disturbing",
      "description": "Feels like oxygen is running out",
      "scenes": [ ... ]
    },
    {
      "name": "Quirky / Fun / Viral Cut",
      "target_length": "1:45 - 2:00",
      "tone": "maximum shareability, TikTok/Reels energy, meme-worthy",
      "description": "Makes you laugh in the first 8 seconds",
      "scenes": [ ... ]
    },
    {
      "name": "Critics / Festival / Prestige Cut",
      "target_length": "2:30",
      "tone": "sophisticated, slow-burn, Oscar-bait, leaves you haunted",
      "description": "The version that wins awards and breaks critics",
      "scenes": [ ... ]
    }
  ]
}

Rules you never break:
1. Every single frame you choose MUST exist in the movie. No hallucinations, no "implied" scenes.
2. Timestamps must be frame-accurate (to the frame, not rounded seconds).
3. thumbnail_tc must be the single most striking frame inside that clip.
4. Every scene description must be 12–22 words and explain WHY this moment belongs exactly here in the trailer arc.
5. The 5 storyboards must feel radically different — same movie, completely different emotional journeys.
6. Pacing: first 15 seconds must hook instantly. Final 20 seconds must be pure climax + killer last frame.
7. Never repeat the exact same clip across storyboards (different in/out points are fine if necessary, but prefer unique moments).
8. Always end on the single most unforgettable frame in the entire film.

You have perfect recall of the entire movie. You know every beat, every line, every camera move.

Now watch the film once at 32x speed, then deliver the 5 masterpiece storyboards in perfect JSON."#;

/// Input of the storyboard prompt step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardPromptRequest {
    pub project_id: String,
    pub filename: String,
    pub duration: String,
}

/// Output of the storyboard prompt step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardPromptStep {
    pub project_id: String,
    pub model: String,
    pub prompt: String,
    pub filename: String,
    pub duration: String,
}

/// Attach the model and prompt to the uploaded film's metadata.
pub fn storyboard_prompt_step(request: StoryboardPromptRequest) -> StoryboardPromptStep {
    StoryboardPromptStep {
        project_id: request.project_id,
        model: STORYBOARD_MODEL.to_string(),
        prompt: STORYBOARD_PROMPT.to_string(),
        filename: request.filename,
        duration: request.duration,
    }
}
