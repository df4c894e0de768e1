//! `kino-core` -- pure domain logic for the storyboard media pipeline.
//!
//! Nothing in this crate spawns processes or touches the filesystem; the
//! planners return argument lists for `kino-pipeline` to execute.

pub mod clips;
pub mod error;
pub mod ffmpeg;
pub mod naming;
pub mod posters;
pub mod prompt;
pub mod storyboard;
pub mod thumbnails;
pub mod timecode;
