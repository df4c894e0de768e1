//! `kino-pipeline` -- executes the command plans built by `kino-core`.
//!
//! Owns every side effect of the media pipeline: spawning ffmpeg/ffprobe,
//! scoring thumbnail candidates, and laying out rendered files.

pub mod error;
pub mod posters;
pub mod probe;
pub mod render;
pub mod runner;
pub mod sharpness;
