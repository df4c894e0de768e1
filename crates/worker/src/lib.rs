//! `kino-worker` -- runs one workflow step per invocation.

pub mod config;
pub mod error;
pub mod steps;
