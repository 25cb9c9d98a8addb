//! # slicer-av
//!
//! Transcoding engine boundary and external tool management for audioslicer.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support and line-by-line stdout observation.
//! - **Sandbox** ([`Sandbox`]) -- the isolated, session-scoped file namespace
//!   the engine reads from and writes to.
//! - **Engine trait** ([`TranscoderEngine`]) with the ffmpeg implementation
//!   ([`FfmpegEngine`]).
//! - **Session** ([`TranscoderSession`]) -- lazy, idempotent engine
//!   initialisation and the fixed segmentation run with guaranteed cleanup.

pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod progress;
pub mod sandbox;
pub mod session;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use engine::{segment_args, TranscoderEngine};
pub use ffmpeg::FfmpegEngine;
pub use progress::ProgressSender;
pub use sandbox::Sandbox;
pub use session::{EngineOutput, EngineState, TranscoderSession};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
