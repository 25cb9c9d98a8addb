//! The boundary between the session and whatever actually transcodes.
//!
//! An engine owns an isolated file namespace and runs ffmpeg-style argument
//! vectors against it. [`crate::FfmpegEngine`] drives the ffmpeg CLI; tests
//! substitute an in-memory engine.

use async_trait::async_trait;
use bytes::Bytes;

use crate::progress::ProgressSender;

/// A transcoding engine with its own virtual filesystem.
#[async_trait]
pub trait TranscoderEngine: Send + Sync {
    /// Perform the one-time, expensive initialisation.
    ///
    /// Called by [`crate::TranscoderSession`] at most once per attempt; a
    /// failed attempt may be followed by another call later.
    async fn load(&self) -> slicer_core::Result<()>;

    /// Create or overwrite a file.
    async fn write_file(&self, name: &str, data: Bytes) -> slicer_core::Result<()>;

    /// Names of all files in the namespace.
    async fn list_dir(&self) -> slicer_core::Result<Vec<String>>;

    /// Read a whole file.
    async fn read_file(&self, name: &str) -> slicer_core::Result<Bytes>;

    /// Delete a file.
    async fn delete_file(&self, name: &str) -> slicer_core::Result<()>;

    /// Run one command. Engine progress is forwarded through `progress`.
    async fn exec(&self, args: &[String], progress: &ProgressSender) -> slicer_core::Result<()>;

    /// Exact playback duration of a file, when the engine can inspect it.
    async fn duration_of(&self, _name: &str) -> Option<f64> {
        None
    }
}

/// The fixed segmentation command:
/// `-i <input> -f segment -segment_time <seconds> -c copy -reset_timestamps 1 <pattern>`.
pub fn segment_args(input: &str, segment_seconds: u32, output_pattern: &str) -> Vec<String> {
    [
        "-i",
        input,
        "-f",
        "segment",
        "-segment_time",
        &segment_seconds.to_string(),
        "-c",
        "copy",
        "-reset_timestamps",
        "1",
        output_pattern,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
