//! ffmpeg CLI implementation of [`TranscoderEngine`].
//!
//! The virtual filesystem is a [`Sandbox`] directory; commands run with it as
//! their working directory and `-progress pipe:1`, so progress is read from
//! stdout as `key=value` lines.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::command::ToolCommand;
use crate::engine::TranscoderEngine;
use crate::progress::ProgressSender;
use crate::sandbox::Sandbox;
use crate::tools::{detect_version, ToolRegistry};

/// Resources that exist only after a successful [`FfmpegEngine::load`].
#[derive(Debug)]
struct Loaded {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
    sandbox: Sandbox,
}

/// Engine driving the ffmpeg and ffprobe binaries.
#[derive(Debug)]
pub struct FfmpegEngine {
    tools_config: slicer_core::config::ToolsConfig,
    timeout: Duration,
    loaded: OnceLock<Loaded>,
}

impl FfmpegEngine {
    /// Create an unloaded engine. Nothing is touched until [`load`](TranscoderEngine::load).
    pub fn new(tools_config: slicer_core::config::ToolsConfig, timeout: Duration) -> Self {
        Self {
            tools_config,
            timeout,
            loaded: OnceLock::new(),
        }
    }

    pub fn from_config(config: &slicer_core::config::Config) -> Self {
        Self::new(
            config.tools.clone(),
            Duration::from_secs(config.split.timeout_secs),
        )
    }

    fn loaded(&self) -> slicer_core::Result<&Loaded> {
        self.loaded
            .get()
            .ok_or_else(|| slicer_core::Error::EngineInit("engine is not loaded".into()))
    }

    async fn probe_duration(&self, loaded: &Loaded, name: &str) -> Option<f64> {
        let ffprobe = loaded.ffprobe.as_ref()?;
        let path = loaded.sandbox.path_of(name).ok()?;
        let output = ToolCommand::new(ffprobe.clone())
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path.to_string_lossy().as_ref())
            .timeout(Duration::from_secs(60))
            .execute()
            .await
            .ok()?;
        parse_duration(&output.stdout)
    }
}

#[async_trait]
impl TranscoderEngine for FfmpegEngine {
    async fn load(&self) -> slicer_core::Result<()> {
        if self.loaded.get().is_some() {
            return Ok(());
        }

        let registry = ToolRegistry::discover(&self.tools_config);
        let ffmpeg = registry
            .require("ffmpeg")
            .map_err(|e| slicer_core::Error::EngineInit(e.user_message()))?
            .path
            .clone();

        let version = tokio::task::spawn_blocking({
            let ffmpeg = ffmpeg.clone();
            move || detect_version(&ffmpeg)
        })
        .await
        .ok()
        .flatten()
        .ok_or_else(|| {
            slicer_core::Error::EngineInit(format!(
                "{} did not answer -version",
                ffmpeg.display()
            ))
        })?;

        let ffprobe = registry.get("ffprobe").map(|t| t.path.clone());
        if ffprobe.is_none() {
            tracing::info!("ffprobe not found; segment durations will be approximate");
        }

        let sandbox = Sandbox::new().map_err(|e| slicer_core::Error::EngineInit(e.to_string()))?;
        tracing::info!("Engine loaded: {version}");

        // A concurrent load that won the race leaves its own sandbox in place.
        let _ = self.loaded.set(Loaded {
            ffmpeg,
            ffprobe,
            sandbox,
        });
        Ok(())
    }

    async fn write_file(&self, name: &str, data: Bytes) -> slicer_core::Result<()> {
        self.loaded()?.sandbox.write(name, &data).await
    }

    async fn list_dir(&self) -> slicer_core::Result<Vec<String>> {
        self.loaded()?.sandbox.list().await
    }

    async fn read_file(&self, name: &str) -> slicer_core::Result<Bytes> {
        self.loaded()?.sandbox.read(name).await
    }

    async fn delete_file(&self, name: &str) -> slicer_core::Result<()> {
        self.loaded()?.sandbox.remove(name).await
    }

    async fn exec(&self, args: &[String], progress: &ProgressSender) -> slicer_core::Result<()> {
        let loaded = self.loaded()?;

        let total_secs = match input_arg(args) {
            Some(input) => self.probe_duration(loaded, input).await,
            None => None,
        };

        let mut cmd = ToolCommand::new(loaded.ffmpeg.clone());
        cmd.timeout(self.timeout)
            .current_dir(loaded.sandbox.dir())
            .args(["-hide_banner", "-nostdin", "-y", "-nostats", "-progress", "pipe:1"])
            .args(args.iter().cloned());

        cmd.execute_with_lines(|line| {
            if let Some(fraction) = parse_progress_line(line, total_secs) {
                progress.send(fraction);
            }
        })
        .await?;

        Ok(())
    }

    async fn duration_of(&self, name: &str) -> Option<f64> {
        let loaded = self.loaded().ok()?;
        self.probe_duration(loaded, name).await
    }
}

/// The value following the first `-i` flag.
fn input_arg(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Parse ffprobe's bare `format=duration` output.
fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .find_map(|l| l.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
}

/// Turn one `-progress` line into a completion fraction.
///
/// `out_time_us` (and the historically misnamed `out_time_ms`, which is also
/// microseconds) give the position; `progress=end` means done.
fn parse_progress_line(line: &str, total_secs: Option<f64>) -> Option<f32> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "progress" if value == "end" => Some(1.0),
        "out_time_us" | "out_time_ms" => {
            let total = total_secs.filter(|t| *t > 0.0)?;
            let micros = value.parse::<i64>().ok()?;
            Some(((micros.max(0) as f64 / 1_000_000.0) / total).min(1.0) as f32)
        }
        _ => None,
    }
}
