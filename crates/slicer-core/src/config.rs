//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, tools, limits, splitting, and archiving. Every
//! section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::SegmentMinutes;
use crate::Error;

/// Upload ceiling: 500 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Deflate level used for bulk downloads.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tools: ToolsConfig,
    pub limits: LimitsConfig,
    pub split: SplitConfig,
    pub archive: ArchiveConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.limits.max_upload_bytes == 0 {
            warnings.push("limits.max_upload_bytes is 0; every file will be rejected".into());
        }

        if SegmentMinutes::new(self.split.default_minutes).is_err() {
            warnings.push(format!(
                "split.default_minutes {} is outside {}..={}; {} will be used",
                self.split.default_minutes,
                SegmentMinutes::MIN,
                SegmentMinutes::MAX,
                SegmentMinutes::DEFAULT
            ));
        }

        let ext = &self.split.segment_extension;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            warnings.push(format!(
                "split.segment_extension '{ext}' is not a plain extension; 'mp3' will be used"
            ));
        }

        if !(0..=9).contains(&self.archive.compression_level) {
            warnings.push(format!(
                "archive.compression_level {} is outside 0..=9",
                self.archive.compression_level
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// Input limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_upload_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Segment length used when the caller does not pick one.
    pub default_minutes: u32,
    /// Extension (and therefore container) of produced segments.
    pub segment_extension: String,
    /// Upper bound on a single ffmpeg invocation, in seconds.
    pub timeout_secs: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            default_minutes: SegmentMinutes::DEFAULT,
            segment_extension: "mp3".into(),
            timeout_secs: 3600,
        }
    }
}

impl SplitConfig {
    /// The default segment length, falling back to 15 minutes when the
    /// configured value is out of range.
    pub fn default_segment_minutes(&self) -> SegmentMinutes {
        SegmentMinutes::new(self.default_minutes).unwrap_or_default()
    }

    /// The configured segment extension, or `mp3` when it is unusable.
    pub fn extension(&self) -> &str {
        let ext = self.segment_extension.as_str();
        if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            ext
        } else {
            "mp3"
        }
    }
}

/// Bulk download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub compression_level: i32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.limits.max_upload_bytes, 500 * 1024 * 1024);
        assert_eq!(cfg.split.default_minutes, 15);
        assert_eq!(cfg.split.extension(), "mp3");
        assert_eq!(cfg.archive.compression_level, 6);
    }

    #[test]
    fn default_config_no_warnings() {
        let warnings = Config::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "split": {"default_minutes": 30}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.split.default_segment_minutes().get(), 30);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.split.timeout_secs, 3600);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn out_of_range_minutes_warns_and_falls_back() {
        let mut cfg = Config::default();
        cfg.split.default_minutes = 500;
        assert!(cfg.validate().iter().any(|w| w.contains("default_minutes")));
        assert_eq!(cfg.split.default_segment_minutes().get(), 15);
    }

    #[test]
    fn bad_extension_warns_and_falls_back() {
        let mut cfg = Config::default();
        cfg.split.segment_extension = "../x".into();
        assert!(cfg.validate().iter().any(|w| w.contains("segment_extension")));
        assert_eq!(cfg.split.extension(), "mp3");
    }

    #[test]
    fn compression_level_out_of_range_warns() {
        let mut cfg = Config::default();
        cfg.archive.compression_level = 12;
        assert!(cfg.validate().iter().any(|w| w.contains("compression_level")));
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/config.json")));
        assert_eq!(cfg.server.port, 8080);
    }
}
