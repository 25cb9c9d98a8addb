//! Audio data model: input files, segment length, produced segments, and
//! the display helpers shared by the CLI and the web page.
//!
//! Enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::ids::{ContentHandle, RunId, SegmentId};

// ---------------------------------------------------------------------------
// AudioFormat
// ---------------------------------------------------------------------------

/// Recognised input audio formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
    Aac,
    Flac,
    M4a,
}

impl AudioFormat {
    /// All recognised formats, in the order they are listed to users.
    pub const ALL: [AudioFormat; 6] = [
        Self::Mp3,
        Self::Wav,
        Self::Ogg,
        Self::Aac,
        Self::Flac,
        Self::M4a,
    ];

    /// MIME types accepted for this format.
    pub fn media_types(&self) -> &'static [&'static str] {
        match self {
            Self::Mp3 => &["audio/mpeg", "audio/mp3"],
            Self::Wav => &["audio/wav", "audio/x-wav", "audio/wave"],
            Self::Ogg => &["audio/ogg"],
            Self::Aac => &["audio/aac"],
            Self::Flac => &["audio/flac", "audio/x-flac"],
            Self::M4a => &["audio/m4a", "audio/x-m4a", "audio/mp4"],
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::M4a => "m4a",
        }
    }

    /// The MIME type to report for content of this format.
    pub fn primary_media_type(&self) -> &'static str {
        self.media_types()[0]
    }

    /// Look a format up by declared MIME type. Case-insensitive; parameters
    /// after `;` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.media_types().contains(&essence.as_str()))
    }

    /// Look a format up by file extension (with or without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

// ---------------------------------------------------------------------------
// InputFile
// ---------------------------------------------------------------------------

/// An uploaded or picked audio file, held entirely in memory.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    media_type: String,
    bytes: Bytes,
}

impl InputFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Original file name as supplied by the user.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared MIME type (may be empty).
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name with its last extension removed.
    pub fn base_name(&self) -> String {
        base_name(&self.name)
    }

    /// Lowercased last extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        extension(&self.name)
    }
}

/// Strip directory components and the last extension from a file name.
///
/// Falls back to `"audio"` when nothing is left (e.g. `".mp3"`).
pub fn base_name(name: &str) -> String {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = match file.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => stem,
        _ => file,
    };
    if stem.is_empty() {
        "audio".to_string()
    } else {
        stem.to_string()
    }
}

/// Lowercased last extension of a file name.
pub fn extension(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// SegmentMinutes
// ---------------------------------------------------------------------------

/// Requested segment length in whole minutes, always within `1..=120`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SegmentMinutes(u32);

impl SegmentMinutes {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 120;
    pub const DEFAULT: u32 = 15;

    pub fn new(minutes: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(Error::Validation(format!(
                "segment length must be between {} and {} minutes, got {minutes}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn as_seconds(&self) -> u32 {
        self.0 * 60
    }
}

impl Default for SegmentMinutes {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<u32> for SegmentMinutes {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SegmentMinutes> for u32 {
    fn from(m: SegmentMinutes) -> Self {
        m.0
    }
}

impl fmt::Display for SegmentMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

// ---------------------------------------------------------------------------
// Segment / SegmentBatch
// ---------------------------------------------------------------------------

/// One produced segment. Its bytes live in the content store under `handle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    /// 1-based position in playback order.
    pub ordinal: u32,
    pub name: String,
    pub size: u64,
    pub duration_secs: f64,
    pub handle: ContentHandle,
}

/// The complete output of one successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBatch {
    pub run_id: RunId,
    pub source_name: String,
    pub base_name: String,
    pub minutes: SegmentMinutes,
    pub segments: Vec<Segment>,
}

impl SegmentBatch {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.size).sum()
    }

    pub fn find(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }
}

/// Name of the `ordinal`-th segment: `<base>_part_<NNN>.<ext>`.
pub fn segment_name(base: &str, ordinal: u32, extension: &str) -> String {
    format!("{base}_part_{ordinal:03}.{extension}")
}

/// Name of the bulk download: `<base>_splits_<N>min.zip`.
pub fn archive_name(base: &str, minutes: SegmentMinutes) -> String {
    format!("{base}_splits_{}min.zip", minutes.get())
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed { message: String },
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Human-readable byte size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `10 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// `m:ss` rendering of a duration in seconds.
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
