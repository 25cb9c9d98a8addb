//! Acceptance checks for a candidate input file.
//!
//! Checks are pure and run in a fixed order: type first, then size. The
//! rejection text is shown to the user as-is.

use slicer_core::config::DEFAULT_MAX_UPLOAD_BYTES;
use slicer_core::AudioFormat;

const MIB: u64 = 1024 * 1024;

/// Why a file was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Please select a valid audio file (MP3, WAV, OGG, AAC, FLAC, M4A)")]
    UnsupportedType,

    #[error("File size must be less than {}MB", .limit / MIB)]
    TooLarge { size: u64, limit: u64 },
}

impl From<Rejection> for slicer_core::Error {
    fn from(r: Rejection) -> Self {
        slicer_core::Error::Validation(r.to_string())
    }
}

/// Validate against the default 500 MiB ceiling.
pub fn validate(media_type: &str, name: &str, size: u64) -> Result<AudioFormat, Rejection> {
    validate_with_limit(media_type, name, size, DEFAULT_MAX_UPLOAD_BYTES)
}

/// Type half of validation, usable before the content is available.
pub fn check_type(media_type: &str, name: &str) -> Result<AudioFormat, Rejection> {
    AudioFormat::from_media_type(media_type)
        .or_else(|| slicer_core::extension(name).and_then(|e| AudioFormat::from_extension(&e)))
        .ok_or(Rejection::UnsupportedType)
}

/// Accept a file whose declared MIME type is recognised or, failing that,
/// whose extension is; then require `size <= limit`.
pub fn validate_with_limit(
    media_type: &str,
    name: &str,
    size: u64,
    limit: u64,
) -> Result<AudioFormat, Rejection> {
    let format = check_type(media_type, name)?;

    if size > limit {
        return Err(Rejection::TooLarge { size, limit });
    }

    Ok(format)
}
