//! Bundle a segment batch into one ZIP download.
//!
//! Assembly is best-effort: a segment whose content handle has already been
//! revoked is left out and reported in [`Archive::skipped`] instead of
//! failing the whole archive.

use std::io::{Cursor, Write};
use std::path::Path;

use bytes::Bytes;
use slicer_core::{archive_name, Error, Result, SegmentBatch};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::store::SegmentStore;

/// A finished archive.
#[derive(Debug, Clone)]
pub struct Archive {
    /// `<base>_splits_<N>min.zip`
    pub name: String,
    pub bytes: Bytes,
    /// Number of segments actually written.
    pub entries: usize,
    /// Names of segments that could not be included.
    pub skipped: Vec<String>,
}

/// Build a deflate-compressed ZIP of every segment in `batch`.
///
/// `level` is clamped to deflate's `0..=9`.
pub fn build_archive(batch: &SegmentBatch, store: &SegmentStore, level: i32) -> Result<Archive> {
    if batch.is_empty() {
        return Err(Error::Validation("there are no segments to archive".into()));
    }

    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(level.clamp(0, 9)))
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = 0;
    let mut skipped = Vec::new();

    for segment in &batch.segments {
        let Some(data) = store.fetch(segment.handle) else {
            tracing::warn!("Skipping {} in archive: content is no longer available", segment.name);
            skipped.push(segment.name.clone());
            continue;
        };

        let entry_name = sanitize_entry_name(&segment.name, segment.ordinal);
        zip.start_file(entry_name.as_str(), options)
            .map_err(|e| Error::Archive(format!("failed to add {entry_name}: {e}")))?;
        zip.write_all(&data)
            .map_err(|e| Error::Archive(format!("failed to write {entry_name}: {e}")))?;
        entries += 1;
    }

    let cursor = zip
        .finish()
        .map_err(|e| Error::Archive(format!("failed to finalize archive: {e}")))?;

    Ok(Archive {
        name: archive_name(&batch.base_name, batch.minutes),
        bytes: Bytes::from(cursor.into_inner()),
        entries,
        skipped,
    })
}

/// Keep only the final path component so entries cannot escape on extraction.
fn sanitize_entry_name(name: &str, ordinal: u32) -> String {
    let normalized = name.replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .map(str::to_string)
        .unwrap_or_else(|| format!("segment_{ordinal:03}"))
}
