//! The current segment batch: listing, per-segment download, and clearing.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use slicer_core::{
    archive_name, extension, format_duration, format_file_size, AudioFormat, Segment,
    SegmentBatch, SegmentId,
};

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct SegmentView {
    pub id: SegmentId,
    pub ordinal: u32,
    pub name: String,
    pub size: u64,
    pub size_label: String,
    pub duration_secs: f64,
    pub duration_label: String,
    pub download_url: String,
}

impl From<&Segment> for SegmentView {
    fn from(s: &Segment) -> Self {
        Self {
            id: s.id,
            ordinal: s.ordinal,
            name: s.name.clone(),
            size: s.size,
            size_label: format_file_size(s.size),
            duration_secs: s.duration_secs,
            duration_label: format_duration(s.duration_secs),
            download_url: format!("/api/segments/{}", s.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    pub run_id: String,
    pub source_name: String,
    pub minutes: u32,
    pub total_size: u64,
    pub archive_name: String,
    pub archive_url: &'static str,
    pub segments: Vec<SegmentView>,
}

impl From<&SegmentBatch> for BatchView {
    fn from(b: &SegmentBatch) -> Self {
        Self {
            run_id: b.run_id.to_string(),
            source_name: b.source_name.clone(),
            minutes: b.minutes.get(),
            total_size: b.total_size(),
            archive_name: archive_name(&b.base_name, b.minutes),
            archive_url: "/api/archive",
            segments: b.segments.iter().map(SegmentView::from).collect(),
        }
    }
}

/// GET /api/segments
pub async fn list_segments(State(ctx): State<AppContext>) -> Result<Json<BatchView>, AppError> {
    let batch = ctx
        .pipeline
        .current()
        .ok_or_else(|| slicer_core::Error::not_found("batch", "current"))?;
    Ok(Json(BatchView::from(&batch)))
}

/// GET /api/segments/{id}
pub async fn download_segment(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id: SegmentId = id
        .parse()
        .map_err(|_| slicer_core::Error::Validation(format!("invalid segment id: {id}")))?;
    let (segment, bytes) = ctx.pipeline.segment(id)?;

    let content_type = extension(&segment.name)
        .and_then(|e| AudioFormat::from_extension(&e))
        .map(|f| f.primary_media_type())
        .unwrap_or("application/octet-stream");

    Ok(attachment(content_type, &segment.name, Body::from(bytes)))
}

/// DELETE /api/segments -- revoke every handle and forget the batch.
pub async fn clear_segments(State(ctx): State<AppContext>) -> StatusCode {
    ctx.pipeline.clear();
    tracing::info!("Segment batch cleared");
    StatusCode::NO_CONTENT
}

/// A download response with `Content-Disposition: attachment`.
pub(crate) fn attachment(content_type: &str, file_name: &str, body: Body) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        file_name.replace(['"', '\\'], "_")
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}
