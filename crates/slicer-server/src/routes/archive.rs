//! Bulk download of the current batch as one ZIP.

use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::Response;
use slicer_core::events::EventPayload;
use slicer_pipeline::build_archive;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::segments::attachment;

/// Header listing segments that could not be included, comma separated.
pub const SKIPPED_HEADER: &str = "x-skipped-entries";

/// GET /api/archive
pub async fn download_archive(State(ctx): State<AppContext>) -> Result<Response, AppError> {
    let batch = ctx
        .pipeline
        .current()
        .ok_or_else(|| slicer_core::Error::not_found("batch", "current"))?;

    let store = ctx.pipeline.store().clone();
    let level = ctx.config.archive.compression_level;
    let archive = tokio::task::spawn_blocking(move || build_archive(&batch, &store, level))
        .await
        .map_err(|e| slicer_core::Error::Internal(format!("archive task failed: {e}")))??;

    for name in &archive.skipped {
        ctx.event_bus.broadcast(EventPayload::ArchiveEntrySkipped {
            name: name.clone(),
            reason: "content no longer available".into(),
        });
    }
    tracing::info!(
        "Built {} with {} entries ({} skipped)",
        archive.name,
        archive.entries,
        archive.skipped.len()
    );

    let mut response = attachment("application/zip", &archive.name, Body::from(archive.bytes));
    if !archive.skipped.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&archive.skipped.join(",")) {
            response.headers_mut().insert(SKIPPED_HEADER, value);
        }
    }
    Ok(response)
}
