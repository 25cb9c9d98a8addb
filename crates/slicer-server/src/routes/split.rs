//! Upload and split.
//!
//! The request body is the raw file; its declared media type is the
//! `Content-Type` header and its name comes from the query string.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::Deserialize;
use slicer_core::{Error, InputFile, SegmentMinutes};
use slicer_pipeline::{check_type, validate_with_limit, ProgressTracker, Rejection};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::segments::BatchView;

#[derive(Debug, Deserialize)]
pub struct SplitQuery {
    pub name: String,
    pub minutes: Option<u32>,
}

/// POST /api/split?name=<file>&minutes=<n>
pub async fn split(
    State(ctx): State<AppContext>,
    Query(query): Query<SplitQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<BatchView>, AppError> {
    let limit = ctx.config.limits.max_upload_bytes;
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let minutes = match query.minutes {
        Some(m) => SegmentMinutes::new(m)?,
        None => ctx.config.split.default_segment_minutes(),
    };
    check_type(&media_type, &query.name)?;

    let read_limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let bytes = match Limited::new(body, read_limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            return Err(Rejection::TooLarge {
                size: limit.saturating_add(1),
                limit,
            }
            .into());
        }
        Err(e) => {
            tracing::debug!("Upload of {} was interrupted: {e}", query.name);
            return Err(Error::Validation(format!("Upload failed: {e}")).into());
        }
    };
    validate_with_limit(&media_type, &query.name, bytes.len() as u64, limit)?;

    // A dropped request must not cancel the split between engine steps.
    let input = InputFile::new(query.name, media_type, bytes);
    let pipeline = ctx.pipeline.clone();
    let batch = tokio::spawn(async move {
        pipeline
            .split(&input, minutes, &ProgressTracker::noop())
            .await
    })
    .await
    .map_err(|e| Error::Internal(format!("split task failed: {e}")))??;

    Ok(Json(BatchView::from(&batch)))
}
