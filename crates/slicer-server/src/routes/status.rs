//! Health, engine status, and tool availability.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use slicer_av::{EngineState, ToolInfo};

use crate::context::AppContext;
use crate::routes::segments::BatchView;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub engine: EngineState,
    pub busy: bool,
    pub default_minutes: u32,
    pub max_upload_bytes: u64,
    pub batch: Option<BatchView>,
}

/// GET /api/status
pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        engine: ctx.pipeline.session().state(),
        busy: ctx.pipeline.is_busy(),
        default_minutes: ctx.config.split.default_segment_minutes().get(),
        max_upload_bytes: ctx.config.limits.max_upload_bytes,
        batch: ctx.pipeline.current().as_ref().map(BatchView::from),
    })
}

/// GET /api/tools
pub async fn tools(State(ctx): State<AppContext>) -> Json<Vec<ToolInfo>> {
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .unwrap_or_default();
    Json(infos)
}
