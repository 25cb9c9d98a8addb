//! Axum router construction.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::routes;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(ctx.config.limits.max_upload_bytes).unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/status", get(routes::status::status))
        .route("/tools", get(routes::status::tools))
        .route("/split", post(routes::split::split))
        .route(
            "/segments",
            get(routes::segments::list_segments).delete(routes::segments::clear_segments),
        )
        .route("/segments/{id}", get(routes::segments::download_segment))
        .route("/archive", get(routes::archive::download_archive))
        .route("/events", get(routes::events::events_handler));

    Router::new()
        .route("/", get(routes::page::index))
        .route("/health", get(routes::status::health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
