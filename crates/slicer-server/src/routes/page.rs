//! The embedded single-page front end.

use axum::response::Html;

static INDEX_HTML: &str = include_str!("../../assets/index.html");

/// GET / -- upload form, progress bar, and segment list.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
