use axum::http::header;
use axum::response::IntoResponse;

/// Prometheus text exposition
pub async fn serve_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render(),
    )
}
