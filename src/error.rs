use crate::server::relay::ATTRIBUTION_HEADER;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Relay-level failures surfaced to the player as JSON error bodies.
///
/// Upstream statuses (403, 404, ...) are not errors: they are relayed verbatim.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing url param")]
    MissingParameter,

    #[error("Invalid url param: {0}")]
    InvalidTarget(String),

    /// Every attempt ended without a body stream; `variant` is the last one tried
    #[error("No stream")]
    UpstreamUnavailable { variant: String },

    #[error("Failed to build upstream headers: {0}")]
    HeaderConstruction(String),

    #[error("Manifest exceeds {0} bytes")]
    ManifestTooLarge(usize),

    #[error("Failed to read upstream body: {0}")]
    Body(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

/// Transport-level failure of a single fetch attempt.
///
/// Never leaves the fetcher: it is folded into a synthetic 403 outcome.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            RelayError::MissingParameter => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Missing url param" }),
            ),
            RelayError::InvalidTarget(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid url param", "details": msg }),
            ),
            RelayError::UpstreamUnavailable { .. } => {
                (StatusCode::BAD_GATEWAY, json!({ "error": "No stream" }))
            }
            other => {
                error!("Proxy error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Proxy error", "details": other.to_string() }),
                )
            }
        };

        let mut response = (
            status,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
            Json(body),
        )
            .into_response();

        if let RelayError::UpstreamUnavailable { variant } = &self {
            if let Ok(value) = HeaderValue::from_str(variant) {
                response.headers_mut().insert(ATTRIBUTION_HEADER, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: RelayError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn missing_parameter_is_400() {
        let (status, body) = render(RelayError::MissingParameter).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing url param" }));
    }

    #[tokio::test]
    async fn invalid_target_is_400_with_details() {
        let (status, body) = render(RelayError::InvalidTarget("nope".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "nope");
    }

    #[tokio::test]
    async fn no_stream_is_502() {
        let (status, body) = render(RelayError::UpstreamUnavailable {
            variant: "allowed.example".into(),
        })
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({ "error": "No stream" }));
    }

    #[test]
    fn no_stream_names_last_variant_tried() {
        let resp = RelayError::UpstreamUnavailable {
            variant: "allowed.example".into(),
        }
        .into_response();
        assert_eq!(resp.headers()[ATTRIBUTION_HEADER], "allowed.example");
    }

    #[test]
    fn error_responses_allow_any_origin() {
        let resp = RelayError::MissingParameter.into_response();
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn internal_errors_expose_message() {
        let (status, body) = render(RelayError::ManifestTooLarge(10)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Proxy error");
        assert_eq!(body["details"], "Manifest exceeds 10 bytes");
    }
}
