use crate::{
    error::{RelayError, Result},
    hls::classify::{ContentKind, classify},
    metrics,
    server::{
        relay::{manifest_response, stream_response},
        state::AppState,
        url_validation::validate_target_url,
    },
    upstream::ProxyRequest,
};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use tracing::{info, warn};

/// Query parameters of `/proxy`
#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    url: Option<String>,
}

/// Relay an upstream playlist or segment to the player
///
/// Playlists come back with every reference rewritten to `/proxy?url=...`;
/// segments are streamed through with range headers intact.
///
/// A query string that does not deserialize (a repeated `url`, for one) is
/// answered with the same JSON 400 as an unparsable target.
pub async fn serve_proxy(
    query: std::result::Result<Query<ProxyParams>, QueryRejection>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();

    let result = match query {
        Ok(Query(params)) => relay(&state, params, &headers).await,
        Err(rejection) => {
            warn!("Rejected proxy query: {}", rejection.body_text());
            Err(RelayError::InvalidTarget(rejection.body_text()))
        }
    };

    match result {
        Ok((kind, response)) => {
            metrics::record_request(kind.as_str(), response.status().as_u16());
            metrics::record_duration(kind.as_str(), start);
            response
        }
        Err(e) => {
            let response = e.into_response();
            metrics::record_request("error", response.status().as_u16());
            metrics::record_duration("error", start);
            response
        }
    }
}

async fn relay(
    state: &AppState,
    params: ProxyParams,
    headers: &HeaderMap,
) -> Result<(ContentKind, Response)> {
    let target = params
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            warn!("Proxy request without url parameter");
            RelayError::MissingParameter
        })?;

    info!(
        "Proxy request for {} (host: {}, origin: {})",
        target,
        header_str(headers, header::HOST),
        header_str(headers, header::ORIGIN)
    );

    let target = validate_target_url(&target)?;
    let request = ProxyRequest::new(target)
        .with_range(headers.get(header::RANGE).cloned())
        .with_user_agent(headers.get(header::USER_AGENT).cloned());

    let fetched = state.fetcher.fetch(&request).await?;
    let outcome = fetched.outcome;
    let variant = fetched.variant.label;

    let Some(body) = outcome.body else {
        warn!(
            "No upstream stream for {} after {} attempts",
            request.target, fetched.attempts
        );
        return Err(RelayError::UpstreamUnavailable { variant });
    };

    let kind = classify(
        outcome.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        &request.target,
    );

    info!(
        "Relaying {} as {} (status {}, via {})",
        request.target,
        kind.as_str(),
        outcome.status,
        variant
    );

    let response = match kind {
        ContentKind::Manifest => {
            manifest_response(
                outcome.status,
                body,
                &request.target,
                &variant,
                state.config.max_manifest_bytes,
            )
            .await?
        }
        ContentKind::Binary => stream_response(outcome.status, &outcome.headers, body, &variant)?,
    };

    Ok((kind, response))
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}
