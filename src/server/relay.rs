//! Client-facing responses for the two relay paths.
//!
//! Manifests are fully buffered, rewritten and sent in one piece. Everything
//! else is streamed chunk by chunk without buffering. The two paths stay
//! separate so a manifest is never emitted half-rewritten.

use crate::{
    error::{RelayError, Result},
    hls::{classify::MANIFEST_CONTENT_TYPE, rewrite::rewrite_playlist},
    metrics,
    upstream::fetcher::ByteStream,
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures_util::TryStreamExt;
use tracing::{info, warn};
use url::Url;

/// Response header naming the attempt variant that produced the content
pub const ATTRIBUTION_HEADER: &str = "x-hlsrelay-variant";

/// Segment content type when upstream sends none
pub const DEFAULT_SEGMENT_CONTENT_TYPE: &str = "video/MP2T";

/// Buffer the manifest, rewrite its references and build the response.
///
/// # Errors
///
/// Fails when the body cannot be read or exceeds `max_bytes`.
pub async fn manifest_response(
    status: StatusCode,
    mut body: ByteStream,
    base: &Url,
    variant: &str,
    max_bytes: usize,
) -> Result<Response> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.try_next().await? {
        if buf.len() + chunk.len() > max_bytes {
            return Err(RelayError::ManifestTooLarge(max_bytes));
        }
        buf.extend_from_slice(&chunk);
    }

    let text = String::from_utf8_lossy(&buf);
    let playlist = rewrite_playlist(&text, base);
    info!(
        "Rewrote playlist {} ({} references, {} left unresolved)",
        base, playlist.rewritten, playlist.unresolved
    );

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(ATTRIBUTION_HEADER, attribution(variant)?)
        .body(Body::from(playlist.body))
        .map_err(|e| RelayError::Internal(format!("Failed to build manifest response: {e}")))
}

/// Stream the upstream body to the client as it arrives.
///
/// An upstream read error after the response has started is passed to the
/// body, which makes the server abort the client connection instead of
/// writing a second response.
pub fn stream_response(
    status: StatusCode,
    upstream_headers: &HeaderMap,
    body: ByteStream,
    variant: &str,
) -> Result<Response> {
    let content_type = upstream_headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_SEGMENT_CONTENT_TYPE));

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-store")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(ATTRIBUTION_HEADER, attribution(variant)?);

    if let Some(range) = upstream_headers.get(header::CONTENT_RANGE) {
        builder = builder.header(header::CONTENT_RANGE, range.clone());
    }
    if let Some(length) = upstream_headers.get(header::CONTENT_LENGTH) {
        builder = builder.header(header::CONTENT_LENGTH, length.clone());
    }

    let stream = body
        .inspect_ok(|chunk| metrics::record_bytes_relayed(chunk.len()))
        .inspect_err(|e| {
            warn!("Upstream stream failed mid-relay, aborting client connection: {}", e);
            metrics::record_stream_error();
        });

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| RelayError::Internal(format!("Failed to build stream response: {e}")))
}

fn attribution(variant: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(variant)
        .map_err(|e| RelayError::HeaderConstruction(format!("attribution '{variant}': {e}")))
}
