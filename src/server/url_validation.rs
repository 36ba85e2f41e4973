use crate::error::RelayError;
use url::Url;

/// Parse and check the `url` query parameter before any network I/O.
///
/// Accepts only absolute `http://` and `https://` URLs with a host.
/// Private and loopback addresses are not rejected here: the relay fetches
/// whatever the player points it at.
///
/// # Errors
/// Returns [`RelayError::InvalidTarget`] for:
/// - Invalid or relative URLs
/// - Non-HTTP(S) schemes
/// - URLs without a host
pub fn validate_target_url(url: &str) -> Result<Url, RelayError> {
    let parsed = Url::parse(url).map_err(|e| {
        RelayError::InvalidTarget(format!("Invalid URL '{url}': {e}"))
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(RelayError::InvalidTarget(format!(
                "Scheme '{scheme}' not allowed, only http/https permitted"
            )));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(RelayError::InvalidTarget(format!("No host in URL: {url}")));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_https_playlist() {
        let url = validate_target_url("https://cdn.example.com/live/index.m3u8").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_accepts_http_with_port_and_query() {
        assert!(validate_target_url("http://cdn.example.com:8080/seg.ts?token=abc").is_ok());
    }

    #[test]
    fn test_accepts_ip_literals() {
        assert!(validate_target_url("http://127.0.0.1:9000/seg.ts").is_ok());
        assert!(validate_target_url("http://[::1]/seg.ts").is_ok());
    }

    // --- Scheme validation ---

    #[test]
    fn test_rejects_ftp_scheme() {
        assert!(validate_target_url("ftp://cdn.example.com/file.ts").is_err());
    }

    #[test]
    fn test_rejects_file_scheme() {
        assert!(validate_target_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_rejects_no_scheme() {
        assert!(validate_target_url("cdn.example.com/stream").is_err());
    }

    // --- Malformed / edge cases ---

    #[test]
    fn test_rejects_empty_url() {
        assert!(validate_target_url("").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(validate_target_url("not-a-url").is_err());
        assert!(validate_target_url("://missing-scheme").is_err());
        assert!(validate_target_url("http://").is_err());
    }

    #[test]
    fn test_rejects_relative_path() {
        assert!(matches!(
            validate_target_url("/segment1.ts"),
            Err(RelayError::InvalidTarget(_))
        ));
    }
}
