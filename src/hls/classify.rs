use url::Url;

/// MIME type served for rewritten manifests
pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

const MANIFEST_MIME_MARKER: &str = "mpegurl";
const MANIFEST_EXTENSION: &str = ".m3u8";

/// How a terminal upstream response is relayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Text playlist: buffered and rewritten
    Manifest,
    /// Anything else: streamed through untouched
    Binary,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Manifest => "manifest",
            ContentKind::Binary => "binary",
        }
    }
}

/// Manifest if the content type mentions `mpegurl` (any case) or the target
/// path ends in `.m3u8`; binary otherwise.
pub fn classify(content_type: Option<&str>, target: &Url) -> ContentKind {
    let mime_match = content_type
        .map(|ct| ct.to_ascii_lowercase().contains(MANIFEST_MIME_MARKER))
        .unwrap_or(false);

    if mime_match || target.path().ends_with(MANIFEST_EXTENSION) {
        ContentKind::Manifest
    } else {
        ContentKind::Binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn apple_mime_is_manifest() {
        assert_eq!(
            classify(Some("application/vnd.apple.mpegurl"), &url("https://h/a")),
            ContentKind::Manifest
        );
    }

    #[test]
    fn mime_match_ignores_case() {
        assert_eq!(
            classify(Some("application/vnd.apple.mpegURL"), &url("https://h/a")),
            ContentKind::Manifest
        );
        assert_eq!(
            classify(Some("audio/x-mpegurl; charset=utf-8"), &url("https://h/a")),
            ContentKind::Manifest
        );
    }

    #[test]
    fn m3u8_path_is_manifest_without_content_type() {
        assert_eq!(
            classify(None, &url("https://h/live/index.m3u8")),
            ContentKind::Manifest
        );
        assert_eq!(
            classify(Some("text/plain"), &url("https://h/live/index.m3u8?token=1")),
            ContentKind::Manifest
        );
    }

    #[test]
    fn segments_are_binary() {
        assert_eq!(
            classify(Some("video/MP2T"), &url("https://h/seg1.ts")),
            ContentKind::Binary
        );
        assert_eq!(classify(None, &url("https://h/seg1.ts")), ContentKind::Binary);
    }

    #[test]
    fn extension_only_in_query_is_binary() {
        assert_eq!(
            classify(None, &url("https://h/get?file=index.m3u8")),
            ContentKind::Binary
        );
    }
}
