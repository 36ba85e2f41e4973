//! Line-oriented manifest rewriting.
//!
//! Every line that is not a `#` comment/tag and not blank is resolved against
//! the manifest URL and replaced with a relay URL. Lines that fail to resolve
//! are left as they are. Tag lines are never touched, including tags that
//! carry `URI="..."` attributes.
//!
//! Rewriting is not idempotent: an already relayed line (`/proxy?url=...`) is
//! a path-relative reference like any other and gets wrapped again.
//!
//! Whitespace-only lines count as blank and pass through unchanged. Resolving
//! them would turn each one into a relay URL for the playlist itself.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;
use url::Url;

/// Path of the relay endpoint that rewritten references point at
pub const PROXY_PATH: &str = "/proxy";

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Output of [`rewrite_playlist`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenPlaylist {
    pub body: String,
    /// Number of reference lines replaced with relay URLs
    pub rewritten: usize,
    /// Number of reference lines left as-is because they did not resolve
    pub unresolved: usize,
}

/// Relay URL for an absolute upstream URL.
pub fn relay_reference(absolute: &Url) -> String {
    format!(
        "{}?url={}",
        PROXY_PATH,
        utf8_percent_encode(absolute.as_str(), COMPONENT)
    )
}

/// Rewrite every reference line of `text` to route through the relay.
///
/// Line terminators (`\n` or `\r\n`) are preserved exactly.
pub fn rewrite_playlist(text: &str, base: &Url) -> RewrittenPlaylist {
    let mut body = String::with_capacity(text.len() + text.len() / 2);
    let mut rewritten = 0;
    let mut unresolved = 0;

    for (i, raw) in text.split('\n').enumerate() {
        if i > 0 {
            body.push('\n');
        }

        let (line, cr) = match raw.strip_suffix('\r') {
            Some(line) => (line, "\r"),
            None => (raw, ""),
        };

        if is_reference_line(line) {
            match base.join(line) {
                Ok(absolute) => {
                    debug!("Rewriting playlist line: {} -> {}", line, absolute);
                    body.push_str(&relay_reference(&absolute));
                    rewritten += 1;
                }
                Err(e) => {
                    debug!("Leaving unresolvable playlist line {:?}: {}", line, e);
                    body.push_str(line);
                    unresolved += 1;
                }
            }
        } else {
            body.push_str(line);
        }
        body.push_str(cr);
    }

    RewrittenPlaylist {
        body,
        rewritten,
        unresolved,
    }
}

fn is_reference_line(line: &str) -> bool {
    !line.starts_with('#') && !line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://host/path/playlist.m3u8").unwrap()
    }

    #[test]
    fn rewrites_relative_and_absolute_references() {
        let input = "#EXTM3U\nsegment1.ts\n#EXT-X-ENDLIST\nhttps://host/seg2.ts";
        let out = rewrite_playlist(input, &base());

        assert_eq!(
            out.body,
            "#EXTM3U\n/proxy?url=https%3A%2F%2Fhost%2Fpath%2Fsegment1.ts\n#EXT-X-ENDLIST\n/proxy?url=https%3A%2F%2Fhost%2Fseg2.ts"
        );
        assert_eq!(out.rewritten, 2);
        assert_eq!(out.unresolved, 0);
    }

    #[test]
    fn tag_lines_are_byte_identical() {
        let input = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\"\n#EXTINF:10.0,\n";
        let out = rewrite_playlist(input, &base());
        assert_eq!(out.body, input);
        assert_eq!(out.rewritten, 0);
    }

    #[test]
    fn root_relative_and_parent_references_resolve() {
        let out = rewrite_playlist("/abs/a.ts\n../up/b.ts", &base());
        assert_eq!(
            out.body,
            "/proxy?url=https%3A%2F%2Fhost%2Fabs%2Fa.ts\n/proxy?url=https%3A%2F%2Fhost%2Fup%2Fb.ts"
        );
    }

    #[test]
    fn sub_manifest_query_string_is_encoded() {
        let out = rewrite_playlist("720p/index.m3u8?token=a&b=c", &base());
        assert_eq!(
            out.body,
            "/proxy?url=https%3A%2F%2Fhost%2Fpath%2F720p%2Findex.m3u8%3Ftoken%3Da%26b%3Dc"
        );
    }

    #[test]
    fn encoding_matches_uri_component_rules() {
        let url = Url::parse("https://host/a-b_c.d!e~f*g'h(i)j").unwrap();
        assert_eq!(
            relay_reference(&url),
            "/proxy?url=https%3A%2F%2Fhost%2Fa-b_c.d!e~f*g'h(i)j"
        );
    }

    #[test]
    fn crlf_line_endings_preserved() {
        let out = rewrite_playlist("#EXTM3U\r\nseg.ts\r\n", &base());
        assert_eq!(
            out.body,
            "#EXTM3U\r\n/proxy?url=https%3A%2F%2Fhost%2Fpath%2Fseg.ts\r\n"
        );
    }

    #[test]
    fn blank_lines_pass_through() {
        let input = "#EXTM3U\n\n   \nseg.ts\n";
        let out = rewrite_playlist(input, &base());
        assert_eq!(
            out.body,
            "#EXTM3U\n\n   \n/proxy?url=https%3A%2F%2Fhost%2Fpath%2Fseg.ts\n"
        );
        assert_eq!(out.rewritten, 1);
    }

    #[test]
    fn unresolvable_lines_left_unmodified() {
        let input = "#EXTM3U\nhttp://\nhttps://exa mple.com/x.ts\nok.ts";
        let out = rewrite_playlist(input, &base());
        assert_eq!(
            out.body,
            "#EXTM3U\nhttp://\nhttps://exa mple.com/x.ts\n/proxy?url=https%3A%2F%2Fhost%2Fpath%2Fok.ts"
        );
        assert_eq!(out.rewritten, 1);
        assert_eq!(out.unresolved, 2);
    }

    #[test]
    fn rewriting_twice_wraps_again() {
        let once = rewrite_playlist("seg.ts", &base()).body;
        let twice = rewrite_playlist(&once, &base()).body;

        assert_ne!(once, twice);
        let expected_inner = Url::parse("https://host/proxy?url=https%3A%2F%2Fhost%2Fpath%2Fseg.ts").unwrap();
        assert_eq!(twice, relay_reference(&expected_inner));
    }

    #[test]
    fn empty_document_stays_empty() {
        let out = rewrite_playlist("", &base());
        assert_eq!(out.body, "");
        assert_eq!(out.rewritten, 0);
    }
}
