//! Everything that talks to the upstream origin: header spoofing,
//! IPv4-only resolution and the ordered fetch attempts.

pub mod fetcher;
pub mod headers;
pub mod resolver;

use reqwest::header::HeaderValue;
use url::Url;

/// A validated relay request. Immutable once built.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// Absolute upstream URL
    pub target: Url,
    /// Inbound `Range`, forwarded verbatim
    pub range: Option<HeaderValue>,
    /// Inbound `User-Agent`, forwarded verbatim
    pub user_agent: Option<HeaderValue>,
}

impl ProxyRequest {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            range: None,
            user_agent: None,
        }
    }

    pub fn with_range(mut self, range: Option<HeaderValue>) -> Self {
        self.range = range;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<HeaderValue>) -> Self {
        self.user_agent = user_agent;
        self
    }
}
