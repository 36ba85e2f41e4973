use crate::{
    error::{RelayError, Result},
    upstream::ProxyRequest,
};
use reqwest::header::{self, HeaderMap, HeaderValue};

const ACCEPT_ENCODING: &str = "identity";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// One header-override strategy in the retry sequence.
///
/// `None` means "derive from the target itself".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptVariant {
    /// Name reported in the attribution header
    pub label: String,
    pub referer: Option<String>,
    pub origin: Option<String>,
}

impl AttemptVariant {
    /// Pretend to be the target's own site.
    pub fn direct() -> Self {
        Self {
            label: "direct".to_string(),
            referer: None,
            origin: None,
        }
    }

    /// Pretend to be embedded on `host`.
    pub fn disguise(host: &str) -> Self {
        Self {
            label: host.to_string(),
            referer: Some(format!("https://{host}/")),
            origin: Some(format!("https://{host}")),
        }
    }
}

/// Builds the outbound header set for an attempt.
///
/// Only `Range` and `User-Agent` are taken from the inbound request; cookies,
/// auth and everything else stay on the player side.
#[derive(Debug, Clone)]
pub struct HeaderSpoofer {
    default_user_agent: HeaderValue,
}

impl HeaderSpoofer {
    pub fn new(default_user_agent: &str) -> Result<Self> {
        let default_user_agent = HeaderValue::from_str(default_user_agent)
            .map_err(|e| RelayError::HeaderConstruction(format!("default User-Agent: {e}")))?;
        Ok(Self { default_user_agent })
    }

    pub fn build(&self, variant: &AttemptVariant, request: &ProxyRequest) -> Result<HeaderMap> {
        let target = &request.target;
        let hostname = target
            .host_str()
            .ok_or_else(|| RelayError::InvalidTarget(format!("No host in URL: {target}")))?;
        let own_origin = target.origin().ascii_serialization();

        let referer = variant
            .referer
            .clone()
            .unwrap_or_else(|| format!("{own_origin}/"));
        let origin = variant.origin.clone().unwrap_or(own_origin);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            request
                .user_agent
                .clone()
                .unwrap_or_else(|| self.default_user_agent.clone()),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_ENCODING,
            HeaderValue::from_static(ACCEPT_ENCODING),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::HOST, header_value("Host", hostname)?);
        headers.insert(header::REFERER, header_value("Referer", &referer)?);
        headers.insert(header::ORIGIN, header_value("Origin", &origin)?);

        if let Some(range) = &request.range {
            headers.insert(header::RANGE, range.clone());
        }

        Ok(headers)
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| RelayError::HeaderConstruction(format!("{name} '{value}': {e}")))
}
