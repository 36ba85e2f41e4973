//! Ordered fetch attempts against the upstream origin.
//!
//! Each [`AttemptVariant`] is tried strictly in sequence. Only a 403 (or a
//! transport failure, which is folded into a synthetic 403) moves on to the
//! next variant; any other status is final. When the variants run out the
//! last outcome is final whatever its status.

use crate::{
    config::Config,
    error::{FetchError, Result},
    metrics,
    upstream::{
        ProxyRequest,
        headers::{AttemptVariant, HeaderSpoofer},
        resolver::Ipv4Resolver,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt, stream::BoxStream};
use reqwest::{Client, StatusCode, header::HeaderMap};
use std::{io, sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

/// Upstream body as a stream of chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Result of one attempt: a real response, or a synthetic denial.
pub struct UpstreamOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` for synthetic outcomes produced by transport failures
    pub body: Option<ByteStream>,
}

impl UpstreamOutcome {
    /// Outcome standing in for a transport-level failure.
    pub fn synthetic_denial() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl std::fmt::Debug for UpstreamOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamOutcome")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Retry state: which attempt is next, or the terminal outcome.
#[derive(Debug)]
pub enum AttemptState {
    Pending(usize),
    Done(UpstreamOutcome),
}

/// Pure transition after attempt `index` produced `outcome`.
pub fn next_state(index: usize, outcome: UpstreamOutcome, variant_count: usize) -> AttemptState {
    if outcome.status == StatusCode::FORBIDDEN && index + 1 < variant_count {
        AttemptState::Pending(index + 1)
    } else {
        AttemptState::Done(outcome)
    }
}

/// Terminal result of the fetch phase.
#[derive(Debug)]
pub struct FetchResult {
    pub outcome: UpstreamOutcome,
    /// The variant that produced `outcome`
    pub variant: AttemptVariant,
    /// Number of attempts issued
    pub attempts: usize,
}

/// Sends one GET upstream. Implemented over reqwest in production and by
/// canned fakes in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> std::result::Result<UpstreamOutcome, FetchError>;
}

/// reqwest transport with the IPv4 resolver and per-attempt timeout.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &Config) -> std::result::Result<Self, FetchError> {
        let client = Client::builder()
            .dns_resolver(Arc::new(Ipv4Resolver::new(config.resolver_fallback)))
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            timeout: config.upstream_timeout,
        })
    }

    pub fn from_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> std::result::Result<UpstreamOutcome, FetchError> {
        let request = self.client.get(url.clone()).headers(headers).send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(io::Error::other).boxed();

        Ok(UpstreamOutcome {
            status,
            headers,
            body: Some(body),
        })
    }
}

/// Drives the attempt sequence for one request.
#[derive(Clone)]
pub struct UpstreamFetcher {
    transport: Arc<dyn Transport>,
    spoofer: HeaderSpoofer,
    variants: Arc<[AttemptVariant]>,
}

impl UpstreamFetcher {
    /// An empty `variants` list falls back to a single direct attempt.
    pub fn new(
        transport: Arc<dyn Transport>,
        spoofer: HeaderSpoofer,
        mut variants: Vec<AttemptVariant>,
    ) -> Self {
        if variants.is_empty() {
            warn!("No attempt variants configured, using direct only");
            variants.push(AttemptVariant::direct());
        }
        Self {
            transport,
            spoofer,
            variants: variants.into(),
        }
    }

    /// Run attempts in order until one is not denied or variants run out.
    ///
    /// No body is read here; the terminal outcome carries its stream untouched.
    ///
    /// # Errors
    ///
    /// Only header construction can fail. Transport failures become
    /// synthetic 403 outcomes.
    pub async fn fetch(&self, request: &ProxyRequest) -> Result<FetchResult> {
        let total = self.variants.len();
        let mut index = 0;

        loop {
            let variant = &self.variants[index];
            let headers = self.spoofer.build(variant, request)?;

            info!(
                "Fetching {} (attempt {}/{}, variant {})",
                request.target,
                index + 1,
                total,
                variant.label
            );

            let outcome = match self.transport.get(&request.target, headers).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(
                        "Upstream fetch failed for {} (attempt {}/{}): {}",
                        request.target,
                        index + 1,
                        total,
                        e
                    );
                    UpstreamOutcome::synthetic_denial()
                }
            };

            metrics::record_attempt(&variant.label, outcome.status.as_u16());

            match next_state(index, outcome, total) {
                AttemptState::Pending(next) => {
                    warn!(
                        "Upstream denied {} with variant {}, retrying with {}",
                        request.target, variant.label, self.variants[next].label
                    );
                    index = next;
                }
                AttemptState::Done(outcome) => {
                    info!(
                        "Upstream status {} for {} via {}",
                        outcome.status, request.target, variant.label
                    );
                    return Ok(FetchResult {
                        outcome,
                        variant: variant.clone(),
                        attempts: index + 1,
                    });
                }
            }
        }
    }
}
