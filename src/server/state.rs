use crate::{
    config::Config,
    error::{RelayError, Result},
    upstream::{
        fetcher::{HttpTransport, Transport, UpstreamFetcher},
        headers::HeaderSpoofer,
    },
};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Attempt sequence over the shared upstream transport
    pub fetcher: UpstreamFetcher,
    /// Process start, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Create state backed by a pooled reqwest client with the IPv4 resolver
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)
            .map_err(|e| RelayError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create state over an arbitrary transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let spoofer = HeaderSpoofer::new(&config.default_user_agent)?;
        let fetcher = UpstreamFetcher::new(transport, spoofer, config.attempt_variants());

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            started_at: Instant::now(),
        })
    }
}
