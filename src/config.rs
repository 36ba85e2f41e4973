use crate::upstream::headers::AttemptVariant;
use std::env;
use std::time::Duration;

/// Browser string sent upstream when the player did not supply a User-Agent
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Disguise host used in dev mode when DISGUISE_HOST is unset
pub const DEV_DISGUISE_HOST: &str = "megacloud.blog";

/// What the resolver does when an IPv4 lookup fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverFallback {
    /// Answer with 127.0.0.1 instead of failing (fail-open)
    Loopback,
    /// Propagate the lookup error; the attempt becomes a transport failure
    Fail,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Allowed referring host the disguise variant pretends to be
    pub disguise_host: String,
    /// User-Agent sent upstream when the inbound request has none
    pub default_user_agent: String,
    /// Bound on each fetch attempt until upstream response headers arrive
    pub upstream_timeout: Duration,
    /// TCP/TLS connect bound for upstream connections
    pub connect_timeout: Duration,
    /// Idle bound between upstream body chunks
    pub read_timeout: Duration,
    /// Largest manifest body buffered for rewriting
    pub max_manifest_bytes: usize,
    /// Resolver behaviour on lookup failure
    pub resolver_fallback: ResolverFallback,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, PORT and DISGUISE_HOST are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port: required in prod, defaults to 3000 in dev
        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let disguise_host = if is_dev {
            env::var("DISGUISE_HOST").unwrap_or_else(|_| DEV_DISGUISE_HOST.to_string())
        } else {
            env::var("DISGUISE_HOST").map_err(|_| "DISGUISE_HOST is required in production")?
        };
        if disguise_host.trim().is_empty() {
            return Err("DISGUISE_HOST must not be empty".into());
        }

        let default_user_agent =
            env::var("DEFAULT_USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let upstream_timeout = Duration::from_secs(secs_var("UPSTREAM_TIMEOUT_SECS", 15));
        let connect_timeout = Duration::from_secs(secs_var("UPSTREAM_CONNECT_TIMEOUT_SECS", 10));
        let read_timeout = Duration::from_secs(secs_var("UPSTREAM_READ_TIMEOUT_SECS", 30));

        let max_manifest_bytes = env::var("MAX_MANIFEST_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8 * 1024 * 1024);

        let resolver_fallback = match env::var("RESOLVER_FALLBACK")
            .unwrap_or_else(|_| "loopback".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail" | "error" => ResolverFallback::Fail,
            _ => ResolverFallback::Loopback,
        };

        Ok(Config {
            port,
            is_dev,
            disguise_host,
            default_user_agent,
            upstream_timeout,
            connect_timeout,
            read_timeout,
            max_manifest_bytes,
            resolver_fallback,
        })
    }

    /// Ordered fetch strategies: the target's own origin first, then the disguise host.
    pub fn attempt_variants(&self) -> Vec<AttemptVariant> {
        vec![
            AttemptVariant::direct(),
            AttemptVariant::disguise(&self.disguise_host),
        ]
    }
}

fn secs_var(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}
