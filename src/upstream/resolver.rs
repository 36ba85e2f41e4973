//! IPv4-only name resolution for upstream connections.
//!
//! Origins that gate on client address frequently mis-handle IPv6, so only A
//! records are used. Lookup failures follow [`ResolverFallback`].

use crate::config::ResolverFallback;
use hickory_resolver::{
    TokioResolver,
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// reqwest DNS resolver restricted to IPv4.
#[derive(Clone)]
pub struct Ipv4Resolver {
    inner: Arc<TokioResolver>,
    fallback: ResolverFallback,
}

impl Ipv4Resolver {
    /// Build from the system resolver configuration, or the library default
    /// when none can be read.
    pub fn new(fallback: ResolverFallback) -> Self {
        let mut builder = match TokioResolver::builder_tokio() {
            Ok(builder) => builder,
            Err(e) => {
                warn!("System DNS config unavailable ({}), using defaults", e);
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };
        builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4Only;

        Self {
            inner: Arc::new(builder.build()),
            fallback,
        }
    }

    async fn lookup(&self, host: &str) -> Result<Vec<Ipv4Addr>, BoxError> {
        let answer = self.inner.ipv4_lookup(host).await?;
        Ok(answer.iter().map(|a| a.0).collect())
    }
}

impl Resolve for Ipv4Resolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let host = name.as_str();
            let result = resolver.lookup(host).await;
            let addrs = select_addrs(host, result, resolver.fallback)?;
            debug!("Resolved {} to {:?}", host, addrs);
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

/// Apply the fallback policy to a lookup result.
///
/// An empty answer counts as a failure. Ports are left at 0; the HTTP client
/// fills in the URL's port.
pub fn select_addrs(
    host: &str,
    result: Result<Vec<Ipv4Addr>, BoxError>,
    fallback: ResolverFallback,
) -> Result<Vec<SocketAddr>, BoxError> {
    let failure = match result {
        Ok(ips) if !ips.is_empty() => {
            return Ok(ips
                .into_iter()
                .map(|ip| SocketAddr::from((ip, 0)))
                .collect());
        }
        Ok(_) => format!("no A records for {host}").into(),
        Err(e) => e,
    };

    match fallback {
        ResolverFallback::Loopback => {
            warn!(
                "IPv4 lookup failed for {}: {}; falling back to loopback",
                host, failure
            );
            Ok(vec![SocketAddr::from((Ipv4Addr::LOCALHOST, 0))])
        }
        ResolverFallback::Fail => Err(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_lookup_keeps_all_addresses() {
        let ips = vec![Ipv4Addr::new(1, 2, 3, 4), Ipv4Addr::new(5, 6, 7, 8)];
        let addrs = select_addrs("h", Ok(ips), ResolverFallback::Fail).unwrap();
        assert_eq!(
            addrs,
            vec![
                SocketAddr::from(([1, 2, 3, 4], 0)),
                SocketAddr::from(([5, 6, 7, 8], 0)),
            ]
        );
    }

    #[test]
    fn failure_falls_back_to_loopback() {
        let addrs = select_addrs("h", Err("nxdomain".into()), ResolverFallback::Loopback).unwrap();
        assert_eq!(addrs, vec![SocketAddr::from(([127, 0, 0, 1], 0))]);
    }

    #[test]
    fn empty_answer_falls_back_to_loopback() {
        let addrs = select_addrs("h", Ok(vec![]), ResolverFallback::Loopback).unwrap();
        assert_eq!(addrs, vec![SocketAddr::from(([127, 0, 0, 1], 0))]);
    }

    #[test]
    fn fail_policy_propagates_error() {
        let err = select_addrs("h", Err("nxdomain".into()), ResolverFallback::Fail).unwrap_err();
        assert_eq!(err.to_string(), "nxdomain");
    }

    #[test]
    fn fail_policy_rejects_empty_answer() {
        let err = select_addrs("h", Ok(vec![]), ResolverFallback::Fail).unwrap_err();
        assert!(err.to_string().contains("no A records"));
    }
}
