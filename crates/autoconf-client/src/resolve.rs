//! Server address resolution.

use std::net::{IpAddr, SocketAddr};

use autoconf_core::{AutoConfigError, Result};
use tracing::{debug, warn};

/// Looks up the IP addresses of a host name
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `host` to zero or more IP addresses
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system's name service
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait::async_trait]
impl Resolver for SystemResolver {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| AutoConfigError::Resolve {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }
}

/// Split a server address into host and port, applying `default_port` when absent.
///
/// Accepts `host`, `host:port`, bare IPv4/IPv6 literals and `[v6]:port`.
#[must_use]
pub fn split_host_port(server: &str, default_port: u16) -> (String, u16) {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return (addr.ip().to_string(), addr.port());
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return (ip.to_string(), default_port);
    }

    let trimmed = server.trim_start_matches('[').trim_end_matches(']');
    if let Some((host, port)) = server.rsplit_once(':') {
        if let Ok(port) = port.parse::<u16>() {
            return (host.trim_start_matches('[').trim_end_matches(']').to_string(), port);
        }
    }

    (trimmed.to_string(), default_port)
}

/// Resolve one configured server into concrete endpoints, in resolver order.
///
/// Resolution failures are logged and produce no endpoints so the caller
/// moves on to the next server.
pub async fn resolve_server(
    resolver: &dyn Resolver,
    server: &str,
    default_port: u16,
) -> Vec<SocketAddr> {
    let (host, port) = split_host_port(server, default_port);

    if let Ok(ip) = host.parse::<IpAddr>() {
        return vec![SocketAddr::new(ip, port)];
    }

    match resolver.lookup(&host).await {
        Ok(ips) => {
            debug!(server = %server, count = ips.len(), "resolved server address");
            ips.into_iter().map(|ip| SocketAddr::new(ip, port)).collect()
        }
        Err(e) => {
            warn!(server = %server, error = %e, "failed to resolve server address");
            Vec::new()
        }
    }
}
