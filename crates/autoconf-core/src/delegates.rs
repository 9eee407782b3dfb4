//! Traits for the collaborators auto-config drives but does not implement.
//!
//! The agent wires concrete implementations of these into the auto-config
//! builder: its configuration loader, RPC transport, certificate cache, TLS
//! configurator and token store.

use std::net::SocketAddr;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::types::{
    CacheRequest, CacheUpdate, CacheValue, CertificateIdentity, ConfigSource, RuntimeConfig,
};
use crate::Result;

/// Output of a configuration load
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged runtime configuration
    pub config: RuntimeConfig,

    /// Non-fatal problems found while loading
    pub warnings: Vec<String>,
}

/// Builds the runtime configuration from local files plus an optional overlay
pub trait ConfigLoader: Send + Sync {
    /// Load the configuration, merging `source` on top of the local files
    fn load(&self, source: Option<&ConfigSource>) -> Result<LoadedConfig>;
}

impl<F> ConfigLoader for F
where
    F: Fn(Option<&ConfigSource>) -> Result<LoadedConfig> + Send + Sync,
{
    fn load(&self, source: Option<&ConfigSource>) -> Result<LoadedConfig> {
        self(source)
    }
}

/// Makes a single RPC to a specific server address
#[async_trait::async_trait]
pub trait DirectRpc: Send + Sync {
    /// Invoke `method` on the server at `addr` and return its reply
    async fn rpc(
        &self,
        datacenter: &str,
        node: &str,
        addr: SocketAddr,
        method: &str,
        request: serde_json::Value,
    ) -> Result<serde_json::Value>;
}

/// Cache of certificate material supporting watches and pre-population
pub trait CertificateCache: Send + Sync {
    /// Watch an entry, publishing every change on `updates` until `scope` is cancelled.
    ///
    /// Implementations must stop publishing once `scope` is cancelled.
    fn notify(
        &self,
        scope: CancellationToken,
        request: CacheRequest,
        correlation_id: &str,
        updates: mpsc::Sender<CacheUpdate>,
    ) -> Result<()>;

    /// Seed an entry so the first reader finds it warm
    fn prepopulate(&self, request: CacheRequest, value: CacheValue) -> Result<()>;
}

/// Consumer of the agent's TLS identity
pub trait TlsConfigurator: Send + Sync {
    /// Replace the full auto-TLS identity
    fn update_auto_tls(&self, identity: &CertificateIdentity) -> Result<()>;

    /// Replace only the cluster CA bundle
    fn update_auto_tls_ca(&self, ca_pems: &[String]) -> Result<()>;

    /// Replace only the leaf certificate and key
    fn update_auto_tls_cert(&self, cert_pem: &str, key_pem: &str) -> Result<()>;
}

/// Kind of ACL token a notification subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The token the agent uses for its own operations
    Agent,
    /// The default token for requests without one
    Default,
}

/// Stream of change notifications for one token kind.
///
/// Notifications coalesce: several changes between two reads are seen once.
#[derive(Debug)]
pub struct TokenNotifier {
    rx: watch::Receiver<u64>,
}

impl TokenNotifier {
    /// Wrap the receiving side of a token store's change counter
    #[must_use]
    pub const fn new(rx: watch::Receiver<u64>) -> Self {
        Self { rx }
    }

    /// Wait for the next change. Returns false once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Store of the agent's ACL tokens
pub trait TokenStore: Send + Sync {
    /// Current agent token
    fn agent_token(&self) -> String;

    /// Subscribe to changes of a token kind
    fn notify(&self, kind: TokenKind) -> TokenNotifier;
}
