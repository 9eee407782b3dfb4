use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::cert::{CaRoots, IssuedCert};

/// Correlation ID for CA roots watch events
pub const ROOTS_WATCH_ID: &str = "roots";

/// Correlation ID for agent leaf certificate watch events
pub const LEAF_WATCH_ID: &str = "leaf";

/// Key of a certificate cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheRequest {
    /// The cluster CA roots
    Roots {
        /// Datacenter to fetch roots for
        datacenter: String,
    },
    /// The agent's own leaf certificate
    Leaf(LeafRequest),
}

/// Parameters of the agent leaf certificate entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafRequest {
    /// Datacenter
    pub datacenter: String,

    /// Agent (node) name
    pub agent: String,

    /// ACL token used to fetch the certificate
    pub token: String,

    /// DNS SANs
    #[serde(default)]
    pub dns_sans: Vec<String>,

    /// IP SANs
    #[serde(default)]
    pub ip_sans: Vec<IpAddr>,
}

/// Value stored in a certificate cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    /// CA roots
    Roots(CaRoots),
    /// Leaf certificate
    Leaf(IssuedCert),
}

/// Event delivered by a certificate cache watch
#[derive(Debug, Clone)]
pub struct CacheUpdate {
    /// Correlation ID given when the watch was installed
    pub correlation_id: String,

    /// New entry value, or the fetch error
    pub result: std::result::Result<CacheValue, String>,
}
