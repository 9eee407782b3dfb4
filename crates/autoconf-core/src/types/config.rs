use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Name of the configuration source produced from an auto-config response.
pub const AUTO_CONFIG_SOURCE_NAME: &str = "auto-config.json";

/// Fully merged agent configuration (local files plus any overlay)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Datacenter the agent belongs to
    pub datacenter: String,

    /// Primary datacenter of the federation
    #[serde(default)]
    pub primary_datacenter: String,

    /// Node name of this agent
    pub node_name: String,

    /// Network segment (empty for the default segment)
    #[serde(default)]
    pub segment_name: String,

    /// Directory for durable agent state; `None` in ephemeral mode
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Server RPC port used when a server address has no explicit port
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Auto-config settings
    #[serde(default)]
    pub auto_config: AutoConfigSettings,

    /// Whether auto-encrypt TLS is enabled on this client
    #[serde(default)]
    pub auto_encrypt_tls: bool,

    /// Addresses of servers to join (used for auto-encrypt signing)
    #[serde(default)]
    pub retry_join: Vec<String>,

    /// Whether outgoing TLS connections verify server hostnames
    #[serde(default)]
    pub verify_server_hostname: bool,
}

/// The `auto_config` stanza of the agent configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoConfigSettings {
    /// Whether auto-config is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Inline intro token (JWT)
    #[serde(default)]
    pub intro_token: String,

    /// File holding the intro token
    #[serde(default)]
    pub intro_token_file: Option<PathBuf>,

    /// Servers to contact for the initial configuration
    #[serde(default)]
    pub server_addresses: Vec<String>,

    /// Extra DNS SANs to request in the agent certificate
    #[serde(default)]
    pub dns_sans: Vec<String>,

    /// Extra IP SANs to request in the agent certificate
    #[serde(default)]
    pub ip_sans: Vec<IpAddr>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            datacenter: String::from("dc1"),
            primary_datacenter: String::new(),
            node_name: String::new(),
            segment_name: String::new(),
            data_dir: None,
            server_port: default_server_port(),
            auto_config: AutoConfigSettings::default(),
            auto_encrypt_tls: false,
            retry_join: Vec::new(),
            verify_server_hostname: false,
        }
    }
}

impl RuntimeConfig {
    /// Returns true if either auto-config or auto-encrypt needs the background task
    #[must_use]
    pub const fn wants_auto_tls(&self) -> bool {
        self.auto_config.enabled || self.auto_encrypt_tls
    }
}

const fn default_server_port() -> u16 {
    8300
}

/// A named configuration overlay handed to the loader on every re-read.
///
/// Immutable once built: a new auto-config response produces a new source
/// rather than mutating the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Logical name of the source
    pub name: String,

    /// Overlay in the local file schema
    pub config: ConfigOverlay,
}

/// Configuration overlay in the local configuration file schema.
///
/// Every field is optional; `None` means "leave the local value alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverlay {
    /// Datacenter override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,

    /// Primary datacenter override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_datacenter: Option<String>,

    /// Node name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Segment override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_name: Option<String>,

    /// ACL settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<AclOverlay>,

    /// Gossip encryption settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gossip: Option<GossipOverlay>,

    /// TLS verification settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOverlay>,
}

/// ACL section of the overlay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclOverlay {
    /// Whether ACLs are enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Policy cache TTL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_ttl: Option<String>,

    /// Role cache TTL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_ttl: Option<String>,

    /// Token cache TTL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_ttl: Option<String>,

    /// Policy applied when servers are unreachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_policy: Option<String>,

    /// Default allow/deny policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_policy: Option<String>,

    /// Whether key list policies are enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_key_list_policy: Option<bool>,

    /// Tokens handed to the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<AclTokensOverlay>,
}

/// ACL tokens section of the overlay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclTokensOverlay {
    /// Agent token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Default token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Gossip encryption section of the overlay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipOverlay {
    /// Base64 gossip encryption key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt: Option<String>,

    /// Verify incoming gossip is encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_verify_incoming: Option<bool>,

    /// Verify outgoing gossip is encrypted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_verify_outgoing: Option<bool>,
}

/// TLS section of the overlay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOverlay {
    /// Verify outgoing connections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_outgoing: Option<bool>,

    /// Verify server hostnames on outgoing connections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_server_hostname: Option<bool>,

    /// Allowed cipher suites
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher_suites: Option<String>,

    /// Minimum TLS version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
}
