use serde::{Deserialize, Serialize};

use super::cert::{CaRoots, IssuedCert};

/// RPC method serving the initial agent configuration
pub const INITIAL_CONFIGURATION_METHOD: &str = "AutoConfig.InitialConfiguration";

/// RPC method signing an agent CSR for auto-encrypt
pub const AUTO_ENCRYPT_SIGN_METHOD: &str = "AutoEncrypt.Sign";

/// Request for the initial agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoConfigRequest {
    /// Datacenter the agent wants to join
    pub datacenter: String,

    /// Node name of the agent
    pub node: String,

    /// Network segment of the agent
    #[serde(default)]
    pub segment: String,

    /// Intro token authorizing the request
    pub jwt: String,

    /// PEM-encoded certificate signing request
    pub csr: String,
}

/// Server reply to an [`AutoConfigRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoConfigResponse {
    /// Configuration fragment distributed by the servers
    #[serde(default)]
    pub config: ConfigFragment,

    /// CA roots the agent should trust
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_roots: Option<CaRoots>,

    /// Signed agent certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<IssuedCert>,

    /// Extra CA certificates (manually configured on the servers)
    #[serde(default)]
    pub extra_ca_certificates: Vec<String>,
}

/// Configuration fragment in the servers' wire schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFragment {
    /// Datacenter
    #[serde(default)]
    pub datacenter: String,

    /// Primary datacenter
    #[serde(default)]
    pub primary_datacenter: String,

    /// Node name
    #[serde(default)]
    pub node_name: String,

    /// Segment name
    #[serde(default)]
    pub segment_name: String,

    /// ACL settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<AclFragment>,

    /// Gossip settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gossip: Option<GossipFragment>,

    /// TLS settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsFragment>,
}

/// ACL settings distributed to agents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AclFragment {
    /// Whether ACLs are enabled
    #[serde(default)]
    pub enabled: bool,

    /// Policy cache TTL
    #[serde(default)]
    pub policy_ttl: String,

    /// Role cache TTL
    #[serde(default)]
    pub role_ttl: String,

    /// Token cache TTL
    #[serde(default)]
    pub token_ttl: String,

    /// Down policy
    #[serde(default)]
    pub down_policy: String,

    /// Default policy
    #[serde(default)]
    pub default_policy: String,

    /// Key list policy flag
    #[serde(default)]
    pub enable_key_list_policy: bool,

    /// Tokens issued to the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<AclTokensFragment>,
}

/// ACL tokens issued to the agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclTokensFragment {
    /// Agent token
    #[serde(default)]
    pub agent: String,

    /// Default token
    #[serde(default)]
    pub default: String,
}

/// Gossip settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipFragment {
    /// Gossip encryption settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<GossipEncryptionFragment>,
}

/// Gossip encryption settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipEncryptionFragment {
    /// Base64 encryption key
    #[serde(default)]
    pub key: String,

    /// Verify incoming gossip
    #[serde(default)]
    pub verify_incoming: bool,

    /// Verify outgoing gossip
    #[serde(default)]
    pub verify_outgoing: bool,
}

/// TLS settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFragment {
    /// Verify outgoing connections
    #[serde(default)]
    pub verify_outgoing: bool,

    /// Verify server hostnames
    #[serde(default)]
    pub verify_server_hostname: bool,

    /// Cipher suites
    #[serde(default)]
    pub cipher_suites: String,

    /// Minimum TLS version
    #[serde(default)]
    pub min_version: String,
}

/// Request to have an agent CSR signed for auto-encrypt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoEncryptSignRequest {
    /// Datacenter of the agent
    pub datacenter: String,

    /// Node name of the agent
    pub node: String,

    /// Network segment of the agent
    #[serde(default)]
    pub segment: String,

    /// Agent ACL token
    #[serde(default)]
    pub token: String,

    /// PEM-encoded certificate signing request
    pub csr: String,
}

/// Server reply to an [`AutoEncryptSignRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedResponse {
    /// Signed agent certificate
    pub issued_cert: IssuedCert,

    /// Connect CA roots
    pub connect_ca_roots: CaRoots,

    /// Manually configured CA PEMs
    #[serde(default)]
    pub manual_ca_roots: Vec<String>,

    /// Whether to verify server hostnames
    #[serde(default)]
    pub verify_server_hostname: bool,
}
