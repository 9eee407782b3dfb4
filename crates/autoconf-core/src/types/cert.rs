use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A leaf certificate issued by the cluster's certificate authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCert {
    /// Certificate serial number (hex)
    #[serde(default)]
    pub serial_number: String,

    /// Signed leaf certificate
    pub cert_pem: String,

    /// Private key matching the certificate.
    ///
    /// Never sent by the server; filled in locally after receipt.
    #[serde(default)]
    pub private_key_pem: String,

    /// Agent (node) name the certificate was issued to
    #[serde(default)]
    pub agent: String,

    /// SPIFFE URI of the agent identity
    #[serde(default)]
    pub agent_uri: String,

    /// Start of the validity window
    pub valid_after: DateTime<Utc>,

    /// End of the validity window
    pub valid_before: DateTime<Utc>,
}

/// Set of CA roots trusted by the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaRoots {
    /// ID of the root currently signing leaves
    #[serde(default)]
    pub active_root_id: String,

    /// Trust domain of the cluster
    #[serde(default)]
    pub trust_domain: String,

    /// All known roots
    #[serde(default)]
    pub roots: Vec<CaRoot>,
}

/// A single CA root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaRoot {
    /// Root ID
    pub id: String,

    /// Human readable name
    #[serde(default)]
    pub name: String,

    /// Root certificate PEM
    pub root_cert: String,

    /// Intermediates chaining leaves up to this root
    #[serde(default)]
    pub intermediate_certs: Vec<String>,

    /// Whether this is the active root
    #[serde(default)]
    pub active: bool,
}

impl CaRoots {
    /// Every root and intermediate PEM, active root first
    #[must_use]
    pub fn pems(&self) -> Vec<String> {
        let mut roots: Vec<&CaRoot> = self.roots.iter().collect();
        roots.sort_by_key(|r| !r.active);

        let mut pems = Vec::new();
        for root in roots {
            pems.push(root.root_cert.clone());
            pems.extend(root.intermediate_certs.iter().cloned());
        }
        pems
    }
}

/// The TLS identity the agent presents and trusts.
///
/// Owned by the TLS consumer; built by the recorder from a signed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateIdentity {
    /// Leaf certificate PEM
    pub cert_pem: String,

    /// Private key PEM
    pub private_key_pem: String,

    /// Cluster CA bundle
    pub ca_pems: Vec<String>,

    /// Additional manually configured CAs
    pub manual_ca_pems: Vec<String>,

    /// Whether outgoing connections verify server hostnames
    pub verify_server_hostname: bool,
}
