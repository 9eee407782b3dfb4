//! Agent key and certificate signing request generation.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use autoconf_core::{AutoConfigError, Result, RuntimeConfig};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};

/// Trust domain placeholder used before the agent has learned the real one
pub const UNKNOWN_TRUST_DOMAIN: &str = "00000000-0000-0000-0000-000000000000.consul";

/// SPIFFE ID of a client agent
#[must_use]
pub fn agent_spiffe_uri(trust_domain: &str, datacenter: &str, node: &str) -> String {
    format!("spiffe://{trust_domain}/agent/client/dc/{datacenter}/id/{node}")
}

/// A locally generated key pair plus the CSR submitted for signing.
///
/// The private key never leaves the agent; only the CSR is sent.
#[derive(Clone)]
pub struct AgentCertRequest {
    key_pem: String,
    csr_pem: String,
}

impl AgentCertRequest {
    /// Generate a fresh key pair and a CSR for the agent described by `config`
    pub fn generate(config: &RuntimeConfig) -> Result<Self> {
        let key_pair = KeyPair::generate().map_err(|e| {
            AutoConfigError::KeyGeneration(format!("failed to generate agent key: {e}"))
        })?;
        let key_pem = key_pair.serialize_pem();

        let mut dns_sans = vec![String::from("localhost")];
        dns_sans.extend(config.auto_config.dns_sans.iter().cloned());

        let mut params = CertificateParams::new(dns_sans)
            .map_err(|e| AutoConfigError::KeyGeneration(format!("invalid DNS SAN: {e}")))?;

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, config.node_name.as_str());
        if !config.segment_name.is_empty() {
            dn.push(DnType::OrganizationalUnitName, config.segment_name.as_str());
        }
        params.distinguished_name = dn;

        let uri = agent_spiffe_uri(UNKNOWN_TRUST_DOMAIN, &config.datacenter, &config.node_name);
        params.subject_alt_names.push(SanType::URI(uri.try_into().map_err(
            |e: rcgen::Error| AutoConfigError::KeyGeneration(format!("invalid agent URI: {e}")),
        )?));

        let mut ip_sans = vec![
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(Ipv6Addr::LOCALHOST),
        ];
        ip_sans.extend(config.auto_config.ip_sans.iter().copied());
        params
            .subject_alt_names
            .extend(ip_sans.into_iter().map(SanType::IpAddress));

        let csr = params.serialize_request(&key_pair).map_err(|e| {
            AutoConfigError::KeyGeneration(format!("failed to create CSR: {e}"))
        })?;
        let csr_pem = csr.pem().map_err(|e| {
            AutoConfigError::KeyGeneration(format!("failed to serialize CSR: {e}"))
        })?;

        Ok(Self { key_pem, csr_pem })
    }

    /// The CSR in PEM format (sent to the servers for signing)
    #[must_use]
    pub fn csr_pem(&self) -> &str {
        &self.csr_pem
    }

    /// The private key in PEM format (kept locally)
    #[must_use]
    pub fn private_key_pem(&self) -> &str {
        &self.key_pem
    }
}

impl std::fmt::Debug for AgentCertRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCertRequest")
            .field("csr_pem", &self.csr_pem)
            .field("key_pem", &"<redacted>")
            .finish()
    }
}
