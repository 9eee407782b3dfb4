//! Recording server responses: validation, TLS and cache updates, persistence.

use autoconf_client::AgentCertRequest;
use autoconf_core::{
    AutoConfigError, AutoConfigResponse, CacheValue, CertificateIdentity, ConfigSource,
    IssuedCert, Result, RuntimeConfig, SignedResponse, AUTO_CONFIG_SOURCE_NAME,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use x509_parser::parse_x509_certificate;

use crate::auto_config::AutoConfig;
use crate::persist;
use crate::translate::translate_config;
use crate::watch::{leaf_request, roots_request};

/// Pull the signed certificate material out of an auto-config response.
///
/// Fails with [`AutoConfigError::Validation`] if the CA roots or the
/// certificate are missing, the certificate does not parse as X.509, or the
/// private key was never spliced in.
pub(crate) fn extract_signed_response(resp: &AutoConfigResponse) -> Result<SignedResponse> {
    let roots = resp
        .ca_roots
        .clone()
        .ok_or_else(|| AutoConfigError::Validation("response is missing CA roots".into()))?;
    let cert = resp
        .certificate
        .clone()
        .ok_or_else(|| AutoConfigError::Validation("response is missing a certificate".into()))?;

    validate_leaf(&cert)?;

    Ok(SignedResponse {
        issued_cert: cert,
        connect_ca_roots: roots,
        manual_ca_roots: resp.extra_ca_certificates.clone(),
        verify_server_hostname: resp
            .config
            .tls
            .as_ref()
            .is_some_and(|tls| tls.verify_server_hostname),
    })
}

fn validate_leaf(cert: &IssuedCert) -> Result<()> {
    if cert.private_key_pem.trim().is_empty() {
        return Err(AutoConfigError::Validation(
            "certificate has no private key".into(),
        ));
    }

    let block = pem::parse(&cert.cert_pem).map_err(|e| {
        AutoConfigError::Validation(format!("certificate is not valid PEM: {e}"))
    })?;
    parse_x509_certificate(block.contents()).map_err(|e| {
        AutoConfigError::Validation(format!("certificate is not valid X.509: {e}"))
    })?;

    Ok(())
}

impl AutoConfig {
    /// Validate, apply and persist a response from the initial bootstrap or
    /// a fallback fetch.
    ///
    /// Nothing is applied when validation fails. The TLS identity is updated
    /// before the cache is seeded with the same material. A persistence
    /// failure is returned after everything else has been applied.
    pub(crate) fn record_initial_response(
        &self,
        config: &RuntimeConfig,
        resp: AutoConfigResponse,
    ) -> Result<()> {
        let signed = extract_signed_response(&resp).map_err(|e| {
            error!(error = %e, "failed to extract certificates from the auto-config response");
            e
        })?;

        self.update(&resp, &signed)?;
        self.populate_cache(config, &signed)?;
        self.persist(config, &resp)
    }

    /// Swap in the overlay built from `resp` and push its certificate
    /// material to the TLS consumer.
    fn update(&self, resp: &AutoConfigResponse, signed: &SignedResponse) -> Result<()> {
        self.update_tls(signed)?;

        let source = ConfigSource {
            name: AUTO_CONFIG_SOURCE_NAME.to_string(),
            config: translate_config(&resp.config),
        };

        let mut state = self.state();
        state.source = Some(source);
        state.response = Some(resp.clone());
        state.leaf = Some(signed.issued_cert.clone());
        state.extra_ca_pems.clone_from(&signed.manual_ca_roots);
        Ok(())
    }

    /// Install auto-encrypt certificates. Nothing is persisted on this path.
    pub(crate) fn apply_signed(&self, config: &RuntimeConfig, signed: &SignedResponse) -> Result<()> {
        validate_leaf(&signed.issued_cert)?;
        self.update_tls(signed)?;

        {
            let mut state = self.state();
            state.leaf = Some(signed.issued_cert.clone());
            state.extra_ca_pems.clone_from(&signed.manual_ca_roots);
        }

        self.populate_cache(config, signed)
    }

    fn update_tls(&self, signed: &SignedResponse) -> Result<()> {
        let identity = CertificateIdentity {
            cert_pem: signed.issued_cert.cert_pem.clone(),
            private_key_pem: signed.issued_cert.private_key_pem.clone(),
            ca_pems: signed.connect_ca_roots.pems(),
            manual_ca_pems: signed.manual_ca_roots.clone(),
            verify_server_hostname: signed.verify_server_hostname,
        };

        self.inner.tls.update_auto_tls(&identity).map_err(|e| {
            error!(error = %e, "failed to update the TLS configuration");
            e
        })
    }

    fn populate_cache(&self, config: &RuntimeConfig, signed: &SignedResponse) -> Result<()> {
        let cache = &self.inner.cache;

        cache
            .prepopulate(
                roots_request(config),
                CacheValue::Roots(signed.connect_ca_roots.clone()),
            )
            .map_err(|e| cache_error("CA roots", &e))?;

        let token = self.inner.tokens.agent_token();
        cache
            .prepopulate(
                leaf_request(config, token),
                CacheValue::Leaf(signed.issued_cert.clone()),
            )
            .map_err(|e| cache_error("agent certificate", &e))?;

        debug!("certificate cache pre-populated");
        Ok(())
    }

    fn persist(&self, config: &RuntimeConfig, resp: &AutoConfigResponse) -> Result<()> {
        let Some(dir) = config.data_dir.as_deref() else {
            debug!("no data directory configured; not persisting auto-config response");
            return Ok(());
        };

        persist::write_response(dir, resp).map_err(|e| {
            warn!(error = %e, dir = %dir.display(), "failed to persist auto-config response");
            e
        })
    }

    pub(crate) fn read_persisted(&self, config: &RuntimeConfig) -> Result<Option<AutoConfigResponse>> {
        match config.data_dir.as_deref() {
            Some(dir) => persist::read_response(dir),
            None => Ok(None),
        }
    }

    /// One direct fetch of fresh certificates, used when the cache failed to
    /// renew the agent certificate in time.
    pub(crate) async fn fallback_once(&self, scope: &CancellationToken) -> Result<()> {
        let config = self.config().ok_or_else(|| {
            AutoConfigError::Config("configuration has not been loaded".into())
        })?;
        let csr = AgentCertRequest::generate(&config)?;

        if config.auto_config.enabled {
            let resp = self
                .inner
                .client
                .get_initial_configuration_once(scope, &config, &csr)
                .await?;
            match self.record_initial_response(&config, resp) {
                // Already logged; the new certificate is in place.
                Ok(()) | Err(AutoConfigError::Persistence(_)) => {}
                Err(e) => return Err(e),
            }
        } else {
            let token = self.inner.tokens.agent_token();
            let signed = self
                .inner
                .client
                .auto_encrypt_sign_once(scope, &config, &token, &csr)
                .await?;
            self.apply_signed(&config, &signed)?;
        }

        info!("agent certificate renewed via direct fetch");
        Ok(())
    }
}

fn cache_error(what: &str, e: &AutoConfigError) -> AutoConfigError {
    error!(error = %e, entry = what, "failed to pre-populate the certificate cache");
    AutoConfigError::Cache(format!("failed to pre-populate {what}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[test]
    fn test_missing_certificate_applies_nothing() {
        let h = Harness::new();
        let ac = h.build();
        let config = ac.read_config().unwrap();

        let mut resp = h.auto_config_response("west");
        resp.certificate = None;

        let err = ac.record_initial_response(&config, resp).unwrap_err();
        assert!(matches!(err, AutoConfigError::Validation(_)), "{err:?}");
        assert!(h.tls.identities().is_empty());
        assert!(h.cache.prepopulated().is_empty());
        assert!(ac.config_source().is_none());
        assert!(ac.response().is_none());
    }

    #[test]
    fn test_missing_roots_is_validation_error() {
        let h = Harness::new();
        let mut resp = h.auto_config_response("west");
        resp.ca_roots = None;
        let err = extract_signed_response(&resp).unwrap_err();
        assert!(err.to_string().contains("CA roots"));
    }

    #[test]
    fn test_unparseable_certificate_is_validation_error() {
        let h = Harness::new();
        let mut resp = h.auto_config_response("west");
        if let Some(cert) = resp.certificate.as_mut() {
            cert.cert_pem = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n".into();
        }
        let err = extract_signed_response(&resp).unwrap_err();
        assert!(matches!(err, AutoConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_private_key_is_validation_error() {
        let h = Harness::new();
        let mut resp = h.auto_config_response("west");
        if let Some(cert) = resp.certificate.as_mut() {
            cert.private_key_pem.clear();
        }
        let err = extract_signed_response(&resp).unwrap_err();
        assert!(err.to_string().contains("private key"));
    }

    #[test]
    fn test_tls_update_precedes_cache_seeding() {
        let h = Harness::new();
        let ac = h.build();
        let config = ac.read_config().unwrap();

        ac.record_initial_response(&config, h.keyed_response("west"))
            .unwrap();

        assert_eq!(
            h.events(),
            vec!["tls:identity", "cache:prepopulate:roots", "cache:prepopulate:leaf"]
        );
    }

    #[test]
    fn test_persistence_failure_keeps_overlay() {
        let h = Harness::new();
        // A regular file where the data directory should be.
        let not_a_dir = tempfile::NamedTempFile::new().unwrap();
        h.loader
            .update(|c| c.data_dir = Some(not_a_dir.path().to_path_buf()));
        let ac = h.build();
        let config = ac.read_config().unwrap();

        let err = ac
            .record_initial_response(&config, h.keyed_response("west"))
            .unwrap_err();

        assert!(matches!(err, AutoConfigError::Persistence(_)), "{err:?}");
        let source = ac.config_source().unwrap();
        assert_eq!(source.config.datacenter.as_deref(), Some("west"));
        assert_eq!(h.tls.identities().len(), 1);
    }

    #[test]
    fn test_tls_rejection_leaves_overlay_untouched() {
        let h = Harness::new();
        h.tls.fail_updates();
        let ac = h.build();
        let config = ac.read_config().unwrap();

        let err = ac
            .record_initial_response(&config, h.keyed_response("west"))
            .unwrap_err();

        assert!(matches!(err, AutoConfigError::TlsUpdate(_)));
        assert!(ac.config_source().is_none());
        assert!(h.cache.prepopulated().is_empty());
    }

    #[test]
    fn test_leaf_cache_entry_uses_agent_token() {
        let h = Harness::new();
        let ac = h.build();
        let config = ac.read_config().unwrap();

        ac.record_initial_response(&config, h.keyed_response("west"))
            .unwrap();

        let seeded = h.cache.prepopulated();
        match &seeded[1].0 {
            autoconf_core::CacheRequest::Leaf(leaf) => {
                assert_eq!(leaf.token, "agent-token-1");
                assert_eq!(leaf.agent, "web-1");
            }
            other => panic!("unexpected request {other:?}"),
        }
    }
}
