//! Bootstrap client: endpoint fallback and the retrying initial configuration fetch.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use autoconf_core::{
    AutoConfigError, AutoConfigRequest, AutoConfigResponse, AutoEncryptSignRequest, DirectRpc,
    Result, RuntimeConfig, SignedResponse, AUTO_ENCRYPT_SIGN_METHOD,
    INITIAL_CONFIGURATION_METHOD,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::csr::AgentCertRequest;
use crate::resolve::{resolve_server, Resolver, SystemResolver};
use crate::retry::RetryWaiter;
use crate::token::intro_token;

/// Client for the auto-config and auto-encrypt bootstrap RPCs
#[derive(Clone)]
pub struct BootstrapClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    rpc: Arc<dyn DirectRpc>,
    resolver: Arc<dyn Resolver>,
    waiter: Mutex<RetryWaiter>,
    // Serializes attempt sequences; only one may run per client.
    sequence: tokio::sync::Mutex<()>,
}

impl BootstrapClient {
    /// Create a client with the system resolver and default backoff
    #[must_use]
    pub fn new(rpc: Arc<dyn DirectRpc>) -> Self {
        BootstrapClientBuilder::new(rpc).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(rpc: Arc<dyn DirectRpc>) -> BootstrapClientBuilder {
        BootstrapClientBuilder::new(rpc)
    }

    /// Fetch the initial configuration, retrying with backoff until a server
    /// answers or `scope` is cancelled.
    ///
    /// A fresh CSR is generated once for the whole sequence. The first
    /// attempt is immediate.
    pub async fn get_initial_configuration(
        &self,
        scope: &CancellationToken,
        config: &RuntimeConfig,
    ) -> Result<AutoConfigResponse> {
        let _sequence = self.inner.sequence.lock().await;
        let csr = AgentCertRequest::generate(config)?;

        self.retry(scope, "initial auto configuration", || {
            self.get_initial_configuration_once(scope, config, &csr)
        })
        .await
    }

    /// Try every resolved endpoint of every configured server once.
    ///
    /// On success the locally generated private key is spliced into the
    /// returned certificate.
    pub async fn get_initial_configuration_once(
        &self,
        scope: &CancellationToken,
        config: &RuntimeConfig,
        csr: &AgentCertRequest,
    ) -> Result<AutoConfigResponse> {
        let token = intro_token(&config.auto_config)?;

        let request = AutoConfigRequest {
            datacenter: config.datacenter.clone(),
            node: config.node_name.clone(),
            segment: config.segment_name.clone(),
            jwt: token,
            csr: csr.csr_pem().to_string(),
        };

        let servers = &config.auto_config.server_addresses;
        if servers.is_empty() {
            return Err(AutoConfigError::Config(
                "auto_config.server_addresses must contain at least one server".into(),
            ));
        }

        let mut resp: AutoConfigResponse = self
            .call_servers(
                scope,
                config,
                servers,
                INITIAL_CONFIGURATION_METHOD,
                serde_json::to_value(&request)?,
            )
            .await?;

        if let Some(cert) = resp.certificate.as_mut() {
            cert.private_key_pem = csr.private_key_pem().to_string();
        }

        Ok(resp)
    }

    /// Have an agent certificate signed via auto-encrypt, retrying with
    /// backoff until a server answers or `scope` is cancelled.
    pub async fn auto_encrypt_sign(
        &self,
        scope: &CancellationToken,
        config: &RuntimeConfig,
        token: &str,
    ) -> Result<SignedResponse> {
        let _sequence = self.inner.sequence.lock().await;
        let csr = AgentCertRequest::generate(config)?;

        self.retry(scope, "auto-encrypt certificate signing", || {
            self.auto_encrypt_sign_once(scope, config, token, &csr)
        })
        .await
    }

    /// Try every auto-encrypt server endpoint once
    pub async fn auto_encrypt_sign_once(
        &self,
        scope: &CancellationToken,
        config: &RuntimeConfig,
        token: &str,
        csr: &AgentCertRequest,
    ) -> Result<SignedResponse> {
        let servers = &config.retry_join;
        if servers.is_empty() {
            return Err(AutoConfigError::Config(
                "auto-encrypt requires at least one retry_join server".into(),
            ));
        }

        let request = AutoEncryptSignRequest {
            datacenter: config.datacenter.clone(),
            node: config.node_name.clone(),
            segment: config.segment_name.clone(),
            token: token.to_string(),
            csr: csr.csr_pem().to_string(),
        };

        let mut resp: SignedResponse = self
            .call_servers(
                scope,
                config,
                servers,
                AUTO_ENCRYPT_SIGN_METHOD,
                serde_json::to_value(&request)?,
            )
            .await?;

        resp.issued_cert.private_key_pem = csr.private_key_pem().to_string();
        Ok(resp)
    }

    /// Current consecutive failure count of the backoff waiter
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.waiter().failures()
    }

    /// Run `attempt` until it succeeds, backing off between failures.
    ///
    /// Configuration, key generation and cancellation errors end the loop
    /// immediately; everything else is logged and retried.
    async fn retry<T, F, Fut>(&self, scope: &CancellationToken, what: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut wait = self.waiter().success();

        loop {
            tokio::select! {
                biased;
                () = scope.cancelled() => {
                    info!(operation = what, "interrupted while waiting to retry");
                    return Err(AutoConfigError::Cancelled);
                }
                () = tokio::time::sleep(wait) => {}
            }

            match attempt().await {
                Ok(resp) => {
                    self.waiter().success();
                    return Ok(resp);
                }
                Err(e @ (AutoConfigError::Cancelled
                | AutoConfigError::Config(_)
                | AutoConfigError::KeyGeneration(_))) => return Err(e),
                Err(e) => {
                    error!(operation = what, error = %e, "attempt failed, backing off");
                    wait = self.waiter().failed();
                    debug!(operation = what, delay = ?wait, "next attempt scheduled");
                }
            }
        }
    }

    /// Call `method` on each endpoint of each server in order, returning the
    /// first successful reply.
    async fn call_servers<T>(
        &self,
        scope: &CancellationToken,
        config: &RuntimeConfig,
        servers: &[String],
        method: &str,
        request: Value,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        for server in servers {
            let addrs =
                resolve_server(self.inner.resolver.as_ref(), server, config.server_port).await;

            for addr in addrs {
                if scope.is_cancelled() {
                    return Err(AutoConfigError::Cancelled);
                }

                debug!(addr = %addr, method = method, "making RPC");
                match self.call_one(scope, config, addr, method, request.clone()).await {
                    Ok(reply) => {
                        debug!(addr = %addr, method = method, "RPC was successful");
                        return Ok(reply);
                    }
                    Err(AutoConfigError::Cancelled) => return Err(AutoConfigError::Cancelled),
                    Err(e) => {
                        error!(addr = %addr, method = method, error = %e, "RPC failed");
                    }
                }
            }
        }

        Err(AutoConfigError::Exhausted)
    }

    async fn call_one<T>(
        &self,
        scope: &CancellationToken,
        config: &RuntimeConfig,
        addr: SocketAddr,
        method: &str,
        request: Value,
    ) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let call = self
            .inner
            .rpc
            .rpc(&config.datacenter, &config.node_name, addr, method, request);

        let reply = tokio::select! {
            biased;
            () = scope.cancelled() => return Err(AutoConfigError::Cancelled),
            reply = call => reply,
        };

        let reply = reply.map_err(|e| match e {
            AutoConfigError::Transport { .. } | AutoConfigError::Cancelled => e,
            other => AutoConfigError::Transport {
                addr,
                message: other.to_string(),
            },
        })?;

        serde_json::from_value(reply).map_err(|e| AutoConfigError::Transport {
            addr,
            message: format!("malformed reply: {e}"),
        })
    }

    fn waiter(&self) -> MutexGuard<'_, RetryWaiter> {
        self.inner
            .waiter
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BootstrapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapClient")
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`BootstrapClient`]
pub struct BootstrapClientBuilder {
    rpc: Arc<dyn DirectRpc>,
    resolver: Arc<dyn Resolver>,
    waiter: RetryWaiter,
}

impl BootstrapClientBuilder {
    /// Create a new builder around the RPC delegate
    #[must_use]
    pub fn new(rpc: Arc<dyn DirectRpc>) -> Self {
        Self {
            rpc,
            resolver: Arc::new(SystemResolver),
            waiter: RetryWaiter::default(),
        }
    }

    /// Set the resolver used for server host names
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the backoff waiter
    #[must_use]
    pub fn waiter(mut self, waiter: RetryWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    /// Build the client
    #[must_use]
    pub fn build(self) -> BootstrapClient {
        BootstrapClient {
            inner: Arc::new(ClientInner {
                rpc: self.rpc,
                resolver: self.resolver,
                waiter: Mutex::new(self.waiter),
                sequence: tokio::sync::Mutex::new(()),
            }),
        }
    }
}
