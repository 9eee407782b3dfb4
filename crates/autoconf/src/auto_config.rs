//! The [`AutoConfig`] handle: configuration reads and the initial bootstrap.

use std::sync::{Arc, Mutex, MutexGuard};

use autoconf_client::BootstrapClient;
use autoconf_core::{
    AutoConfigError, AutoConfigResponse, CertificateCache, ConfigLoader, ConfigSource, IssuedCert,
    Result, RuntimeConfig, TlsConfigurator, TokenStore,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::AutoConfigBuilder;
use crate::lifecycle::Lifecycle;
use crate::options::AutoConfigOptions;

/// Agent auto-config.
///
/// Cheap to clone; clones share state. The initial bootstrap is driven by
/// [`initial_configuration`](Self::initial_configuration) and the background
/// renewal by [`start`](Self::start) / [`stop`](Self::stop).
#[derive(Clone)]
pub struct AutoConfig {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) options: AutoConfigOptions,
    pub(crate) loader: Arc<dyn ConfigLoader>,
    pub(crate) client: BootstrapClient,
    pub(crate) cache: Arc<dyn CertificateCache>,
    pub(crate) tls: Arc<dyn TlsConfigurator>,
    pub(crate) tokens: Arc<dyn TokenStore>,
    pub(crate) state: Mutex<State>,
}

/// Everything observable about an [`AutoConfig`], behind one lock.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) config: Option<RuntimeConfig>,
    pub(crate) source: Option<ConfigSource>,
    pub(crate) response: Option<AutoConfigResponse>,
    pub(crate) leaf: Option<IssuedCert>,
    pub(crate) extra_ca_pems: Vec<String>,
    pub(crate) lifecycle: Lifecycle,
}

impl AutoConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> AutoConfigBuilder {
        AutoConfigBuilder::new()
    }

    /// Load the runtime configuration, layering the auto-config overlay on
    /// top of the local files when one has been recorded.
    ///
    /// Loader warnings are logged. The result replaces the current configuration.
    pub fn read_config(&self) -> Result<RuntimeConfig> {
        let mut state = self.state();
        self.load_locked(&mut state)
    }

    pub(crate) fn load_locked(&self, state: &mut State) -> Result<RuntimeConfig> {
        let loaded = self.inner.loader.load(state.source.as_ref())?;
        for warning in &loaded.warnings {
            warn!("{warning}");
        }

        state.config = Some(loaded.config.clone());
        Ok(loaded.config)
    }

    /// Bootstrap the agent's configuration and TLS identity.
    ///
    /// With auto-config enabled, a previously persisted response is reused if
    /// present; otherwise the servers are asked until one answers or `scope`
    /// is cancelled. The response is recorded and the configuration re-read
    /// with the new overlay. With only auto-encrypt enabled, an agent
    /// certificate is signed and installed. Otherwise the local configuration
    /// is returned unchanged.
    pub async fn initial_configuration(&self, scope: &CancellationToken) -> Result<RuntimeConfig> {
        let config = match self.config() {
            Some(config) => config,
            None => self.read_config()?,
        };

        if config.auto_config.enabled {
            let resp = if let Some(resp) = self.read_persisted(&config)? {
                info!("restoring persisted auto configuration");
                resp
            } else {
                info!("retrieving initial agent auto configuration remotely");
                self.inner
                    .client
                    .get_initial_configuration(scope, &config)
                    .await?
            };

            debug!("updating auto-config settings");
            match self.record_initial_response(&config, resp) {
                // Logged by the recorder; the overlay is applied in memory.
                Ok(()) | Err(AutoConfigError::Persistence(_)) => {}
                Err(e) => return Err(e),
            }

            return self.read_config();
        }

        if config.auto_encrypt_tls {
            let token = self.inner.tokens.agent_token();
            let signed = self
                .inner
                .client
                .auto_encrypt_sign(scope, &config, &token)
                .await?;
            self.apply_signed(&config, &signed)?;
            info!("automatically upgraded to TLS");
        }

        Ok(config)
    }

    /// The most recently loaded runtime configuration
    #[must_use]
    pub fn config(&self) -> Option<RuntimeConfig> {
        self.state().config.clone()
    }

    /// The overlay produced from the last recorded response
    #[must_use]
    pub fn config_source(&self) -> Option<ConfigSource> {
        self.state().source.clone()
    }

    /// The last recorded server response
    #[must_use]
    pub fn response(&self) -> Option<AutoConfigResponse> {
        self.state().response.clone()
    }

    /// The agent certificate currently in use
    #[must_use]
    pub fn current_certificate(&self) -> Option<IssuedCert> {
        self.state().leaf.clone()
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AutoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoConfig")
            .field("options", &self.inner.options)
            .field("client", &self.inner.client)
            .finish_non_exhaustive()
    }
}
