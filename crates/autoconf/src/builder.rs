//! Builder for [`AutoConfig`].

use std::sync::{Arc, Mutex};

use autoconf_client::{BootstrapClient, Resolver, RetryWaiter};
use autoconf_core::{
    AutoConfigError, CertificateCache, ConfigLoader, DirectRpc, Result, TlsConfigurator,
    TokenStore,
};

use crate::auto_config::{AutoConfig, Inner, State};
use crate::options::AutoConfigOptions;

/// Builder for configuring an [`AutoConfig`].
///
/// The loader, RPC delegate, certificate cache, TLS configurator and token
/// store are required; [`build`](Self::build) fails if any is missing.
#[derive(Default)]
pub struct AutoConfigBuilder {
    loader: Option<Arc<dyn ConfigLoader>>,
    rpc: Option<Arc<dyn DirectRpc>>,
    cache: Option<Arc<dyn CertificateCache>>,
    tls: Option<Arc<dyn TlsConfigurator>>,
    tokens: Option<Arc<dyn TokenStore>>,
    resolver: Option<Arc<dyn Resolver>>,
    waiter: Option<RetryWaiter>,
    options: AutoConfigOptions,
}

impl AutoConfigBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration loader
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn ConfigLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the direct RPC delegate
    #[must_use]
    pub fn rpc(mut self, rpc: Arc<dyn DirectRpc>) -> Self {
        self.rpc = Some(rpc);
        self
    }

    /// Set the certificate cache
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CertificateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the TLS configurator
    #[must_use]
    pub fn tls(mut self, tls: Arc<dyn TlsConfigurator>) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Set the token store
    #[must_use]
    pub fn tokens(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the resolver for server host names (default: system resolver)
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Set the backoff waiter for the initial configuration fetch
    #[must_use]
    pub fn waiter(mut self, waiter: RetryWaiter) -> Self {
        self.waiter = Some(waiter);
        self
    }

    /// Set the renewal options
    #[must_use]
    pub fn options(mut self, options: AutoConfigOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the [`AutoConfig`]
    pub fn build(self) -> Result<AutoConfig> {
        let loader = self.loader.ok_or_else(|| missing("a config loader"))?;
        let rpc = self.rpc.ok_or_else(|| missing("a direct RPC delegate"))?;
        let cache = self.cache.ok_or_else(|| missing("a cache"))?;
        let tls = self.tls.ok_or_else(|| missing("a TLS configurator"))?;
        let tokens = self.tokens.ok_or_else(|| missing("a token store"))?;

        let mut client = BootstrapClient::builder(rpc);
        if let Some(resolver) = self.resolver {
            client = client.resolver(resolver);
        }
        if let Some(waiter) = self.waiter {
            client = client.waiter(waiter);
        }

        Ok(AutoConfig {
            inner: Arc::new(Inner {
                options: self.options.normalized(),
                loader,
                client: client.build(),
                cache,
                tls,
                tokens,
                state: Mutex::new(State::default()),
            }),
        })
    }
}

fn missing(what: &str) -> AutoConfigError {
    AutoConfigError::Config(format!("must provide {what}"))
}
