//! Certificate cache watches feeding the renewal loop.

use autoconf_core::{
    CacheRequest, CacheUpdate, CertificateCache, LeafRequest, Result, RuntimeConfig,
    LEAF_WATCH_ID, ROOTS_WATCH_ID,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cache request for the CA roots of the agent's datacenter
pub(crate) fn roots_request(config: &RuntimeConfig) -> CacheRequest {
    CacheRequest::Roots {
        datacenter: config.datacenter.clone(),
    }
}

/// Cache request for the agent's own leaf certificate
pub(crate) fn leaf_request(config: &RuntimeConfig, token: String) -> CacheRequest {
    CacheRequest::Leaf(LeafRequest {
        datacenter: config.datacenter.clone(),
        agent: config.node_name.clone(),
        token,
        dns_sans: config.auto_config.dns_sans.clone(),
        ip_sans: config.auto_config.ip_sans.clone(),
    })
}

/// Watch the CA roots and the agent certificate under a fresh child of `parent`.
///
/// Returns the child token; cancelling it tears both watches down. On
/// failure any watch already installed is cancelled.
pub(crate) fn setup_watches(
    cache: &dyn CertificateCache,
    config: &RuntimeConfig,
    token: String,
    parent: &CancellationToken,
    updates: &mpsc::Sender<CacheUpdate>,
) -> Result<CancellationToken> {
    let scope = parent.child_token();

    let installed = cache
        .notify(
            scope.clone(),
            roots_request(config),
            ROOTS_WATCH_ID,
            updates.clone(),
        )
        .and_then(|()| {
            cache.notify(
                scope.clone(),
                leaf_request(config, token),
                LEAF_WATCH_ID,
                updates.clone(),
            )
        });

    if let Err(e) = installed {
        scope.cancel();
        return Err(e);
    }

    debug!(datacenter = %config.datacenter, node = %config.node_name, "certificate watches installed");
    Ok(scope)
}
