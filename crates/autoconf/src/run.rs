//! The background renewal loop.

use std::time::Duration;

use autoconf_core::{
    CacheUpdate, CacheValue, IssuedCert, TokenNotifier, LEAF_WATCH_ID, ROOTS_WATCH_ID,
};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auto_config::AutoConfig;
use crate::watch::setup_watches;

/// What a cache update means for the fallback timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenewalAction {
    /// Timing is unaffected
    Ignore,
    /// A new agent certificate was applied; recompute the deadline
    Reschedule,
    /// The certificate is already inside the leeway; fetch one directly
    RenewNow,
}

/// Time until the fallback for `leaf` should fire. Zero if it is already due.
pub(crate) fn time_to_fallback(leaf: &IssuedCert, leeway: Duration) -> Duration {
    (leaf.valid_before - Utc::now())
        .to_std()
        .unwrap_or_default()
        .saturating_sub(leeway)
}

pub(crate) struct RunLoop {
    pub(crate) ac: AutoConfig,
    pub(crate) scope: CancellationToken,
    pub(crate) updates_tx: mpsc::Sender<CacheUpdate>,
    pub(crate) updates_rx: mpsc::Receiver<CacheUpdate>,
    pub(crate) token_updates: TokenNotifier,
    pub(crate) done: watch::Sender<bool>,
}

impl RunLoop {
    pub(crate) async fn run(mut self) {
        let mut tokens_open = true;
        let mut deadline = self.ac.fallback_deadline();

        loop {
            let fallback = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                () = self.scope.cancelled() => break,
                changed = self.token_updates.changed(), if tokens_open => {
                    if changed {
                        self.reset_watches();
                    } else {
                        debug!("token store closed; no longer watching for agent token changes");
                        tokens_open = false;
                    }
                }
                Some(update) = self.updates_rx.recv() => {
                    match self.ac.handle_cache_update(update) {
                        RenewalAction::Ignore => {}
                        RenewalAction::Reschedule => deadline = self.ac.fallback_deadline(),
                        RenewalAction::RenewNow => {
                            if !self.fallback().await {
                                break;
                            }
                            deadline = self.ac.fallback_deadline();
                        }
                    }
                }
                () = fallback => {
                    info!("agent certificate was not renewed in time; fetching a new one directly");
                    if !self.fallback().await {
                        break;
                    }
                    deadline = self.ac.fallback_deadline();
                }
            }
        }

        self.ac.finish_run(&self.done);
    }

    /// Fetch certificates directly until it works. Returns false if cancelled.
    async fn fallback(&self) -> bool {
        let retry = self.ac.inner.options.fallback_retry();

        loop {
            match self.ac.fallback_once(&self.scope).await {
                Ok(()) => return true,
                Err(e) if e.is_cancelled() => return false,
                Err(e) => {
                    error!(error = %e, retry_in = ?retry, "direct certificate fetch failed");
                }
            }

            tokio::select! {
                biased;
                () = self.scope.cancelled() => return false,
                () = tokio::time::sleep(retry) => {}
            }
        }
    }

    /// Replace the certificate watches so the leaf watch uses the new agent token.
    fn reset_watches(&self) {
        info!("agent token updated; resetting certificate watches");

        let mut state = self.ac.state();
        if let Some(old) = state.lifecycle.cancel_watches.take() {
            old.cancel();
        }

        let Some(config) = state.config.clone() else {
            error!("configuration not loaded; cannot reset certificate watches");
            return;
        };

        match setup_watches(
            self.ac.inner.cache.as_ref(),
            &config,
            self.ac.inner.tokens.agent_token(),
            &self.scope,
            &self.updates_tx,
        ) {
            Ok(watches) => state.lifecycle.cancel_watches = Some(watches),
            Err(e) => error!(error = %e, "failed to reset certificate watches"),
        }
    }
}

impl AutoConfig {
    /// When the fallback for the current agent certificate fires
    pub(crate) fn fallback_deadline(&self) -> Option<Instant> {
        let state = self.state();
        let leaf = state.leaf.as_ref()?;
        Some(Instant::now() + time_to_fallback(leaf, self.inner.options.fallback_leeway()))
    }

    /// Apply a cache update and classify its effect on the fallback timer.
    pub(crate) fn handle_cache_update(&self, update: CacheUpdate) -> RenewalAction {
        let value = match update.result {
            Ok(value) => value,
            Err(e) => {
                error!(watch = %update.correlation_id, error = %e, "certificate cache watch failed");
                return RenewalAction::Ignore;
            }
        };

        match (update.correlation_id.as_str(), value) {
            (ROOTS_WATCH_ID, CacheValue::Roots(roots)) => {
                let mut pems = roots.pems();
                pems.extend(self.state().extra_ca_pems.iter().cloned());

                if let Err(e) = self.inner.tls.update_auto_tls_ca(&pems) {
                    error!(error = %e, "failed to update CA roots");
                } else {
                    debug!(roots = roots.roots.len(), "CA roots updated");
                }
                RenewalAction::Ignore
            }
            (LEAF_WATCH_ID, CacheValue::Leaf(cert)) => self.handle_leaf(cert),
            (id, _) => {
                warn!(watch = %id, "ignoring unexpected certificate cache update");
                RenewalAction::Ignore
            }
        }
    }

    fn handle_leaf(&self, cert: IssuedCert) -> RenewalAction {
        if time_to_fallback(&cert, self.inner.options.fallback_leeway()).is_zero() {
            info!(serial = %cert.serial_number, "cached agent certificate is about to expire");
            return RenewalAction::RenewNow;
        }

        if let Err(e) = self
            .inner
            .tls
            .update_auto_tls_cert(&cert.cert_pem, &cert.private_key_pem)
        {
            error!(error = %e, "failed to apply renewed agent certificate");
            return RenewalAction::Ignore;
        }

        debug!(serial = %cert.serial_number, valid_before = %cert.valid_before, "agent certificate updated");
        self.state().leaf = Some(cert);
        RenewalAction::Reschedule
    }
}
