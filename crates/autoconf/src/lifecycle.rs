//! Start/stop state machine for the background renewal task.

use autoconf_core::{AutoConfigError, Result, TokenKind};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::auto_config::AutoConfig;
use crate::run::RunLoop;
use crate::watch::setup_watches;

/// Lifecycle fields of the shared state.
///
/// `running` and `cancel` move together: both set by `start`, both cleared
/// when the run loop exits.
#[derive(Default)]
pub(crate) struct Lifecycle {
    pub(crate) running: bool,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) cancel_watches: Option<CancellationToken>,
    pub(crate) done: Option<DoneSignal>,
}

/// Completion signal of a background renewal task.
///
/// Completes when the task has exited and its state has been cleared.
#[derive(Debug, Clone)]
pub struct DoneSignal {
    rx: watch::Receiver<bool>,
}

impl DoneSignal {
    pub(crate) const fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A signal that has already completed
    pub(crate) fn completed() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    /// Returns true once the task has exited
    #[must_use]
    pub fn is_done(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Wait for the task to exit
    pub async fn wait(mut self) {
        // A dropped sender means the task is gone as well.
        let _ = self.rx.wait_for(|done| *done).await;
    }
}

impl AutoConfig {
    /// Start the background renewal task.
    ///
    /// Does nothing if neither auto-config nor auto-encrypt is enabled. The
    /// task runs until `parent` is cancelled or [`stop`](Self::stop) is called.
    pub fn start(&self, parent: &CancellationToken) -> Result<()> {
        let mut state = self.state();

        let config = match state.config.clone() {
            Some(config) => config,
            None => self.load_locked(&mut state)?,
        };
        if !config.wants_auto_tls() {
            return Ok(());
        }

        match (state.lifecycle.running, state.lifecycle.cancel.is_some()) {
            (false, false) => {}
            (true, true) => return Err(AutoConfigError::AlreadyRunning),
            (running, has_cancel) => {
                return Err(AutoConfigError::InvariantFault(format!(
                    "running is {running} but cancellation token present is {has_cancel}"
                )));
            }
        }

        let scope = parent.child_token();
        let (updates_tx, updates_rx) = mpsc::channel(self.inner.options.update_channel_capacity);

        let watches = match setup_watches(
            self.inner.cache.as_ref(),
            &config,
            self.inner.tokens.agent_token(),
            &scope,
            &updates_tx,
        ) {
            Ok(watches) => watches,
            Err(e) => {
                scope.cancel();
                error!(error = %e, "error setting up cache watches");
                return Err(e);
            }
        };

        let token_updates = self.inner.tokens.notify(TokenKind::Agent);
        let (done_tx, done_rx) = watch::channel(false);

        state.lifecycle = Lifecycle {
            running: true,
            cancel: Some(scope.clone()),
            cancel_watches: Some(watches),
            done: Some(DoneSignal::new(done_rx)),
        };
        // The run loop takes this lock as soon as it is polled.
        drop(state);

        tokio::spawn(
            RunLoop {
                ac: self.clone(),
                scope,
                updates_tx,
                updates_rx,
                token_updates,
                done: done_tx,
            }
            .run(),
        );

        info!("auto-config started");
        Ok(())
    }

    /// Request the background task to stop.
    ///
    /// Returns false if it was not running. Does not wait for the task to
    /// exit; use [`done`](Self::done) for that.
    pub fn stop(&self) -> bool {
        let state = self.state();
        if !state.lifecycle.running {
            return false;
        }

        if let Some(cancel) = &state.lifecycle.cancel {
            cancel.cancel();
        }
        true
    }

    /// Completion signal of the current (or last) background task.
    ///
    /// Already complete if the task was never started.
    #[must_use]
    pub fn done(&self) -> DoneSignal {
        self.state()
            .lifecycle
            .done
            .clone()
            .unwrap_or_else(DoneSignal::completed)
    }

    /// Returns true while the background task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().lifecycle.running
    }

    /// Clear the lifecycle state after the run loop exits, then signal completion.
    pub(crate) fn finish_run(&self, done: &watch::Sender<bool>) {
        let mut state = self.state();
        state.lifecycle.running = false;
        state.lifecycle.cancel = None;
        if let Some(watches) = state.lifecycle.cancel_watches.take() {
            watches.cancel();
        }
        done.send_replace(true);
        info!("auto-config stopped");
    }
}
