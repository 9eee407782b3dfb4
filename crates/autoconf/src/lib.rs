//! Agent auto-config.
//!
//! Bootstraps a joining agent's configuration and TLS identity from the
//! cluster's servers, then keeps the agent certificate fresh for the life of
//! the process.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use autoconf::AutoConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn bootstrap(ac: AutoConfig) -> autoconf::Result<()> {
//!     let shutdown = CancellationToken::new();
//!
//!     // Blocks until a server grants a configuration, or `shutdown` fires.
//!     let config = ac.initial_configuration(&shutdown).await?;
//!     println!("joined datacenter {}", config.datacenter);
//!
//!     // Keep the certificate fresh in the background.
//!     ac.start(&shutdown)?;
//!
//!     shutdown.cancelled().await;
//!     ac.done().wait().await;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/autoconf/0.1.0")]

mod auto_config;
mod builder;
mod lifecycle;
mod options;
mod persist;
mod recorder;
mod run;
mod translate;
mod watch;

#[cfg(test)]
mod testing;

pub use auto_config::AutoConfig;
pub use builder::AutoConfigBuilder;
pub use lifecycle::DoneSignal;
pub use options::AutoConfigOptions;
pub use translate::translate_config;

// Re-export core and client types
pub use autoconf_client::{
    intro_token, AgentCertRequest, BootstrapClient, BootstrapClientBuilder, Resolver,
    RetryConfig, RetryWaiter, SystemResolver,
};
pub use autoconf_core::*;
