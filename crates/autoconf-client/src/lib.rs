//! Bootstrap client for agent auto-config.
//!
//! This crate provides the [`BootstrapClient`], which generates the agent's
//! key and CSR, resolves the configured servers and walks their endpoints
//! with exponential backoff until one answers.

#![doc(html_root_url = "https://docs.rs/autoconf-client/0.1.0")]

mod client;
mod config;
pub mod csr;
pub mod resolve;
mod retry;
mod token;

pub use autoconf_core::{AutoConfigError, Result};
pub use client::{BootstrapClient, BootstrapClientBuilder};
pub use config::*;
pub use csr::AgentCertRequest;
pub use resolve::{Resolver, SystemResolver};
pub use retry::RetryWaiter;
pub use token::intro_token;
