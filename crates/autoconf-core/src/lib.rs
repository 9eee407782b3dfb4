//! Core types and traits for agent auto-config.
//!
//! This crate provides the foundational types shared by the auto-config
//! client and runtime:
//!
//! - **Types**: wire messages, certificate material and runtime configuration
//! - **Delegates**: traits for the collaborators auto-config drives
//! - **Errors**: error handling with [`AutoConfigError`]

#![doc(html_root_url = "https://docs.rs/autoconf-core/0.1.0")]

pub mod delegates;
mod error;
pub mod types;

pub use delegates::*;
pub use error::{AutoConfigError, Result};
pub use types::*;
