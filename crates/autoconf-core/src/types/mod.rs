mod cache;
mod cert;
mod config;
mod wire;

pub use cache::*;
pub use cert::*;
pub use config::*;
pub use wire::*;
