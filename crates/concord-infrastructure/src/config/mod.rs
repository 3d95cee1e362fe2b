//! Configuration
//!
//! Layered application configuration: defaults, then a TOML file, then
//! `CONCORD__`-prefixed environment variables.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;
