//! Domain Port Interfaces
//!
//! Contracts the coordination core depends on. Providers and the
//! application layer implement them; the domain only defines them.
//!
//! ## Organization
//!
//! - **infrastructure/** - Shared key store and lock provider contracts

/// Infrastructure service ports
pub mod infrastructure;

pub use infrastructure::{KeyStore, LockGuard, LockProvider};
