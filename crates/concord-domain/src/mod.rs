//! # Concord Domain Layer
//!
//! Core types shared by every instance that coordinates through the shared
//! key-value store: lock guards and wait policies, rate-limit identities and
//! decisions, the domain error taxonomy, and the [`KeyStore`] port that the
//! provider crate implements.
//!
//! ## Module Categories
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Domain error enum and `Result` alias |
//! | [`constants`] | Key prefixes, header names, id layout constants |
//! | [`ports`] | `KeyStore` and `LockProvider` contracts |
//! | [`value_objects`] | Lock, rate-limit and request-context values |
//!
//! The domain layer performs no I/O. Everything that touches the store lives
//! behind [`ports::infrastructure::KeyStore`].
//!
//! [`KeyStore`]: ports::infrastructure::KeyStore

pub mod constants;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::{Error, Result};
