//! # Infrastructure Layer
//!
//! Cross-cutting technical concerns for Concord: configuration, logging,
//! signal handling and the composition root that wires the coordination
//! services together.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment-layered TOML + env configuration |
//! | [`constants`] | Configuration defaults |
//! | [`di`] | `init_context` composition root |
//! | [`error_ext`] | Context helpers for foreign errors |
//! | [`infrastructure`] | Signals and host address discovery |
//! | [`logging`] | tracing-subscriber setup |

// Registers the key store providers in the linkme slice
extern crate concord_providers;

pub mod config;
pub mod constants;
pub mod di;
pub mod error_ext;
pub mod infrastructure;
pub mod logging;

pub use config::{AppConfig, ConfigLoader};
pub use di::{CoordinationContext, init_context};
pub use error_ext::ErrorContext;
