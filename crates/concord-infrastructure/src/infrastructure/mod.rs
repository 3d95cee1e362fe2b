//! Process-level plumbing
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`lifecycle`] | Signal handling and shutdown on signal |
//! | [`host`] | Local IPv4 discovery for id generation |

pub mod host;
pub mod lifecycle;

pub use host::local_ipv4;
pub use lifecycle::{shutdown_on_signal, wait_for_signal};
