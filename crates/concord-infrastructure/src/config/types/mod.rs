//! Configuration types module

pub mod app;
pub mod coordination;
pub mod logging;

pub use app::AppConfig;
pub use coordination::{
    IdGeneratorConfig, JobsConfig, KeyStoreConfig, LockConfig, RateLimitConfig, ShutdownConfig,
};
pub use logging::LoggingConfig;
