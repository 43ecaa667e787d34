//! Core types for quiesce
//!
//! This crate provides:
//! - Change kinds and change events
//! - The per-path merge policy
//! - Watch target descriptions and interest masks
//! - Engine configuration and the TOML config file model
//! - The shared error taxonomy

pub mod config;
pub mod error;
pub mod event;
pub mod kind;
pub mod merge;
pub mod target;

// Re-exports
pub use config::{
    example_config, quiet_window_from_millis, EngineConfig, EngineSection, WatchConfig,
    DEFAULT_QUIET_WINDOW_MS,
};
pub use error::{ConfigError, ProviderError, RegistrationError};
pub use event::ChangeEvent;
pub use kind::ChangeKind;
pub use merge::{fold, merge};
pub use target::{InterestMask, WatchTarget};
