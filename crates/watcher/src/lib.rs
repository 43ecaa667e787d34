//! Change aggregation for quiesce
//!
//! This crate turns a noisy stream of raw change notifications into a
//! debounced, de-duplicated stream:
//! - Per-path merging of change kinds into a pending batch
//! - A restartable quiet-window timer that flushes the batch
//! - A single delivery thread for consumer callbacks
//! - A start/stop lifecycle over any `WatchProvider`
//! - A `notify`-backed provider

pub mod batch;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod platform;
pub mod provider;
pub mod stats;

// Re-exports
pub use batch::PendingBatch;
pub use delivery::{ChangeHandler, DeliveryHandle, Dispatcher};
pub use engine::{AggregationEngine, EngineSink};
pub use error::LifecycleError;
pub use lifecycle::{
    Diagnostics, LifecycleState, StartReport, StopReport, TargetFailure, WatchLifecycle,
};
pub use platform::NotifyProvider;
pub use provider::{ProviderCallback, ProviderNotice, WatchProvider};
pub use stats::StatsSnapshot;

pub use quiesce_core::{
    ChangeEvent, ChangeKind, ConfigError, EngineConfig, InterestMask, ProviderError,
    RegistrationError, WatchTarget,
};
