//! LeanChat Core Library
//!
//! This crate is the engine behind the LeanChat page optimizer: it decides
//! when old conversation turns are trimmed out of a hosted chat page, which
//! cosmetic optimizations are in effect, and how the extension's control
//! commands mutate that state.
//!
//! The engine is host-agnostic and single-threaded: it touches the document
//! only through the [`HostPage`] trait, never owns a clock (hosts pass
//! `now` timestamps and drive [`Controller::tick`]), and keeps every timer
//! as explicit state so the whole subsystem can be stepped deterministically
//! in tests.
//!
//! # Modules
//!
//! - `preset`: the four fixed optimization levels and their toggle bundles
//! - `retention`: removal planning and the synchronous trim pass
//! - `watcher`: debounced insertion watching with container-retry fallback
//! - `optimizer`: idempotent application of a preset's cosmetics
//! - `control`: the controller owning engine state and command dispatch
//! - `protocol`: wire types for the popup/background command channel
//! - `page`: the host page seam and its in-memory implementation
//! - `time`: explicit timer state (debounce, one-shot, retry)

pub mod control;
pub mod optimizer;
pub mod page;
pub mod preset;
pub mod protocol;
pub mod retention;
pub mod time;
pub mod watcher;

// Re-export commonly used types
pub use control::{ControlError, Controller, WARMUP_DELAY_MS};
pub use page::{HostPage, MemoryPage, ObserveTarget, PageError, TurnHandle, TurnRole};
pub use preset::{CosmeticFlags, OptimizationLevel, Preset};
pub use protocol::{
    Command, MemorySettings, Response, SettingsStore, StatusSnapshot, StoredSettings,
};
pub use retention::{plan_removals, run_trim_pass, TrimReport};
pub use watcher::{ChangeWatcher, WatcherFire, CONTAINER_RETRY_MS};
