//! # strata-manager
//!
//! Document lifecycle for Strata: load/save/reload/unload state tracking,
//! the deferred-flush batch guard, the transparent instrumentation wrapper,
//! and the file-group orchestration that turns a descriptor into one merged
//! document.

pub mod group;
pub mod instrument;
pub mod lifecycle;

pub use group::{GroupConfig, GroupSpec, load_group};
pub use instrument::{DocumentOps, Instrumented, OpHook};
pub use lifecycle::{BatchGuard, DocumentManager, FlushPolicy, LifecycleState};
