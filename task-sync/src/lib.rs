//! Task-template resolution and synchronization engine.
//!
//! Given a student's current context (target countries, universities implied
//! by chosen programs, and the programs themselves), compute the checklist
//! tasks that should exist for that student and create exactly the missing
//! ones. Existing tasks are never updated, reset, or deleted, so a sync can
//! run any number of times, from any trigger, without losing progress.

pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod matcher;
pub mod reconciler;
pub mod specificity;
pub mod sync;

pub use config::TaskSyncConfig;
pub use error::{TaskSyncError, TaskSyncResult};
pub use lifecycle::TaskLifecycleService;
pub use sync::{SyncOutcome, SyncReport, TaskSyncService};
