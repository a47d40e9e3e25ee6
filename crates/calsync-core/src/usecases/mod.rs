//! Use cases (interactors) for calsync
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`SyncWorkspaceUseCase`] - One workspace's full sync run: cursor
//!   lifecycle, paged listing, per-page reconciliation, 410 fallback

pub mod sync_workspace;

pub use sync_workspace::{
    IReconciler, ReconcileSummary, SyncOutcome, SyncSettings, SyncWorkspaceUseCase,
};
