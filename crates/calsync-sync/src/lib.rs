//! Sync engine for calsync
//!
//! Everything between "the daemon ticked" and "the database reflects
//! the calendar" lives here:
//!
//! - [`Orchestrator`] enumerates credentialed workspaces each pass and
//!   enqueues one sync job per workspace
//! - [`KeyedJobQueue`] runs jobs, serialized per concurrency key so a
//!   workspace never syncs against itself
//! - [`SyncJobRunner`] executes one job through the core use case
//! - [`Reconciler`] applies each page of provider events to the store
//! - [`SyncError`] classifies failures for retry and logging decisions

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod queue;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::SyncError;
pub use job::{google_provider_factory, ProviderFactory, SyncJobRunner};
pub use orchestrator::{Orchestrator, TriggerStatus, WorkspaceTrigger};
pub use queue::{IJobRunner, JobOutcome, KeyedJobQueue};
pub use reconciler::Reconciler;
