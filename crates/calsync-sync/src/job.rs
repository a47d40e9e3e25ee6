//! Sync job execution
//!
//! `SyncJobRunner` turns a queued payload into one full
//! `SyncWorkspaceUseCase` run: it builds a calendar provider from the
//! payload's tokens, runs the sync, classifies any failure into a
//! `SyncError`, and persists tokens the provider refreshed mid-run so
//! the next pass starts from the fresh credential.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use calsync_core::config::GoogleConfig;
use calsync_core::domain::newtypes::CalendarId;
use calsync_core::domain::WorkspaceCredential;
use calsync_core::ports::{ICalendarProvider, IEventStore, SyncJobPayload, Tokens};
use calsync_core::usecases::{SyncOutcome, SyncSettings, SyncWorkspaceUseCase};
use calsync_google::{GoogleCalendarProvider, TimezonePolicy};

use crate::error::SyncError;
use crate::queue::IJobRunner;
use crate::reconciler::Reconciler;

/// Builds a calendar provider for one job from that job's tokens.
///
/// Indirection point for tests; production uses [`google_provider_factory`].
pub type ProviderFactory = dyn Fn(Tokens) -> Arc<dyn ICalendarProvider> + Send + Sync;

/// Factory producing real Google Calendar providers from the configured
/// API endpoints.
pub fn google_provider_factory(config: GoogleConfig) -> Box<ProviderFactory> {
    Box::new(move |tokens| {
        let provider: Arc<dyn ICalendarProvider> =
            Arc::new(GoogleCalendarProvider::new(tokens, &config));
        provider
    })
}

/// Runs queued sync jobs against the real use case stack.
pub struct SyncJobRunner {
    store: Arc<dyn IEventStore>,
    provider_factory: Box<ProviderFactory>,
    settings: SyncSettings,
    policy: TimezonePolicy,
}

impl SyncJobRunner {
    pub fn new(
        store: Arc<dyn IEventStore>,
        provider_factory: Box<ProviderFactory>,
        settings: SyncSettings,
        policy: TimezonePolicy,
    ) -> Self {
        Self {
            store,
            provider_factory,
            settings,
            policy,
        }
    }

    /// Writes back tokens the provider refreshed during the run so the
    /// next pass does not start with a token already known to be stale.
    /// Persistence failure is logged, not fatal: the run itself succeeded.
    async fn persist_refreshed_tokens(
        &self,
        payload: &SyncJobPayload,
        provider: &dyn ICalendarProvider,
    ) {
        let tokens = provider.current_tokens().await;
        if tokens.access_token == payload.access_token {
            return;
        }

        debug!(ws_id = %payload.ws_id, "Persisting refreshed access token");
        let credential = WorkspaceCredential {
            ws_id: payload.ws_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        };
        if let Err(err) = self.store.save_credential(&credential).await {
            warn!(ws_id = %payload.ws_id, %err, "Failed to persist refreshed tokens");
        }
    }
}

#[async_trait::async_trait]
impl IJobRunner for SyncJobRunner {
    async fn run(&self, payload: &SyncJobPayload) -> Result<SyncOutcome, SyncError> {
        if payload.access_token.trim().is_empty() {
            return Err(SyncError::Auth(
                "workspace has no access token".to_string(),
            ));
        }

        // Expiry is unknown at this point; marking the token expired
        // makes the client refresh lazily on the first 401.
        let provider = (self.provider_factory)(Tokens {
            access_token: payload.access_token.clone(),
            refresh_token: payload.refresh_token.clone(),
            expires_at: Utc::now(),
        });

        let reconciler = Arc::new(Reconciler::new(self.store.clone(), self.policy.clone()));
        let use_case = SyncWorkspaceUseCase::new(
            provider.clone(),
            self.store.clone(),
            reconciler,
            self.settings.clone(),
        );

        let calendar_id = payload
            .calendar_id
            .clone()
            .unwrap_or_else(CalendarId::primary);

        let result = use_case
            .execute(&payload.ws_id, &calendar_id)
            .await
            .map_err(SyncError::from_run_error);

        if let Ok(outcome) = &result {
            info!(
                ws_id = %payload.ws_id,
                calendar = %calendar_id,
                synced = outcome.events_synced,
                deleted = outcome.events_deleted,
                full_sync = outcome.full_sync,
                "Workspace sync finished"
            );
            self.persist_refreshed_tokens(payload, provider.as_ref()).await;
        }

        result
    }
}
