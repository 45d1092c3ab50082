//! The threshold watcher - runs every tracked character through the
//! evaluator and lets the ones whose wound is activated knock.
//!
//! Invoked on demand after write events (a line approved, a session closed,
//! a beat logged), never as a background poller. Characters are processed
//! sequentially; a failure for one character is logged and never stops the
//! rest, and the run itself never returns an error. Threshold checking is
//! best-effort: the write event that triggered it must always succeed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use story_rules::{CharacterId, ThresholdTable};

use crate::error::StoreError;
use crate::evaluator::check_character_threshold;
use crate::knock::{KnockContext, KnockWriter};
use crate::notify::{KnockNotification, Notifier};
use crate::session::{
    EmotionalProfile, PendingSession, ProfileStore, SessionId, SessionStatus, SessionStore,
};

/// Hours a character stays quiet after their last session closed.
pub const DEFAULT_COOLDOWN_HOURS: i64 = 24;

const DEFAULT_SESSION_URL: &str = "/sessions";

/// What one watcher run did, for logs and callers that want numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Profiles examined.
    pub checked: usize,
    /// Knocks fired and persisted.
    pub knocked: usize,
    /// Untracked characters and door-rule race suppressions.
    pub skipped: usize,
    /// Characters whose evaluation failed (logged, not propagated).
    pub failed: usize,
}

enum CheckOutcome {
    /// No threshold entry for this character. Most characters are untracked.
    Untracked,
    /// Tracked, but no knock fired.
    Quiet,
    /// Another writer recorded the waiting session first.
    Suppressed,
    Knocked,
}

/// The orchestrator. Owns the threshold table and talks to every
/// collaborator; the evaluator itself stays pure.
pub struct ThresholdWatcher {
    table: ThresholdTable,
    profiles: Arc<dyn ProfileStore>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    knocks: KnockWriter,
    cooldown: Duration,
    session_url: String,
}

impl ThresholdWatcher {
    /// Create a watcher with the default cooldown and session URL.
    pub fn new(
        table: ThresholdTable,
        profiles: Arc<dyn ProfileStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        knocks: KnockWriter,
    ) -> Self {
        Self {
            table,
            profiles,
            sessions,
            notifier,
            knocks,
            cooldown: Duration::hours(DEFAULT_COOLDOWN_HOURS),
            session_url: DEFAULT_SESSION_URL.to_string(),
        }
    }

    /// Override the cooldown window.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Override the session URL included in notifications.
    pub fn with_session_url(mut self, url: impl Into<String>) -> Self {
        self.session_url = url.into();
        self
    }

    /// The injected threshold table.
    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    /// Run every tracked character through the evaluator.
    ///
    /// Never returns an error: per-character failures are logged and counted
    /// in the summary, and a failure to even list profiles yields an empty
    /// run.
    pub async fn check_all_thresholds(&self) -> RunSummary {
        let profiles = match self.profiles.all_profiles().await {
            Ok(profiles) => profiles,
            Err(error) => {
                tracing::error!(%error, "could not load profiles, skipping threshold run");
                return RunSummary::default();
            }
        };

        let mut summary = RunSummary::default();
        for profile in profiles {
            summary.checked += 1;
            match self.check_one(&profile).await {
                Ok(CheckOutcome::Knocked) => summary.knocked += 1,
                Ok(CheckOutcome::Untracked) | Ok(CheckOutcome::Suppressed) => {
                    summary.skipped += 1;
                }
                Ok(CheckOutcome::Quiet) => {}
                Err(error) => {
                    tracing::error!(
                        character = %profile.character_id,
                        %error,
                        "threshold check failed for character"
                    );
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    async fn check_one(&self, profile: &EmotionalProfile) -> Result<CheckOutcome, StoreError> {
        let character_id = profile.character_id;
        let Some(config) = self.table.get(character_id) else {
            return Ok(CheckOutcome::Untracked);
        };

        let pending = self.sessions.find_waiting(character_id).await?;
        let now = Utc::now();

        let Some(trigger) = check_character_threshold(
            character_id,
            config,
            &profile.state,
            pending.as_ref(),
            profile.last_session_at,
            now,
            self.cooldown,
        ) else {
            return Ok(CheckOutcome::Quiet);
        };

        let mut context = KnockContext::from_trigger(&trigger, config);
        if let Some(echo) = &profile.last_wound_echo {
            context = context.with_wound_echo(echo.clone());
        }
        let knock_message = self
            .knocks
            .write_knock(&context, config.fallback_knock.as_deref())
            .await;

        let session = PendingSession {
            id: SessionId::new(),
            character_id,
            character_name: config.name.clone(),
            archetype: config.archetype,
            knock_message: knock_message.clone(),
            wound: config.wound.clone(),
            state_snapshot: trigger.state.clone(),
            trigger_dimension: trigger.dimension,
            trigger_value: trigger.value,
            status: SessionStatus::Waiting,
            created_at: now,
        };

        match self.sessions.create_waiting(session).await {
            Ok(_) => {}
            Err(StoreError::AlreadyWaiting(_)) => {
                // Lost the race to a concurrent run; their knock stands.
                tracing::debug!(character = %config.name, "knock suppressed, session already waiting");
                return Ok(CheckOutcome::Suppressed);
            }
            Err(error) => return Err(error),
        }

        let notification = KnockNotification {
            character_name: config.name.clone(),
            archetype: config.archetype,
            accent_color: config.archetype.accent_color().to_string(),
            knock_message,
            wound: config.wound.clone(),
            elevated: context.elevated.clone(),
            trigger_event: trigger.event_description(),
            session_url: self.session_url.clone(),
        };
        if let Err(error) = self.notifier.send(&notification).await {
            tracing::warn!(character = %config.name, %error, "knock notification failed");
        }

        tracing::info!(
            character = %config.name,
            trigger = %trigger.event_description(),
            "character knocked"
        );
        Ok(CheckOutcome::Knocked)
    }

    /// The author opens the door: mark the waiting session opened and stamp
    /// the cooldown marker.
    pub async fn open_session(&self, id: CharacterId) -> Result<PendingSession, StoreError> {
        let session = self.sessions.mark_opened(id).await?;
        self.profiles.record_session(id, Utc::now()).await?;
        tracing::info!(character = %session.character_name, "session opened");
        Ok(session)
    }

    /// All knocks still waiting for the door, oldest first.
    pub async fn waiting_sessions(&self) -> Result<Vec<PendingSession>, StoreError> {
        self.sessions.waiting_sessions().await
    }
}
