//! Error types for the watcher engine, one enum per collaborator concern.

use std::time::Duration;

use story_rules::CharacterId;
use thiserror::Error;

/// Failures from the text-generation collaborator.
///
/// Callers on the knock path never propagate these; they fall back to the
/// canned line instead.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("generation response was malformed: {0}")]
    Malformed(String),

    #[error("generation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("generation returned an empty reply")]
    Empty,
}

/// Failures from the profile and pending-session stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The door rule: the character already has an unacknowledged session.
    #[error("character {0} already has a waiting session")]
    AlreadyWaiting(CharacterId),

    #[error("no waiting session for character {0}")]
    NoWaitingSession(CharacterId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Failures delivering a knock notification. Logged, never retried.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),

    #[error("notification endpoint returned HTTP {0}")]
    Http(u16),
}

/// Failures in the prose-impact pipeline.
#[derive(Debug, Error)]
pub enum ImpactError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("impact analysis returned unparseable deltas: {0}")]
    BadDeltas(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
