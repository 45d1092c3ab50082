//! Crossing evaluator - decides whether a character's knock should fire.
//!
//! The decision runs in a fixed order:
//! 1. **Primary gate**: the primary dimension must reach its trigger level.
//!    Nothing else can trigger on its own.
//! 2. **Door rule**: an existing waiting session suppresses the knock.
//! 3. **Cooldown**: a recent session suppresses the knock, regardless of the
//!    pending record.
//! 4. **Secondary**: crossing the secondary line is recorded for message
//!    context but never gates the trigger.
//!
//! The evaluator is pure. State, pending record, and cooldown timestamp all
//! arrive as parameters; the orchestrator owns every read and write. Calling
//! it repeatedly with the same inputs gives the same answer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use story_rules::{CharacterId, Dimension, EmotionalState, ThresholdConfig};

use crate::session::{PendingSession, SessionStatus};

/// The evaluator's verdict when a knock should fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResult {
    pub character_id: CharacterId,

    /// The primary dimension that crossed.
    pub dimension: Dimension,

    /// Its value at the moment of crossing.
    pub value: u8,

    /// Whether the secondary line was also crossed. Informational only.
    pub secondary_crossed: bool,

    /// Full state snapshot for message generation and the session record.
    pub state: EmotionalState,
}

impl TriggerResult {
    /// Human-readable trigger description, e.g. `"fear reached 8/10"`.
    pub fn event_description(&self) -> String {
        format!("{} reached {}/10", self.dimension, self.value)
    }
}

/// Decide whether `character_id` should knock right now.
///
/// Returns `None` when no knock should fire. Has no side effects.
pub fn check_character_threshold(
    character_id: CharacterId,
    config: &ThresholdConfig,
    state: &EmotionalState,
    pending: Option<&PendingSession>,
    last_session_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Option<TriggerResult> {
    // Primary crossing is the hard gate.
    let primary_value = state.get(config.primary.dimension);
    if !config.primary.crossed_by(primary_value) {
        return None;
    }

    // The door rule: they're already waiting. They don't knock twice.
    if pending.is_some_and(|s| s.status == SessionStatus::Waiting) {
        return None;
    }

    // Cooldown after the last session, independent of the pending record.
    if let Some(last) = last_session_at {
        if now - last < cooldown {
            return None;
        }
    }

    let secondary_value = state.get(config.secondary.dimension);
    let secondary_crossed = config.secondary.crossed_by(secondary_value);

    Some(TriggerResult {
        character_id,
        dimension: config.primary.dimension,
        value: primary_value,
        secondary_crossed,
        state: state.clone(),
    })
}
