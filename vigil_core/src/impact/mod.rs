//! Prose impact analysis - how scenes leave residue on characters.
//!
//! When prose goes to review, the analyzer reads what happened to the
//! character in the scene and shifts their emotional state accordingly.
//! Characters don't know they're being analyzed; the shifts happen beneath
//! the story. A scene that looks calm on the surface can still quietly push
//! shame to 7.
//!
//! The pipeline is strictly best-effort: analysis failure, persistence
//! failure, and anything downstream in threshold checking is absorbed and
//! logged. Never interrupt the writing session.

use std::sync::Arc;
use std::time::Duration;

use story_rules::{CharacterId, Dimension, EmotionShift, EmotionalState, ThresholdConfig};

use crate::error::{GenerationError, ImpactError};
use crate::generator::TextGenerator;
use crate::session::ProfileStore;
use crate::watcher::ThresholdWatcher;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_TOKENS: u32 = 150;

/// At most this many characters of prose are sent for analysis.
const PROSE_LIMIT: usize = 4000;

/// Reads prose and produces emotional shifts for one character.
pub struct ImpactAnalyzer {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    max_tokens: u32,
}

impl ImpactAnalyzer {
    /// Create an analyzer with default timeout and token budget.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the analysis timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Determine the emotional shifts this prose causes for the character.
    ///
    /// The generator is asked for a bare JSON delta object; unknown keys in
    /// the reply are ignored, and `{}` means the scene didn't land.
    pub async fn analyze_prose(
        &self,
        prose: &str,
        config: &ThresholdConfig,
        state: &EmotionalState,
    ) -> Result<EmotionShift, ImpactError> {
        let system = analysis_system_prompt(config, state);
        let excerpt: String = prose.chars().take(PROSE_LIMIT).collect();
        let user = format!(
            "Read this prose and determine the emotional impact on {}:\n\n{}",
            config.name, excerpt
        );

        let reply = tokio::time::timeout(
            self.timeout,
            self.generator.generate(&system, &user, self.max_tokens),
        )
        .await
        .map_err(|_| GenerationError::TimedOut(self.timeout))??;

        Ok(EmotionShift::from_json_str(reply.trim())?)
    }
}

fn analysis_system_prompt(config: &ThresholdConfig, state: &EmotionalState) -> String {
    let dimensions = Dimension::ALL
        .iter()
        .map(|dim| format!("  {} (1-10) -- {}", dim, dim.gloss()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a psychological narrative analyst. You read fiction prose and determine \
         the emotional impact on a specific character.\n\
         \n\
         CHARACTER: {name}\n\
         CORE WOUND: {wound}\n\
         NATURE: {nature}\n\
         \n\
         CURRENT EMOTIONAL STATE: {state}\n\
         \n\
         DIMENSIONS TO ANALYZE:\n{dimensions}\n\
         \n\
         RULES:\n\
         -- Read the prose as if this character just lived through it.\n\
         -- Some scenes affect them deeply. Some barely register.\n\
         -- A scene where their wound is touched shifts more.\n\
         -- A calm scene might still create longing or hope.\n\
         -- Shifts are typically +1 to +3 for meaningful scenes, -1 for relief.\n\
         -- Never drop hope below 1.\n\
         -- Consider both surface events AND subtext.\n\
         -- The character's core wound amplifies specific dimensions.\n\
         \n\
         RESPOND WITH ONLY A JSON OBJECT of emotional shifts (deltas, not absolutes).\n\
         Example: {{\"fear\": 2, \"shame\": 1, \"hope\": -1}}\n\
         Only include dimensions that actually shift. Empty {{}} if the scene doesn't \
         impact them.\n\
         No explanation. No markdown. Just the JSON.",
        name = config.name,
        wound = config.wound,
        nature = config.nature,
        state = state,
        dimensions = dimensions,
    )
}

/// What processing one piece of prose did to a character.
#[derive(Debug, Clone)]
pub enum ImpactOutcome {
    /// Nothing changed: untracked character, empty prose, failed analysis,
    /// or a scene that didn't land.
    Unchanged,
    /// The state shifted and thresholds were re-checked.
    Shifted {
        deltas: EmotionShift,
        old_state: EmotionalState,
        new_state: EmotionalState,
        elevated: Vec<(Dimension, u8)>,
    },
}

impl ImpactOutcome {
    /// True if the character's state moved.
    pub fn shifted(&self) -> bool {
        matches!(self, ImpactOutcome::Shifted { .. })
    }
}

/// Full pipeline: analyze prose, shift state, persist, check thresholds.
pub struct ImpactPipeline {
    analyzer: ImpactAnalyzer,
    profiles: Arc<dyn ProfileStore>,
    watcher: Arc<ThresholdWatcher>,
}

impl ImpactPipeline {
    /// Create a pipeline over the shared profile store and watcher.
    pub fn new(
        analyzer: ImpactAnalyzer,
        profiles: Arc<dyn ProfileStore>,
        watcher: Arc<ThresholdWatcher>,
    ) -> Self {
        Self {
            analyzer,
            profiles,
            watcher,
        }
    }

    /// Process one piece of reviewed prose for one character.
    ///
    /// Always returns an outcome; every failure along the way is logged and
    /// absorbed so the write event that invoked us still succeeds.
    pub async fn process_prose(&self, character_id: CharacterId, prose: &str) -> ImpactOutcome {
        if prose.trim().is_empty() {
            return ImpactOutcome::Unchanged;
        }
        let Some(config) = self.watcher.table().get(character_id).cloned() else {
            // Untracked characters carry no emotional bookkeeping.
            return ImpactOutcome::Unchanged;
        };

        let profile = match self.profiles.get_or_create(character_id).await {
            Ok(profile) => profile,
            Err(error) => {
                tracing::error!(character = %config.name, %error, "profile lookup failed");
                return ImpactOutcome::Unchanged;
            }
        };

        let deltas = match self
            .analyzer
            .analyze_prose(prose, &config, &profile.state)
            .await
        {
            Ok(deltas) => deltas,
            Err(error) => {
                tracing::warn!(character = %config.name, %error, "impact analysis failed");
                return ImpactOutcome::Unchanged;
            }
        };

        if deltas.is_empty() {
            tracing::debug!(character = %config.name, "no emotional shift from this scene");
            return ImpactOutcome::Unchanged;
        }

        let old_state = profile.state.clone();
        let new_state = old_state.apply_shifts(&deltas);

        if let Err(error) = self
            .profiles
            .save_state(character_id, new_state.clone())
            .await
        {
            tracing::error!(character = %config.name, %error, "could not persist shifted state");
            return ImpactOutcome::Unchanged;
        }

        tracing::info!(character = %config.name, shift = %deltas, "emotional shift applied");

        // This is where knocks happen. The watcher absorbs its own failures.
        let summary = self.watcher.check_all_thresholds().await;
        tracing::debug!(?summary, "threshold run after prose impact");

        let elevated = new_state.elevated(6);
        ImpactOutcome::Shifted {
            deltas,
            old_state,
            new_state,
            elevated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FailingGenerator, StaticGenerator};
    use crate::knock::KnockWriter;
    use crate::notify::TracingNotifier;
    use crate::session::{MemoryProfileStore, MemorySessionStore, SessionStore};
    use story_rules::{
        DefenseStyle, ThresholdLine, ThresholdTable, WoundArchetype,
    };

    fn config() -> ThresholdConfig {
        ThresholdConfig::new(
            "Asha Brennan",
            WoundArchetype::Interior,
            ThresholdLine::new(Dimension::Longing, 8),
            ThresholdLine::new(Dimension::Shame, 6),
        )
        .with_wound("Told for years that wanting more was ingratitude.")
        .with_nature("Moves toward truth. Cannot write anything she doesn't fully believe.")
        .with_defense(DefenseStyle::Displace)
        .with_fallback_knock("Someone else got the thing I've been working toward.")
    }

    struct Fixture {
        pipeline: ImpactPipeline,
        profiles: Arc<MemoryProfileStore>,
        sessions: Arc<MemorySessionStore>,
        id: CharacterId,
    }

    fn fixture(analysis_reply: &str) -> Fixture {
        let id = CharacterId::new();
        let table = ThresholdTable::new().with(id, config());
        let profiles = Arc::new(MemoryProfileStore::new());
        let sessions = Arc::new(MemorySessionStore::new());

        let watcher = Arc::new(ThresholdWatcher::new(
            table,
            profiles.clone(),
            sessions.clone(),
            Arc::new(TracingNotifier),
            KnockWriter::new(Arc::new(StaticGenerator::new("The knock."))),
        ));
        let pipeline = ImpactPipeline::new(
            ImpactAnalyzer::new(Arc::new(StaticGenerator::new(analysis_reply))),
            profiles.clone(),
            watcher,
        );
        Fixture {
            pipeline,
            profiles,
            sessions,
            id,
        }
    }

    const PROSE: &str = "She watched the announcement from the back of the room, \
                         clapping with everyone else.";

    #[tokio::test]
    async fn test_shift_applied_and_persisted() {
        let f = fixture(r#"{"longing": 3, "shame": 1}"#);

        let outcome = f.pipeline.process_prose(f.id, PROSE).await;
        assert!(outcome.shifted());

        let profile = f.profiles.get(f.id).await.unwrap().unwrap();
        assert_eq!(profile.state.get(Dimension::Longing), 6);
        assert_eq!(profile.state.get(Dimension::Shame), 4);
    }

    #[tokio::test]
    async fn test_shift_over_threshold_knocks() {
        let f = fixture(r#"{"longing": 3}"#);
        let state = EmotionalState::baseline().with(Dimension::Longing, 6);
        f.profiles.save_state(f.id, state).await.unwrap();

        let outcome = f.pipeline.process_prose(f.id, PROSE).await;
        assert!(outcome.shifted());

        // longing 6 + 3 = 9 crosses the (longing, 8) line.
        let waiting = f.sessions.waiting_sessions().await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].trigger_dimension, Dimension::Longing);
        assert_eq!(waiting[0].trigger_value, 9);
    }

    #[tokio::test]
    async fn test_empty_delta_object_means_unchanged() {
        let f = fixture("{}");
        let outcome = f.pipeline.process_prose(f.id, PROSE).await;
        assert!(!outcome.shifted());
    }

    #[tokio::test]
    async fn test_analysis_failure_is_absorbed() {
        let id = CharacterId::new();
        let table = ThresholdTable::new().with(id, config());
        let profiles = Arc::new(MemoryProfileStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let watcher = Arc::new(ThresholdWatcher::new(
            table,
            profiles.clone(),
            sessions,
            Arc::new(TracingNotifier),
            KnockWriter::new(Arc::new(StaticGenerator::new("The knock."))),
        ));
        let pipeline = ImpactPipeline::new(
            ImpactAnalyzer::new(Arc::new(FailingGenerator)),
            profiles,
            watcher,
        );

        let outcome = pipeline.process_prose(id, PROSE).await;
        assert!(!outcome.shifted());
    }

    #[tokio::test]
    async fn test_untracked_character_unchanged() {
        let f = fixture(r#"{"fear": 2}"#);
        let outcome = f.pipeline.process_prose(CharacterId::new(), PROSE).await;
        assert!(!outcome.shifted());
    }

    #[tokio::test]
    async fn test_empty_prose_unchanged() {
        let f = fixture(r#"{"fear": 2}"#);
        let outcome = f.pipeline.process_prose(f.id, "   ").await;
        assert!(!outcome.shifted());
    }

    #[tokio::test]
    async fn test_garbage_reply_is_absorbed() {
        let f = fixture("She seems fine to me.");
        let outcome = f.pipeline.process_prose(f.id, PROSE).await;
        assert!(!outcome.shifted());
    }

    #[tokio::test]
    async fn test_outcome_reports_old_and_new_state() {
        let f = fixture(r#"{"shame": 2, "hope": -1}"#);

        let outcome = f.pipeline.process_prose(f.id, PROSE).await;
        let ImpactOutcome::Shifted {
            old_state,
            new_state,
            deltas,
            ..
        } = outcome
        else {
            panic!("expected a shift");
        };

        assert_eq!(old_state.get(Dimension::Shame), 3);
        assert_eq!(new_state.get(Dimension::Shame), 5);
        assert_eq!(new_state.get(Dimension::Hope), 4);
        assert_eq!(deltas.get(Dimension::Shame), 2);
    }

    #[test]
    fn test_analysis_prompt_contents() {
        let prompt = analysis_system_prompt(&config(), &EmotionalState::baseline());
        assert!(prompt.contains("CHARACTER: Asha Brennan"));
        assert!(prompt.contains("longing (1-10)"));
        assert!(prompt.contains("RESPOND WITH ONLY A JSON OBJECT"));
        assert!(prompt.contains("hope: 5"));
    }
}
