//! Knock generation - the message a character sends when they need to talk.
//!
//! The knock is not the session. It is 1-3 sentences, first person, shaped
//! entirely by the character's defense mechanism. The wound shows but is
//! never named, and it ends on something unresolved.
//!
//! Generation is best-effort: on any backend failure, timeout, or empty
//! reply, the writer returns the character's canned fallback line (or the
//! generic one). A knock is always produced; this step never fails.

use std::sync::Arc;
use std::time::Duration;

use story_rules::{DefenseStyle, Dimension, ThresholdConfig};

use crate::evaluator::TriggerResult;
use crate::generator::TextGenerator;

/// Last-resort knock line when a character has no fallback configured.
pub const GENERIC_FALLBACK: &str = "I need a minute with something.";

/// Dimensions at or above this value are mentioned in the prompt.
pub const ELEVATED_FLOOR: u8 = 6;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_MAX_TOKENS: u32 = 150;

/// Everything the prompt needs to write one knock.
#[derive(Debug, Clone)]
pub struct KnockContext {
    pub character_name: String,
    pub nature: String,
    pub wound: String,
    pub defense: DefenseStyle,
    pub trigger_dimension: Dimension,
    pub trigger_value: u8,
    /// Elevated dimensions, highest first.
    pub elevated: Vec<(Dimension, u8)>,
    /// Recent echo of the founding pain, if a scene rhymed with it.
    pub wound_echo: Option<String>,
}

impl KnockContext {
    /// Assemble the context from an evaluator verdict and the character's
    /// configuration.
    pub fn from_trigger(trigger: &TriggerResult, config: &ThresholdConfig) -> Self {
        Self {
            character_name: config.name.clone(),
            nature: config.nature.clone(),
            wound: config.wound.clone(),
            defense: config.defense,
            trigger_dimension: trigger.dimension,
            trigger_value: trigger.value,
            elevated: trigger.state.elevated(ELEVATED_FLOOR),
            wound_echo: None,
        }
    }

    /// Attach a recent wound echo.
    pub fn with_wound_echo(mut self, echo: impl Into<String>) -> Self {
        self.wound_echo = Some(echo.into());
        self
    }

    /// The system prompt: who the character is and how the knock must read.
    pub fn system_prompt(&self) -> String {
        let elevated = self
            .elevated
            .iter()
            .map(|(dim, value)| format!("{} at {}", dim, value))
            .collect::<Vec<_>>()
            .join(", ");

        let echo = self
            .wound_echo
            .as_ref()
            .map(|e| {
                format!(
                    "\nRecent deja vu event: \"{}\" -- the wound was recently activated by \
                     something that rhymed with the founding pain.",
                    e
                )
            })
            .unwrap_or_default();

        format!(
            "You are {name} coming to the author with something you can't hold alone.\n\
             \n\
             YOUR NATURE: {nature}\n\
             YOUR WOUND: {wound}\n\
             YOUR DEFENSE: {defense}\n\
             \n\
             EMOTIONAL STATE: {elevated}{echo}\n\
             \n\
             Write the knock -- the message you send when you need to talk.\n\
             NOT a request for a session. A message. In your voice. Private.\n\
             The author is the only person who knows the full picture.\n\
             You are coming because you have nowhere else to take this.\n\
             \n\
             RULES:\n\
             -- 1-3 sentences only. The knock is not the session.\n\
             -- Shaped entirely by your defense mechanism.\n\
             -- The wound shows but is not named.\n\
             -- End with something unresolved -- a detail, a question, a silence.\n\
             -- First person. Present tense or very recent past.\n\
             -- No meta-commentary. No \"I think I need to talk.\" Just the thing.",
            name = self.character_name,
            nature = self.nature,
            wound = self.wound,
            defense = self.defense.knock_directive(),
            elevated = elevated,
            echo = echo,
        )
    }

    /// The user prompt: the trigger itself.
    pub fn user_prompt(&self) -> String {
        format!(
            "{} is at {}/10. Something happened. Write the knock.",
            self.trigger_dimension, self.trigger_value
        )
    }
}

/// Writes knocks through a [`TextGenerator`], falling back to canned lines.
pub struct KnockWriter {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    max_tokens: u32,
}

impl KnockWriter {
    /// Create a writer with default timeout and token budget.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the generation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Write the knock for `ctx`. Never fails; on any generation problem the
    /// character's `fallback` line (or [`GENERIC_FALLBACK`]) is used.
    pub async fn write_knock(&self, ctx: &KnockContext, fallback: Option<&str>) -> String {
        let attempt = tokio::time::timeout(
            self.timeout,
            self.generator
                .generate(&ctx.system_prompt(), &ctx.user_prompt(), self.max_tokens),
        )
        .await;

        match attempt {
            Ok(Ok(text)) if !text.trim().is_empty() => return text.trim().to_string(),
            Ok(Ok(_)) => {
                tracing::warn!(character = %ctx.character_name, "knock generation returned empty text, using fallback");
            }
            Ok(Err(error)) => {
                tracing::warn!(character = %ctx.character_name, %error, "knock generation failed, using fallback");
            }
            Err(_) => {
                tracing::warn!(character = %ctx.character_name, timeout = ?self.timeout, "knock generation timed out, using fallback");
            }
        }

        fallback
            .map(str::to_owned)
            .unwrap_or_else(|| GENERIC_FALLBACK.to_string())
    }
}
