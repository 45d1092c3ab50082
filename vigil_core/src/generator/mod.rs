//! Text-generation capability.
//!
//! The engine never talks to a model API directly; it goes through the
//! [`TextGenerator`] trait. Deployments pick the real backend
//! ([`AnthropicGenerator`]) or a deterministic stub, so tests and offline
//! setups never depend on network availability.

mod anthropic;

pub use anthropic::*;

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GenerationError;

/// A backend that can turn a prompt into text.
///
/// Returning an error signals "use the fallback" to knock-path callers.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError>;
}

/// Deterministic generator returning a fixed reply. Records the prompts it
/// was given so tests can assert on them.
#[derive(Debug, Default)]
pub struct StaticGenerator {
    reply: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticGenerator {
    /// Create a generator that always replies with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The (system, user) prompt pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("generator call log poisoned").clone()
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        _max_tokens: u32,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .expect("generator call log poisoned")
            .push((system.to_string(), user.to_string()));
        Ok(self.reply.clone())
    }
}

/// Generator that always fails, for exercising fallback paths.
#[derive(Debug, Default)]
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(
        &self,
        _system: &str,
        _user: &str,
        _max_tokens: u32,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Request("generator disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_generator_replies_and_records() {
        let generator = StaticGenerator::new("the knock");

        let reply = generator.generate("system", "user", 100).await.unwrap();
        assert_eq!(reply, "the knock");

        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "system");
    }

    #[tokio::test]
    async fn test_failing_generator_errors() {
        let generator = FailingGenerator;
        assert!(generator.generate("s", "u", 100).await.is_err());
    }
}
