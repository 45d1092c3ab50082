//! Character identity and disposition types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for all tracked characters.
///
/// Identity is resolved once, when a character enters the system. Runtime
/// lookups (threshold table, profiles, pending sessions) all key on this id,
/// never on a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    /// Create a new random character ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a character ID from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Create a nil/empty character ID (useful for defaults).
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CharacterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a character shapes the knock when they finally reach out.
///
/// The defense mechanism never decides *whether* a knock happens, only what
/// it sounds like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseStyle {
    Rationalize,
    Withdraw,
    Intellectualize,
    Perform,
    Displace,
    Minimize,
    Confront,
}

impl DefenseStyle {
    /// Writing directive for a knock shaped by this defense.
    pub fn knock_directive(&self) -> &'static str {
        match self {
            DefenseStyle::Rationalize => {
                "They come with an explanation, not a feeling. The feeling is underneath the explanation."
            }
            DefenseStyle::Withdraw => {
                "They come with a single sentence. Brief. They've been holding it a long time."
            }
            DefenseStyle::Intellectualize => {
                "They come with a question that sounds analytical. The wound is in the question."
            }
            DefenseStyle::Perform => {
                "They arrive almost normal. Something small at the end gives it away."
            }
            DefenseStyle::Displace => {
                "They talk about something else entirely. The real thing surfaces in the last line."
            }
            DefenseStyle::Minimize => "They say it's probably nothing. It's not nothing.",
            DefenseStyle::Confront => {
                "They say exactly what happened. No softening. Waiting for your response."
            }
        }
    }
}

impl Default for DefenseStyle {
    fn default() -> Self {
        DefenseStyle::Rationalize
    }
}

/// The role a character's wound plays in the larger story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WoundArchetype {
    /// Protects by containing; pressure builds inward.
    Pressure,
    /// Reflects other people's inadequacy back at them without meaning to.
    Mirror,
    /// Holds pattern, remembers everything, judges nothing.
    Support,
    /// Built it alone; warmth is real but attention is scarce.
    Shadow,
    /// Doesn't fit the other shapes.
    Special,
    /// Professional wounds around money and information.
    Business,
    /// Professional wounds around surface and identity.
    Style,
    /// Professional wounds around influence and its costs.
    Culture,
    /// Professional wounds around wanting more than is permitted.
    Interior,
}

impl WoundArchetype {
    /// Accent color used when presenting knocks from this archetype.
    pub fn accent_color(&self) -> &'static str {
        match self {
            WoundArchetype::Pressure => "#B85C38",
            WoundArchetype::Mirror | WoundArchetype::Style => "#9B7FD4",
            WoundArchetype::Support | WoundArchetype::Culture => "#4A9B6F",
            WoundArchetype::Shadow | WoundArchetype::Interior => "#E08C3A",
            WoundArchetype::Special | WoundArchetype::Business => "#B8962E",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_id_uniqueness() {
        assert_ne!(CharacterId::new(), CharacterId::new());
        assert_eq!(CharacterId::nil(), CharacterId::nil());
    }

    #[test]
    fn test_defense_style_serde() {
        let json = serde_json::to_string(&DefenseStyle::Intellectualize).unwrap();
        assert_eq!(json, "\"intellectualize\"");

        let parsed: DefenseStyle = serde_json::from_str("\"withdraw\"").unwrap();
        assert_eq!(parsed, DefenseStyle::Withdraw);
    }

    #[test]
    fn test_knock_directive_nonempty() {
        let styles = [
            DefenseStyle::Rationalize,
            DefenseStyle::Withdraw,
            DefenseStyle::Intellectualize,
            DefenseStyle::Perform,
            DefenseStyle::Displace,
            DefenseStyle::Minimize,
            DefenseStyle::Confront,
        ];
        for style in styles {
            assert!(!style.knock_directive().is_empty());
        }
    }

    #[test]
    fn test_archetype_color() {
        assert_eq!(WoundArchetype::Pressure.accent_color(), "#B85C38");
        assert_eq!(
            WoundArchetype::Mirror.accent_color(),
            WoundArchetype::Style.accent_color()
        );
    }
}
