//! Wound thresholds - the static per-character trigger configuration.
//!
//! Characters only knock when their wound is genuinely activated. The
//! threshold table says, per character, which dimension carries the wound
//! (primary), which one adds urgency (secondary), and how the knock should
//! read. The table is data, loaded from TOML at startup and injected wherever
//! it is needed; no domain content lives in logic.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::characters::{CharacterId, DefenseStyle, WoundArchetype};
use crate::emotions::{Dimension, DIMENSION_MAX, DIMENSION_MIN};

/// A dimension paired with the level at which it counts as crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdLine {
    pub dimension: Dimension,
    pub level: u8,
}

impl ThresholdLine {
    /// Create a threshold line.
    pub fn new(dimension: Dimension, level: u8) -> Self {
        Self { dimension, level }
    }

    /// Whether `value` reaches or exceeds this line.
    pub fn crossed_by(&self, value: u8) -> bool {
        value >= self.level
    }
}

/// Static trigger configuration for one tracked character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Display name used in knocks and notifications.
    pub name: String,

    pub archetype: WoundArchetype,

    /// Crossing this is necessary and sufficient to trigger a knock.
    pub primary: ThresholdLine,

    /// Crossing this adds urgency and context, never triggers on its own.
    pub secondary: ThresholdLine,

    /// The founding pain, described. Shows in the knock but is never named.
    pub wound: String,

    /// How the character moves through the world.
    pub nature: String,

    #[serde(default)]
    pub defense: DefenseStyle,

    /// Canned knock line used when generation fails.
    #[serde(default)]
    pub fallback_knock: Option<String>,
}

impl ThresholdConfig {
    /// Create a config with the given name and trigger lines.
    pub fn new(
        name: impl Into<String>,
        archetype: WoundArchetype,
        primary: ThresholdLine,
        secondary: ThresholdLine,
    ) -> Self {
        Self {
            name: name.into(),
            archetype,
            primary,
            secondary,
            wound: String::new(),
            nature: String::new(),
            defense: DefenseStyle::default(),
            fallback_knock: None,
        }
    }

    /// Set the wound description.
    pub fn with_wound(mut self, wound: impl Into<String>) -> Self {
        self.wound = wound.into();
        self
    }

    /// Set the nature description.
    pub fn with_nature(mut self, nature: impl Into<String>) -> Self {
        self.nature = nature.into();
        self
    }

    /// Set the defense style.
    pub fn with_defense(mut self, defense: DefenseStyle) -> Self {
        self.defense = defense;
        self
    }

    /// Set the canned fallback knock line.
    pub fn with_fallback_knock(mut self, line: impl Into<String>) -> Self {
        self.fallback_knock = Some(line.into());
        self
    }
}

/// Errors raised while loading or validating a threshold table.
#[derive(Debug, Error)]
pub enum ThresholdTableError {
    #[error("failed to parse threshold table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("character '{name}': {which} level {level} outside [{DIMENSION_MIN},{DIMENSION_MAX}]")]
    InvalidLevel {
        name: String,
        which: &'static str,
        level: u8,
    },

    #[error("duplicate threshold entry for character {0}")]
    DuplicateCharacter(CharacterId),
}

/// TOML shape: a list of `[[character]]` entries, each a config plus its id.
#[derive(Debug, Deserialize)]
struct ThresholdTableFile {
    #[serde(default, rename = "character")]
    characters: Vec<ThresholdTableEntry>,
}

#[derive(Debug, Deserialize)]
struct ThresholdTableEntry {
    id: CharacterId,
    #[serde(flatten)]
    config: ThresholdConfig,
}

/// The injected map from character identity to trigger configuration.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    entries: HashMap<CharacterId, ThresholdConfig>,
}

impl ThresholdTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ThresholdTableError> {
        let file: ThresholdTableFile = toml::from_str(text)?;

        let mut table = ThresholdTable::new();
        for entry in file.characters {
            validate_level(&entry.config, "primary", entry.config.primary.level)?;
            validate_level(&entry.config, "secondary", entry.config.secondary.level)?;
            if table.entries.contains_key(&entry.id) {
                return Err(ThresholdTableError::DuplicateCharacter(entry.id));
            }
            table.entries.insert(entry.id, entry.config);
        }
        Ok(table)
    }

    /// Add or replace a character's configuration.
    pub fn insert(&mut self, id: CharacterId, config: ThresholdConfig) {
        self.entries.insert(id, config);
    }

    /// Builder-style insert.
    pub fn with(mut self, id: CharacterId, config: ThresholdConfig) -> Self {
        self.insert(id, config);
        self
    }

    /// Look up a character's configuration. `None` means untracked.
    pub fn get(&self, id: CharacterId) -> Option<&ThresholdConfig> {
        self.entries.get(&id)
    }

    /// Whether the character is tracked at all.
    pub fn contains(&self, id: CharacterId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterate over all tracked characters.
    pub fn iter(&self) -> impl Iterator<Item = (CharacterId, &ThresholdConfig)> {
        self.entries.iter().map(|(id, config)| (*id, config))
    }

    /// Number of tracked characters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no characters are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_level(
    config: &ThresholdConfig,
    which: &'static str,
    level: u8,
) -> Result<(), ThresholdTableError> {
    if !(DIMENSION_MIN..=DIMENSION_MAX).contains(&level) {
        return Err(ThresholdTableError::InvalidLevel {
            name: config.name.clone(),
            which,
            level,
        });
    }
    Ok(())
}
