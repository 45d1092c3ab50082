//! Emotional dimensions and the shift engine.
//!
//! Every tracked character carries a vector over a fixed set of 8 dimensions,
//! each an integer in [1,10]. Scenes leave residue as sparse shifts; the shift
//! engine applies them and clamps the result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest value any dimension can hold.
pub const DIMENSION_MIN: u8 = 1;

/// Highest value any dimension can hold.
pub const DIMENSION_MAX: u8 = 10;

/// The 8 emotional axes every character is tracked on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Anger,
    Fear,
    Grief,
    Shame,
    Hope,
    Betrayal,
    Confusion,
    Longing,
}

impl Dimension {
    /// Every dimension, in canonical order.
    pub const ALL: [Dimension; 8] = [
        Dimension::Anger,
        Dimension::Fear,
        Dimension::Grief,
        Dimension::Shame,
        Dimension::Hope,
        Dimension::Betrayal,
        Dimension::Confusion,
        Dimension::Longing,
    ];

    /// Resting value for this dimension. Hope starts higher than the rest.
    pub fn baseline(&self) -> u8 {
        match self {
            Dimension::Hope => 5,
            _ => 3,
        }
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Anger => "anger",
            Dimension::Fear => "fear",
            Dimension::Grief => "grief",
            Dimension::Shame => "shame",
            Dimension::Hope => "hope",
            Dimension::Betrayal => "betrayal",
            Dimension::Confusion => "confusion",
            Dimension::Longing => "longing",
        }
    }

    /// Parse a dimension from its canonical name.
    pub fn parse(name: &str) -> Option<Self> {
        Dimension::ALL.into_iter().find(|d| d.name() == name)
    }

    /// Short gloss used in analysis prompts.
    pub fn gloss(&self) -> &'static str {
        match self {
            Dimension::Anger => "frustration, rage, injustice",
            Dimension::Fear => "anxiety, dread, threat of loss",
            Dimension::Grief => "loss, mourning, absence",
            Dimension::Shame => "inadequacy, exposure, failure",
            Dimension::Hope => "possibility, expectation, light ahead",
            Dimension::Betrayal => "trust broken, surprise betrayal, deception",
            Dimension::Confusion => "disorientation, identity crisis, lost direction",
            Dimension::Longing => "desire, want, ache for what's missing",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A character's current emotional vector.
///
/// Values are always within [`DIMENSION_MIN`, `DIMENSION_MAX`]. A dimension
/// missing from a deserialized state reads as its baseline, never as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EmotionalState {
    values: BTreeMap<Dimension, u8>,
}

impl EmotionalState {
    /// Create a state with every dimension at its baseline.
    pub fn baseline() -> Self {
        let mut state = Self::default();
        for dim in Dimension::ALL {
            state.values.insert(dim, dim.baseline());
        }
        state
    }

    /// Read a dimension, falling back to its baseline if absent.
    pub fn get(&self, dim: Dimension) -> u8 {
        self.values.get(&dim).copied().unwrap_or(dim.baseline())
    }

    /// Set a dimension, clamping into the valid range.
    pub fn set(&mut self, dim: Dimension, value: u8) {
        self.values
            .insert(dim, value.clamp(DIMENSION_MIN, DIMENSION_MAX));
    }

    /// Builder-style setter.
    pub fn with(mut self, dim: Dimension, value: u8) -> Self {
        self.set(dim, value);
        self
    }

    /// Apply a sparse shift and return the new state.
    ///
    /// Every dimension ends up present in the result. Dimensions absent from
    /// the shift are carried over unchanged; results are clamped to [1,10].
    pub fn apply_shifts(&self, shift: &EmotionShift) -> EmotionalState {
        let mut result = EmotionalState::default();
        for dim in Dimension::ALL {
            let current = i16::from(self.get(dim));
            let delta = i16::from(shift.get(dim));
            let shifted = (current + delta)
                .clamp(i16::from(DIMENSION_MIN), i16::from(DIMENSION_MAX));
            result.values.insert(dim, shifted as u8);
        }
        result
    }

    /// Dimensions at or above `min`, sorted by value (descending).
    pub fn elevated(&self, min: u8) -> Vec<(Dimension, u8)> {
        let mut hot: Vec<_> = Dimension::ALL
            .into_iter()
            .map(|d| (d, self.get(d)))
            .filter(|(_, v)| *v >= min)
            .collect();
        hot.sort_by(|a, b| b.1.cmp(&a.1));
        hot
    }

    /// Iterate over all dimensions and their effective values.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, u8)> + '_ {
        Dimension::ALL.into_iter().map(|d| (d, self.get(d)))
    }
}

impl std::fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<_> = self.iter().map(|(d, v)| format!("{}: {}", d, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// A sparse, signed delta over the emotional dimensions.
///
/// Shifts are typically within [-3, +3] per dimension, though the engine does
/// not enforce that; the clamp in [`EmotionalState::apply_shifts`] bounds the
/// outcome either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EmotionShift {
    deltas: BTreeMap<Dimension, i8>,
}

impl EmotionShift {
    /// Create an empty shift.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style delta setter.
    pub fn with(mut self, dim: Dimension, delta: i8) -> Self {
        self.deltas.insert(dim, delta);
        self
    }

    /// Read the delta for a dimension (0 if absent).
    pub fn get(&self, dim: Dimension) -> i8 {
        self.deltas.get(&dim).copied().unwrap_or(0)
    }

    /// True if no dimension shifts.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty() || self.deltas.values().all(|d| *d == 0)
    }

    /// Iterate over the non-zero deltas.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, i8)> + '_ {
        self.deltas
            .iter()
            .filter(|(_, d)| **d != 0)
            .map(|(dim, d)| (*dim, *d))
    }

    /// Parse a shift from a JSON object like `{"fear": 2, "hope": -1}`.
    ///
    /// Keys outside the fixed dimension set and non-integer values are
    /// ignored rather than rejected; an empty object parses to an empty shift.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let mut shift = EmotionShift::new();
        if let Some(object) = value.as_object() {
            for (key, raw) in object {
                let Some(dim) = Dimension::parse(key) else {
                    continue;
                };
                if let Some(delta) = raw.as_i64() {
                    shift.deltas.insert(dim, delta.clamp(-128, 127) as i8);
                }
            }
        }
        Ok(shift)
    }
}

impl std::fmt::Display for EmotionShift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<_> = self
            .iter()
            .map(|(d, v)| format!("{} {}{}", d, if v > 0 { "+" } else { "" }, v))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
