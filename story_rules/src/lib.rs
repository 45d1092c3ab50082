//! # Story Rules
//!
//! The "Character Bible" crate - emotional dimensions, wound thresholds, and
//! defense styles. This crate is the single source of truth for character
//! state rules and does not contain any AI logic or I/O.

pub mod characters;
pub mod emotions;
pub mod thresholds;

pub use characters::*;
pub use emotions::*;
pub use thresholds::*;
