//! # Vigil Core (The Vigil)
//!
//! The watcher engine of the narrative system. This crate interfaces with
//! `story_rules`, tracks the emotional residue scenes leave on characters,
//! and lets a character knock when their wound is genuinely activated -- not
//! when the author decides to open a session. When THEY need one.
//!
//! ## Core Components
//!
//! - **evaluator**: Pure crossing decision (primary gate, door rule, cooldown)
//! - **knock**: Knock prompt assembly and generation with canned fallbacks
//! - **session**: Pending sessions, profiles, and their storage traits
//! - **watcher**: The orchestrator that runs all tracked characters
//! - **impact**: Prose analysis pipeline that shifts state and re-checks
//!
//! ## Design Philosophy
//!
//! - **Pure where it counts**: the evaluator takes every input as a parameter
//!   and performs no I/O; the orchestrator owns all reads and writes
//! - **Best-effort everywhere else**: generation, persistence, and delivery
//!   failures are absorbed and logged; the writing session is never
//!   interrupted
//! - **One knock at a time**: the door rule is enforced by the session store,
//!   not just checked by the evaluator

pub mod error;
pub mod evaluator;
pub mod generator;
pub mod impact;
pub mod knock;
pub mod notify;
pub mod session;
pub mod watcher;

pub use error::*;
pub use evaluator::*;
pub use generator::*;
pub use impact::*;
pub use knock::*;
pub use notify::*;
pub use session::*;
pub use watcher::*;
