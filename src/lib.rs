//! Stop Shooting - a timed cease-fire drill
//!
//! Core modules:
//! - `drill`: Round state machine, hit accounting, requirement edits
//! - `timer`: Cancellable one-shot delayed callbacks
//! - `platform`: Host services the drill consumes (layout, display, shot detection)
//! - `audio`: Audible cues
//! - `settings`: Data-driven drill tuning

pub mod audio;
pub mod drill;
pub mod error;
pub mod platform;
pub mod settings;
pub mod timer;

pub use drill::{EditResult, HitOutcome, RoundController, RoundState, TargetFlag, TargetId};
pub use error::{DrillError, DrillResult};
pub use platform::Collaborators;
pub use settings::DrillSettings;
