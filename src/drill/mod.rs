//! Round state machine and hit accounting
//!
//! Everything with real state lives here:
//! - Per-target required/current hit counters
//! - Validation of live requirement edits
//! - Round lifecycle, overshoot resets and the delayed start

pub mod accountant;
pub mod editor;
pub mod round;
pub mod state;

pub use accountant::HitAccountant;
pub use editor::{EditResult, PendingEdit, RequirementEditor, flag_for_change, parse_required};
pub use round::{RoundController, format_round_time};
pub use state::{HitOutcome, RoundState, TargetFlag, TargetId, TargetRecord};
