//! Drill state and core types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a placed target, handed out by the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hit bookkeeping for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub target_id: TargetId,
    /// Live-editable threshold
    pub required_hits: u32,
    /// Hits landed since the last reset
    pub current_hits: u32,
}

impl TargetRecord {
    pub fn new(target_id: TargetId, required_hits: u32) -> Self {
        Self {
            target_id,
            required_hits,
            current_hits: 0,
        }
    }

    /// Returns true once the target has exactly its required hits
    pub fn is_satisfied(&self) -> bool {
        self.current_hits == self.required_hits
    }
}

/// Result of applying a single hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitOutcome {
    /// Still short of the requirement
    Progress,
    /// This hit reached the requirement exactly
    TargetJustCompleted,
    /// This hit went past the requirement
    Overshoot,
}

/// Recoloring request sent to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetFlag {
    /// Default look, progress cleared
    #[default]
    Unmarked,
    /// Requirement raised above what the shooter has landed (brown)
    UnderRequirement,
    /// Requirement met, stop shooting this one (red)
    Satisfied,
}

/// Current phase of the round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundState {
    /// No targets yet
    #[default]
    Idle,
    /// Shot detection paused, waiting for the start beep
    ArmingDelay,
    /// Timer running, hits count
    Running,
    /// All targets satisfied; transient before re-arming
    Complete,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::Idle => "Idle",
            RoundState::ArmingDelay => "ArmingDelay",
            RoundState::Running => "Running",
            RoundState::Complete => "Complete",
        }
    }
}
