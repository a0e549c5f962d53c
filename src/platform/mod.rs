//! Host abstraction layer
//!
//! Everything the drill needs from the hosting application:
//! - Target placement and removal
//! - Pausing shot detection
//! - Delayed callbacks
//! - Sound, text overlay and target recoloring
//!
//! The controller calls these while holding its round lock, so no
//! implementation may call back into the controller synchronously.

use std::sync::Arc;

use crate::audio::SignalPlayer;
use crate::drill::{TargetFlag, TargetId};
use crate::settings::{Color, FontSpec};
use crate::timer::TimerScheduler;

/// Places targets on the display surface
pub trait LayoutProvider: Send + Sync {
    /// Place up to `count` targets, returning the ids of those that fit
    fn place_targets(&self, count: usize) -> Vec<TargetId>;

    /// Take previously placed targets off the display
    fn remove_targets(&self, ids: &[TargetId]);
}

/// Gate on hit delivery
pub trait ShotDetectionControl: Send + Sync {
    fn pause(&self, paused: bool);
}

/// Text overlay on the camera feed / arena
pub trait DisplayFeedback: Send + Sync {
    fn show_text(
        &self,
        text: &str,
        x: f64,
        y: f64,
        foreground: Color,
        background: Color,
        font: &FontSpec,
    );
}

/// Recolors a target
pub trait VisualFlagSink: Send + Sync {
    fn set_target_flag(&self, id: TargetId, flag: TargetFlag);
}

/// The full set of host services handed to the controller
#[derive(Clone)]
pub struct Collaborators {
    pub layout: Arc<dyn LayoutProvider>,
    pub shot_detection: Arc<dyn ShotDetectionControl>,
    pub timer: Arc<dyn TimerScheduler>,
    pub signal: Arc<dyn SignalPlayer>,
    pub display: Arc<dyn DisplayFeedback>,
    pub flags: Arc<dyn VisualFlagSink>,
}
