//! Audible cues
//!
//! Playback belongs to the host; the drill only names which cue to play.

use serde::{Deserialize, Serialize};

/// Sound cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Round start signal after the arming delay
    StartBeep,
}

impl SoundCue {
    /// Asset path understood by the host's sound player
    pub fn asset_path(&self) -> &'static str {
        match self {
            SoundCue::StartBeep => "sounds/beep.wav",
        }
    }
}

/// Fire-and-forget cue player
pub trait SignalPlayer: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// Player that only logs the cue
#[derive(Debug, Default)]
pub struct LogSignalPlayer;

impl SignalPlayer for LogSignalPlayer {
    fn play(&self, cue: SoundCue) {
        log::info!("Playing {:?} ({})", cue, cue.asset_path());
    }
}
