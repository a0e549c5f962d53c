//! Round lifecycle
//!
//! `Idle -> ArmingDelay -> Running -> Complete -> ArmingDelay -> ...`
//!
//! All public entry points and the delayed-start callback are serialized by a
//! single lock around the round state. Teardown flips an atomic flag before
//! taking that lock, and the start callback re-checks the flag once it holds
//! the lock, so a torn-down controller never acts on a late timer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::accountant::HitAccountant;
use super::editor::{EditResult, PendingEdit, RequirementEditor};
use super::state::{HitOutcome, RoundState, TargetFlag, TargetId};
use crate::audio::SoundCue;
use crate::error::DrillResult;
use crate::platform::Collaborators;
use crate::settings::DrillSettings;
use crate::timer::{CancelHandle, TimerCallback};

/// Format an elapsed round time for the overlay
pub fn format_round_time(elapsed: Duration) -> String {
    format!("{:.2} s", elapsed.as_secs_f64())
}

struct Round {
    state: RoundState,
    round_start_time: Option<Instant>,
    last_round_time: Option<Duration>,
    rounds_completed: u64,
    accountant: HitAccountant,
    editor: RequirementEditor,
    settings: DrillSettings,
    rng: Pcg32,
    /// Start signal of the current arming, if not yet fired
    pending_start: Option<CancelHandle>,
    /// Bumped on every arming so superseded callbacks can tell they are stale
    arming_generation: u64,
}

struct Shared {
    round: Mutex<Round>,
    destroyed: AtomicBool,
    host: Collaborators,
}

/// Drives the drill. Cheap to clone; clones share the same round.
#[derive(Clone)]
pub struct RoundController {
    shared: Arc<Shared>,
}

impl RoundController {
    pub fn new(settings: DrillSettings, host: Collaborators) -> DrillResult<Self> {
        settings.validate()?;
        let seed = settings.seed.unwrap_or_else(rand::random);
        log::info!("Drill controller created with seed: {}", seed);

        let round = Round {
            state: RoundState::Idle,
            round_start_time: None,
            last_round_time: None,
            rounds_completed: 0,
            accountant: HitAccountant::new(),
            editor: RequirementEditor::new(),
            settings,
            rng: Pcg32::seed_from_u64(seed),
            pending_start: None,
            arming_generation: 0,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                round: Mutex::new(round),
                destroyed: AtomicBool::new(false),
                host,
            }),
        })
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    // === Host entry points ===

    /// Place fresh targets, randomize their requirements and arm the round
    pub fn initialize_round(&self) {
        if self.is_torn_down() {
            log::warn!("initialize_round after teardown ignored");
            return;
        }
        let old_ids = {
            let mut round = self.shared.round.lock();
            Self::clear_round_locked(&mut round)
        };

        // Unlocked: the layout may report each removal back synchronously
        if !old_ids.is_empty() {
            self.shared.host.layout.remove_targets(&old_ids);
        }

        if self.is_torn_down() {
            return;
        }
        let mut round = self.shared.round.lock();
        self.populate_locked(&mut round);
    }

    /// Pause shot detection and schedule the randomized start signal
    pub fn arm_round(&self) {
        if self.is_torn_down() {
            return;
        }
        let mut round = self.shared.round.lock();
        if round.accountant.is_empty() {
            log::warn!("Cannot arm a round without targets");
            return;
        }
        self.arm_locked(&mut round);
    }

    /// Apply a hit from shot detection.
    ///
    /// Returns `None` when the hit was ignored (not running, unknown target).
    pub fn on_hit(&self, id: TargetId) -> Option<HitOutcome> {
        if self.is_torn_down() {
            return None;
        }
        let mut round = self.shared.round.lock();
        if round.state != RoundState::Running {
            log::debug!("Ignoring hit on {} while {}", id, round.state.as_str());
            return None;
        }

        let outcome = match round.accountant.record_hit(id) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Ignoring hit: {}", e);
                return None;
            }
        };

        match outcome {
            HitOutcome::Progress => {
                log::debug!(
                    "Hit on {} ({}/{})",
                    id,
                    round.accountant.current_hits(id).unwrap_or(0),
                    round.accountant.required_hits(id).unwrap_or(0)
                );
            }
            HitOutcome::TargetJustCompleted => {
                log::debug!("Target {} complete", id);
                self.shared
                    .host
                    .flags
                    .set_target_flag(id, TargetFlag::Satisfied);
            }
            HitOutcome::Overshoot => {
                // Same requirements, shooter starts over
                log::info!("Overshoot on {}, resetting round progress", id);
                self.reset_round_progress(&mut round);
            }
        }

        if round.accountant.is_round_complete() {
            self.complete_round(&mut round);
        }

        Some(outcome)
    }

    /// Operator reset: clear progress and restart the clock
    pub fn manual_reset(&self) {
        if self.is_torn_down() {
            return;
        }
        let mut round = self.shared.round.lock();
        self.reset_round_progress(&mut round);
        round.round_start_time = Some(Instant::now());
        log::info!("Round progress reset by operator");
    }

    /// A target was deleted outside the drill
    pub fn on_target_removed(&self, id: TargetId) {
        let mut round = self.shared.round.lock();
        if let Err(e) = round.accountant.unregister_target(id) {
            log::debug!("Ignoring removal: {}", e);
            return;
        }
        log::info!("Target {} removed, {} remaining", id, round.accountant.len());

        if self.is_torn_down() {
            return;
        }

        if round.accountant.is_empty() {
            drop(round);
            log::info!("All targets removed, starting fresh");
            self.initialize_round();
        } else if round.state == RoundState::Running && round.accountant.is_round_complete() {
            self.complete_round(&mut round);
        }
    }

    /// Text change on a target's required-hits field
    pub fn propose_edit(&self, id: TargetId, old_text: &str, new_text: &str) -> EditResult {
        if self.is_torn_down() {
            return EditResult::Rejected {
                revert_to: old_text.to_string(),
            };
        }
        let mut round = self.shared.round.lock();
        self.apply_edit(&mut round, id, old_text, new_text)
    }

    /// Stop for good. Any pending start signal becomes a no-op.
    pub fn teardown(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut round = self.shared.round.lock();
        if let Some(handle) = round.pending_start.take() {
            handle.cancel();
        }
        log::info!(
            "Drill torn down after {} completed rounds",
            round.rounds_completed
        );
    }

    // === Diagnostics ===

    pub fn state(&self) -> RoundState {
        self.shared.round.lock().state
    }

    pub fn round_start_time(&self) -> Option<Instant> {
        self.shared.round.lock().round_start_time
    }

    /// Elapsed time of the most recently completed round
    pub fn last_round_time(&self) -> Option<Duration> {
        self.shared.round.lock().last_round_time
    }

    pub fn rounds_completed(&self) -> u64 {
        self.shared.round.lock().rounds_completed
    }

    pub fn current_hits(&self, id: TargetId) -> Option<u32> {
        self.shared.round.lock().accountant.current_hits(id)
    }

    pub fn required_hits(&self, id: TargetId) -> Option<u32> {
        self.shared.round.lock().accountant.required_hits(id)
    }

    pub fn target_ids(&self) -> Vec<TargetId> {
        self.shared.round.lock().accountant.target_ids()
    }

    // === Internals (round lock held) ===

    /// Forget the current targets and go idle. Returns the ids to remove.
    fn clear_round_locked(round: &mut Round) -> Vec<TargetId> {
        if let Some(handle) = round.pending_start.take() {
            handle.cancel();
        }
        let old_ids = round.accountant.target_ids();
        round.accountant.clear();
        round.round_start_time = None;
        round.state = RoundState::Idle;
        old_ids
    }

    fn populate_locked(&self, round: &mut Round) {
        if !round.accountant.is_empty() {
            log::debug!("Round already re-initialized by another caller");
            return;
        }

        for id in self.shared.host.layout.place_targets(round.settings.max_targets) {
            if let Err(e) = round.accountant.register_target(id, 0) {
                log::warn!("Skipping placed target: {}", e);
            }
        }

        if round.accountant.is_empty() {
            log::warn!("Layout placed no targets, staying idle");
            round.state = RoundState::Idle;
            return;
        }

        log::info!("Round initialized with {} targets", round.accountant.len());
        self.assign_required_hits(round);
        self.arm_locked(round);
    }

    fn arm_locked(&self, round: &mut Round) {
        if let Some(handle) = round.pending_start.take() {
            handle.cancel();
        }
        self.shared.host.shot_detection.pause(true);

        let (min, max) = (
            round.settings.min_delay().as_secs(),
            round.settings.max_delay().as_secs(),
        );
        let delay = Duration::from_secs(round.rng.random_range(min..=max));

        round.arming_generation += 1;
        let generation = round.arming_generation;
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let callback: TimerCallback = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                RoundController { shared }.on_start_signal(generation);
            }
        });

        let handle = self
            .shared
            .host
            .timer
            .schedule(delay, callback);
        round.pending_start = Some(handle);
        round.state = RoundState::ArmingDelay;
        log::info!("Round armed, start signal in {}s", delay.as_secs());
    }

    fn on_start_signal(&self, generation: u64) {
        if self.is_torn_down() {
            log::debug!("Start signal after teardown ignored");
            return;
        }
        let mut round = self.shared.round.lock();
        // Teardown may have taken the lock first
        if self.is_torn_down() {
            return;
        }
        if round.arming_generation != generation || round.state != RoundState::ArmingDelay {
            log::debug!("Stale start signal (generation {}) ignored", generation);
            return;
        }

        round.pending_start = None;
        self.shared.host.signal.play(SoundCue::StartBeep);
        self.shared.host.shot_detection.pause(false);
        round.round_start_time = Some(Instant::now());
        round.state = RoundState::Running;
        log::info!("Round started");
    }

    fn complete_round(&self, round: &mut Round) {
        round.state = RoundState::Complete;
        let elapsed = round
            .round_start_time
            .map(|start| start.elapsed())
            .unwrap_or_default();
        round.last_round_time = Some(elapsed);
        round.rounds_completed += 1;

        let text = format_round_time(elapsed);
        log::info!("Round {} complete in {}", round.rounds_completed, text);
        let overlay = &round.settings.overlay;
        self.shared.host.display.show_text(
            &text,
            overlay.x,
            overlay.y,
            overlay.foreground,
            overlay.background,
            &overlay.font,
        );

        self.reset_round_progress(round);
        self.assign_required_hits(round);
        self.arm_locked(round);
    }

    fn reset_round_progress(&self, round: &mut Round) {
        round.accountant.reset_all();
        for id in round.accountant.target_ids() {
            self.shared
                .host
                .flags
                .set_target_flag(id, TargetFlag::Unmarked);
        }
    }

    /// Push a fresh random requirement to every target through the editor
    fn assign_required_hits(&self, round: &mut Round) {
        let (min, max) = (round.settings.min_shots, round.settings.max_shots);
        for id in round.accountant.target_ids() {
            let old_text = round.accountant.required_hits(id).unwrap_or(0).to_string();
            let new_text = round.rng.random_range(min..=max).to_string();
            self.apply_edit(round, id, &old_text, &new_text);
        }
    }

    fn apply_edit(&self, round: &mut Round, id: TargetId, old_text: &str, new_text: &str) -> EditResult {
        let edit = PendingEdit {
            target_id: id,
            old_text,
            new_text,
        };
        match round.editor.propose_edit(&mut round.accountant, edit) {
            Ok(result) => {
                if let EditResult::Applied {
                    flag: Some(flag), ..
                } = result
                {
                    self.shared.host.flags.set_target_flag(id, flag);
                }
                result
            }
            Err(e) => {
                log::warn!("Rejecting edit: {}", e);
                EditResult::Rejected {
                    revert_to: old_text.to_string(),
                }
            }
        }
    }
}
