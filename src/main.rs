//! Stop Shooting console host
//!
//! Wires the drill to a text console: targets are numbered, hits and
//! operator actions are typed on stdin.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use stop_shooting::audio::LogSignalPlayer;
use stop_shooting::platform::{
    Collaborators, DisplayFeedback, LayoutProvider, ShotDetectionControl, VisualFlagSink,
};
use stop_shooting::settings::{Color, FontSpec};
use stop_shooting::timer::ThreadTimer;
use stop_shooting::{DrillSettings, EditResult, RoundController, TargetFlag, TargetId};

/// Lays targets out in one centered row, seven if they fit, otherwise four
struct RowLayout {
    arena_width: f64,
    arena_height: f64,
    target_width: f64,
    target_height: f64,
    gap: f64,
    next_id: AtomicU32,
}

impl RowLayout {
    fn row_count(&self, requested: usize) -> usize {
        let wide = 7.0 * self.target_width + 6.0 * self.gap;
        let fit = if wide > self.arena_width { 4 } else { 7 };
        fit.min(requested)
    }
}

impl LayoutProvider for RowLayout {
    fn place_targets(&self, count: usize) -> Vec<TargetId> {
        let count = self.row_count(count);
        let row_width = count as f64 * self.target_width + (count as f64 - 1.0) * self.gap;
        let x0 = (self.arena_width - row_width) / 2.0;
        let y = self.arena_height / 2.0 - self.target_height / 2.0;

        (0..count)
            .map(|i| {
                let id = TargetId(self.next_id.fetch_add(1, Ordering::SeqCst));
                let x = x0 + i as f64 * (self.target_width + self.gap);
                log::info!("Placed target {} at ({:.0}, {:.0})", id, x, y);
                id
            })
            .collect()
    }

    fn remove_targets(&self, ids: &[TargetId]) {
        for id in ids {
            log::info!("Removed target {}", id);
        }
    }
}

/// Console stand-in for the camera feed and arena
#[derive(Default)]
struct Console {
    paused: AtomicBool,
}

impl ShotDetectionControl for Console {
    fn pause(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        if paused {
            println!("-- shot detection paused, wait for the beep --");
        } else {
            println!("** BEEP ** go!");
        }
    }
}

impl DisplayFeedback for Console {
    fn show_text(&self, text: &str, x: f64, y: f64, fg: Color, bg: Color, font: &FontSpec) {
        log::debug!(
            "Overlay at ({}, {}) fg {:?} bg {:?} size {}",
            x,
            y,
            fg,
            bg,
            font.size
        );
        println!("== {} ==", text);
    }
}

impl VisualFlagSink for Console {
    fn set_target_flag(&self, id: TargetId, flag: TargetFlag) {
        let color = match flag {
            TargetFlag::Unmarked | TargetFlag::UnderRequirement => Color::SADDLE_BROWN,
            TargetFlag::Satisfied => Color::DARK_RED,
        };
        log::debug!("Target {} -> {:?} {:?}", id, flag, color);
        if flag == TargetFlag::Satisfied {
            println!("target {} is red, stop shooting it", id.0);
        }
    }
}

fn print_targets(controller: &RoundController) {
    let row: Vec<String> = controller
        .target_ids()
        .into_iter()
        .map(|id| {
            format!(
                "{}: {}/{}",
                id.0,
                controller.current_hits(id).unwrap_or(0),
                controller.required_hits(id).unwrap_or(0)
            )
        })
        .collect();
    println!("[{}] {}", controller.state().as_str(), row.join("  "));
}

fn parse_id(token: Option<&str>) -> Option<TargetId> {
    token.and_then(|t| t.parse().ok()).map(TargetId)
}

fn main() {
    env_logger::init();
    log::info!("Stop Shooting starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => DrillSettings::load(Path::new(&path)),
        None => DrillSettings::default(),
    };

    let console = Arc::new(Console::default());
    let host = Collaborators {
        layout: Arc::new(RowLayout {
            arena_width: 640.0,
            arena_height: 480.0,
            target_width: 80.0,
            target_height: 120.0,
            gap: 10.0,
            next_id: AtomicU32::new(1),
        }),
        shot_detection: console.clone(),
        timer: Arc::new(ThreadTimer::new()),
        signal: Arc::new(LogSignalPlayer),
        display: console.clone(),
        flags: console.clone(),
    };

    let controller = match RoundController::new(settings, host) {
        Ok(controller) => controller,
        Err(e) => {
            log::error!("Cannot start drill: {}", e);
            std::process::exit(1);
        }
    };

    println!("commands: <id> hit | r reset | e <id> <old> <new> edit | x <id> remove | n new round | q quit");
    controller.initialize_round();
    print_targets(&controller);

    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            None => {}
            Some("q") => break,
            Some("r") => controller.manual_reset(),
            Some("n") => controller.initialize_round(),
            Some("x") => match parse_id(tokens.next()) {
                Some(id) => controller.on_target_removed(id),
                None => println!("usage: x <id>"),
            },
            Some("e") => {
                let id = parse_id(tokens.next());
                let old = tokens.next().unwrap_or("");
                let new = tokens.next().unwrap_or("");
                match id {
                    Some(id) => {
                        if let EditResult::Rejected { revert_to } =
                            controller.propose_edit(id, old, new)
                        {
                            println!("rejected, field reverts to {:?}", revert_to);
                        }
                    }
                    None => println!("usage: e <id> <old> <new>"),
                }
            }
            Some(token) => match parse_id(Some(token)) {
                Some(id) => {
                    if console.paused.load(Ordering::SeqCst) {
                        println!("shot ignored, wait for the beep");
                    } else if let Some(outcome) = controller.on_hit(id) {
                        println!("{:?}", outcome);
                    }
                }
                None => println!("unknown command {:?}", token),
            },
        }
        print_targets(&controller);
    }

    controller.teardown();
    log::info!("Stop Shooting exiting");
}
