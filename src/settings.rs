//! Drill settings
//!
//! Persisted as JSON next to the host's configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DrillError, DrillResult};

/// Opaque RGB color passed through to the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const SADDLE_BROWN: Color = Color { r: 139, g: 69, b: 19 };
    pub const DARK_RED: Color = Color { r: 139, g: 0, b: 0 };
}

/// Font request for the completion overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSpec {
    /// Font family, `None` for the host's default
    pub family: Option<String>,
    pub size: f64,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: None,
            size: 40.0,
        }
    }
}

/// Placement and look of the elapsed-time overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub x: f64,
    pub y: f64,
    pub foreground: Color,
    pub background: Color,
    pub font: FontSpec,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            x: 25.0,
            y: 25.0,
            foreground: Color::BLACK,
            background: Color::RED,
            font: FontSpec::default(),
        }
    }
}

/// Drill tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillSettings {
    // === Requirements ===
    /// Smallest random required-hit count (inclusive)
    pub min_shots: u32,
    /// Largest random required-hit count (inclusive)
    pub max_shots: u32,
    /// Targets requested from the layout; it may place fewer
    pub max_targets: usize,

    // === Delayed start ===
    /// Shortest arming delay in seconds (inclusive)
    pub min_delay_secs: u32,
    /// Longest arming delay in seconds (inclusive)
    pub max_delay_secs: u32,

    /// Fixed RNG seed; random per run when unset
    pub seed: Option<u64>,

    pub overlay: OverlayStyle,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            min_shots: 1,
            max_shots: 6,
            max_targets: 7,

            min_delay_secs: 4,
            max_delay_secs: 8,

            seed: None,
            overlay: OverlayStyle::default(),
        }
    }
}

impl DrillSettings {
    /// Override the delayed-start interval (seconds, inclusive)
    pub fn with_delay_interval(mut self, min_secs: u32, max_secs: u32) -> Self {
        self.min_delay_secs = min_secs;
        self.max_delay_secs = max_secs;
        self
    }

    /// Override the random requirement range (inclusive)
    pub fn with_shot_range(mut self, min_shots: u32, max_shots: u32) -> Self {
        self.min_shots = min_shots;
        self.max_shots = max_shots;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_delay_secs.into())
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs.into())
    }

    pub fn validate(&self) -> DrillResult<()> {
        if self.min_shots > self.max_shots {
            return Err(DrillError::InvalidConfig(format!(
                "min_shots ({}) exceeds max_shots ({})",
                self.min_shots, self.max_shots
            )));
        }
        if self.min_delay_secs > self.max_delay_secs {
            return Err(DrillError::InvalidConfig(format!(
                "min_delay_secs ({}) exceeds max_delay_secs ({})",
                self.min_delay_secs, self.max_delay_secs
            )));
        }
        if self.max_targets == 0 {
            return Err(DrillError::InvalidConfig("max_targets must be at least 1".into()));
        }
        Ok(())
    }

    /// Parse and validate settings JSON
    pub fn from_json(json: &str) -> DrillResult<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| DrillError::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> DrillResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DrillError::InvalidConfig(e.to_string()))
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
            },
            Err(e) => log::warn!("Could not read {}: {}", path.display(), e),
        }

        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, path: &Path) -> DrillResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| DrillError::InvalidConfig(e.to_string()))?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
