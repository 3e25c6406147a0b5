//! Arena settings with persistence
//!
//! Settings are read from the path given on the command line, or from
//! `~/.config/ember/settings.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use ember_combat::CombatConfig;
use ember_core::TimeConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Most frames or engine ticks a single run may take
pub const MAX_STEPS: f64 = 10_000_000.0;

/// Everything the headless arena needs to run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub arena: ArenaSettings,
    pub combat: CombatConfig,
    pub time: TimeConfig,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            arena: ArenaSettings::default(),
            combat: CombatConfig::default(),
            time: TimeConfig::default(),
        }
    }
}

impl SimSettings {
    /// `~/.config/ember/settings.toml`, when the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ember").join("settings.toml"))
    }

    /// Settings from `path` (or the default location). A missing, unreadable
    /// or invalid file leaves the arena on defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            warn!("No config directory on this platform; running with default arena settings");
            return Self::default();
        };
        if !path.exists() {
            info!("{} not found; running with default arena settings", path.display());
            return Self::default();
        }
        match Self::read(&path) {
            Ok(settings) => {
                info!("Arena settings read from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Ignoring {}: {:#}; running with default arena settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse and validate one settings file
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).context("unreadable")?;
        let settings: Self = toml::from_str(&content).context("not valid settings TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write these settings to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path().context("No config directory on this platform")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Cannot encode arena settings")?;
        fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))?;
        info!("Arena settings written to {}", path.display());
        Ok(())
    }

    /// Reject clocks that stall, or that need more than [`MAX_STEPS`] frames or ticks
    pub fn validate(&self) -> anyhow::Result<()> {
        let positive = [
            ("arena.frame_delta", self.arena.frame_delta),
            ("time.time_scale", self.time.time_scale),
            ("time.fixed_timestep", self.time.fixed_timestep),
            ("time.max_delta_time", self.time.max_delta_time),
        ];
        for (field, value) in positive {
            ensure!(value.is_finite() && value > 0.0, "{field} must be positive, got {value}");
        }
        let non_negative = [
            ("arena.duration", self.arena.duration),
            ("arena.spawn_radius", self.arena.spawn_radius),
        ];
        for (field, value) in non_negative {
            ensure!(value.is_finite() && value >= 0.0, "{field} must be non-negative, got {value}");
        }

        let duration = f64::from(self.arena.duration);
        let frames = duration / self.simulated_per_frame();
        ensure!(frames <= MAX_STEPS, "a {duration}s run would take {frames:.0} frames");
        let ticks = duration / f64::from(self.time.fixed_timestep);
        ensure!(ticks <= MAX_STEPS, "a {duration}s run would take {ticks:.0} ticks");
        Ok(())
    }

    /// Simulated seconds one frame advances the clock
    fn simulated_per_frame(&self) -> f64 {
        f64::from(self.arena.frame_delta.min(self.time.max_delta_time)) * f64::from(self.time.time_scale)
    }

    /// Frames the run takes at most; only meaningful on validated settings
    pub fn frame_limit(&self) -> u64 {
        (f64::from(self.arena.duration) / self.simulated_per_frame()).ceil() as u64 + 1
    }
}

/// What the arena spawns and how long it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Simulated seconds to run
    pub duration: f32,
    /// Real seconds per rendered frame fed to the clock
    pub frame_delta: f32,
    /// Monsters spawned around the hero
    pub monsters: usize,
    /// Distance from the hero to the monster ring
    pub spawn_radius: f32,
    /// Overrides `combat.seed` when set
    pub seed: Option<u64>,
    /// Skill catalog file; the built-in starter set when unset
    pub catalog: Option<PathBuf>,
    /// Where to write the JSON report; stdout when unset
    pub report: Option<PathBuf>,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            duration: 60.0,
            frame_delta: 1.0 / 30.0,
            monsters: 6,
            spawn_radius: 12.0,
            seed: None,
            catalog: None,
            report: None,
        }
    }
}
