//! Timer configuration resource.
//!
//! Defaults applied by the [`TimerManager`](crate::resources::timermanager::TimerManager)
//! factories, loadable from an INI file. Missing keys keep their defaults.
//!
//! # Configuration File Format
//!
//! ```ini
//! [timers]
//! default_basis = scalable
//! frame_mode = ticks
//! ```

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::{info, warn};
use std::path::PathBuf;

use crate::components::policy::FrameMode;
use crate::resources::clock::TimeBasis;

const DEFAULT_CONFIG_PATH: &str = "./timers.ini";
const SECTION: &str = "timers";

/// Timer defaults.
///
/// Insert as a resource before [`init_timer_manager`] runs to have the
/// manager pick it up.
///
/// [`init_timer_manager`]: crate::systems::timer::init_timer_manager
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct TimerConfig {
    /// Basis used when a builder does not pick one.
    pub default_basis: TimeBasis,
    /// Frame counting used by frame delays unless overridden.
    pub frame_mode: FrameMode,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerConfig {
    pub fn new() -> Self {
        Self {
            default_basis: TimeBasis::default(),
            frame_mode: FrameMode::default(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a configuration that loads from and saves to `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Unknown values are logged and skipped. Returns an error if the file
    /// cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;
        self.apply(&config);

        info!(
            "Loaded timer config: default_basis={}, frame_mode={}",
            self.default_basis, self.frame_mode
        );
        Ok(())
    }

    /// Parse configuration from INI text instead of a file.
    pub fn load_from_str(&mut self, text: &str) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .read(text.to_string())
            .map_err(|e| format!("Failed to parse config: {}", e))?;
        self.apply(&config);
        Ok(())
    }

    fn apply(&mut self, config: &Ini) {
        if let Some(value) = config.get(SECTION, "default_basis") {
            match value.parse() {
                Ok(basis) => self.default_basis = basis,
                Err(e) => warn!("Ignoring default_basis: {}", e),
            }
        }
        if let Some(value) = config.get(SECTION, "frame_mode") {
            match value.parse() {
                Ok(mode) => self.frame_mode = mode,
                Err(e) => warn!("Ignoring frame_mode: {}", e),
            }
        }
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), String> {
        let mut config = Ini::new();
        config.set(
            SECTION,
            "default_basis",
            Some(self.default_basis.to_string()),
        );
        config.set(SECTION, "frame_mode", Some(self.frame_mode.to_string()));

        config
            .write(&self.config_path)
            .map_err(|e| format!("Failed to save config file: {}", e))?;

        info!("Saved timer config to {:?}", self.config_path);
        Ok(())
    }
}
