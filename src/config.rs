//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/posegraph/posegraph.toml`
//! 3. Local config: explicit `--config <file>`
//! 4. Environment variables: `POSEGRAPH_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::geo::{WGS84_EQUATORIAL_RADIUS, WGS84_POLAR_RADIUS};

/// Reference ellipsoid used for new scenes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    /// Equatorial radius in meters (default: WGS84)
    pub equatorial_radius: f64,
    /// Polar radius in meters (default: WGS84)
    pub polar_radius: f64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            equatorial_radius: WGS84_EQUATORIAL_RADIUS,
            polar_radius: WGS84_POLAR_RADIUS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Tick length in seconds passed to `update`
    pub delta_time: f64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self { delta_time: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    pub pretty: bool,
}

/// Raw frame config for intermediate parsing (`None` = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawFrameConfig {
    pub equatorial_radius: Option<f64>,
    pub polar_radius: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawUpdateConfig {
    pub delta_time: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub pretty: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub frame: RawFrameConfig,
    pub update: RawUpdateConfig,
    pub output: RawOutputConfig,
}

/// Unified configuration for posegraph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    pub frame: FrameConfig,
    pub update: UpdateConfig,
    pub output: OutputConfig,
}

/// Get the XDG config directory for posegraph.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "posegraph").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("posegraph.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            debug!("leaving {} unexpanded: {}", raw, e);
            path.to_path_buf()
        }
    }
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            frame: FrameConfig {
                equatorial_radius: overlay
                    .frame
                    .equatorial_radius
                    .unwrap_or(self.frame.equatorial_radius),
                polar_radius: overlay.frame.polar_radius.unwrap_or(self.frame.polar_radius),
            },
            update: UpdateConfig {
                delta_time: overlay.update.delta_time.unwrap_or(self.update.delta_time),
            },
            output: OutputConfig {
                pretty: overlay.output.pretty.unwrap_or(self.output.pretty),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file given on the command line
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults (WGS84, zero tick, compact output)
    /// 2. Global config: `$XDG_CONFIG_HOME/posegraph/posegraph.toml`
    /// 3. Local config: `local` (must exist when given)
    /// 4. Environment variables: `POSEGRAPH_*` prefix, `__` between sections
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let global = global_config_path().filter(|p| p.exists());
        Self::load_from(global.as_deref(), local)
    }

    /// [`Settings::load`] with an explicit global file (for tests).
    pub fn load_from(global: Option<&Path>, local: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global {
            debug!("loading global config {}", global_path.display());
            current = current.merge_with(&load_raw_settings(global_path)?);
        }

        // 3. Local config
        if let Some(local_path) = local {
            let local_path = expand_path(local_path);
            if !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            debug!("loading local config {}", local_path.display());
            current = current.merge_with(&load_raw_settings(&local_path)?);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.validate()?;
        Ok(current)
    }

    /// Apply POSEGRAPH_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("POSEGRAPH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_float("frame.equatorial_radius") {
            settings.frame.equatorial_radius = val;
        }
        if let Ok(val) = config.get_float("frame.polar_radius") {
            settings.frame.polar_radius = val;
        }
        if let Ok(val) = config.get_float("update.delta_time") {
            settings.update.delta_time = val;
        }
        if let Ok(val) = config.get_bool("output.pretty") {
            settings.output.pretty = val;
        }

        Ok(settings)
    }

    /// Radii must describe a real ellipsoid; the tick must not run backwards.
    fn validate(&self) -> Result<(), ApplicationError> {
        let FrameConfig {
            equatorial_radius,
            polar_radius,
        } = self.frame;
        if !(equatorial_radius > 0.0 && polar_radius > 0.0) {
            return Err(ApplicationError::Config {
                message: format!(
                    "frame radii must be positive (equatorial {}, polar {})",
                    equatorial_radius, polar_radius
                ),
            });
        }
        if self.update.delta_time < 0.0 {
            return Err(ApplicationError::Config {
                message: format!("update.delta_time must not be negative: {}", self.update.delta_time),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# posegraph configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/posegraph/posegraph.toml
#   Local:  posegraph --config <file>
#   Env:    POSEGRAPH_* environment variables, e.g. POSEGRAPH_FRAME__POLAR_RADIUS

[frame]
# Reference ellipsoid in meters (WGS84 by default)
# equatorial_radius = 6378137.0
# polar_radius = 6356752.314245

[update]
# Tick length in seconds handed to update listeners
# delta_time = 0.0

[output]
# Pretty-print JSON output
# pretty = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
