//! Node configuration – reads `~/.r2h/config.toml` (or `--config <path>`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use r2h_filter::SimFilterConfig;
use r2h_runtime::{LogSettings, NodeConfig};
use serde::{Deserialize, Serialize};

/// Settings of the simulated filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    #[serde(default = "default_warmup_ticks")]
    pub warmup_ticks: u64,
    #[serde(default = "default_standoff_m")]
    pub standoff_m: f64,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    #[serde(default = "default_angular_speed")]
    pub angular_speed_rad_s: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            warmup_ticks: default_warmup_ticks(),
            standoff_m: default_standoff_m(),
            radius_m: default_radius_m(),
            angular_speed_rad_s: default_angular_speed(),
        }
    }
}

impl SimSettings {
    pub fn filter_config(&self) -> SimFilterConfig {
        SimFilterConfig {
            warmup_ticks: self.warmup_ticks,
            standoff_m: self.standoff_m,
            radius_m: self.radius_m,
            angular_speed_rad_s: self.angular_speed_rad_s,
            ..SimFilterConfig::default()
        }
    }
}

/// Persisted node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_node_name")]
    pub node_name: String,

    #[serde(default)]
    pub namespace: String,

    /// Tick frequency (Hz).
    #[serde(default = "default_publish_rate")]
    pub publish_rate: f64,

    /// Frame attached to the published leader position.
    #[serde(default = "default_base_footprint_frame_id")]
    pub base_footprint_frame_id: String,

    /// Forwarding period of the diagnostics channel (seconds).
    #[serde(default = "default_diagnostic_period_s")]
    pub diagnostic_period_s: f64,

    #[serde(default)]
    pub debug: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<PathBuf>,

    #[serde(default)]
    pub sim: SimSettings,
}

fn default_node_name() -> String {
    "robot_to_human_localisation".to_string()
}
fn default_publish_rate() -> f64 {
    10.0
}
fn default_base_footprint_frame_id() -> String {
    "base_link".to_string()
}
fn default_diagnostic_period_s() -> f64 {
    1.0
}
fn default_warmup_ticks() -> u64 {
    10
}
fn default_standoff_m() -> f64 {
    3.0
}
fn default_radius_m() -> f64 {
    1.0
}
fn default_angular_speed() -> f64 {
    0.2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            namespace: String::new(),
            publish_rate: default_publish_rate(),
            base_footprint_frame_id: default_base_footprint_frame_id(),
            diagnostic_period_s: default_diagnostic_period_s(),
            debug: false,
            log_directory: None,
            sim: SimSettings::default(),
        }
    }
}

impl Config {
    /// Translate into the runtime's [`NodeConfig`].
    ///
    /// Rate validation is left to the node; only the diagnostic period is
    /// checked here because it needs converting.
    pub fn node_config(&self) -> Result<NodeConfig, String> {
        let diagnostic_period = Duration::try_from_secs_f64(self.diagnostic_period_s)
            .map_err(|e| format!("Invalid diagnostic_period_s {}: {}", self.diagnostic_period_s, e))?;
        Ok(NodeConfig {
            node_name: self.node_name.clone(),
            namespace: self.namespace.clone(),
            publish_rate: self.publish_rate,
            base_footprint_frame_id: self.base_footprint_frame_id.clone(),
            diagnostic_period,
            debug: self.debug,
            log_directory: self.log_directory.clone(),
            ..NodeConfig::default()
        })
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            debug: self.debug,
            log_directory: self.log_directory.clone(),
        }
    }
}

/// Return the path to `~/.r2h/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".r2h").join("config.toml")
}

/// Load the config from `path`, falling back to defaults when the file does
/// not exist.  Environment overrides are applied in both cases.
pub fn load_or_default(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `R2H_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `R2H_PUBLISH_RATE` | `publish_rate` |
/// | `R2H_BASE_FOOTPRINT_FRAME_ID` | `base_footprint_frame_id` |
/// | `R2H_DEBUG` | `debug` (`1`/`true`) |
/// | `R2H_LOG_DIRECTORY` | `log_directory` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("R2H_PUBLISH_RATE")
        && let Ok(rate) = v.parse::<f64>()
    {
        cfg.publish_rate = rate;
    }
    if let Ok(v) = std::env::var("R2H_BASE_FOOTPRINT_FRAME_ID") {
        cfg.base_footprint_frame_id = v;
    }
    if let Ok(v) = std::env::var("R2H_DEBUG") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => cfg.debug = true,
            "0" | "false" | "no" => cfg.debug = false,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("R2H_LOG_DIRECTORY")
        && !v.trim().is_empty()
    {
        cfg.log_directory = Some(PathBuf::from(v));
    }
}
