//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub swarm: SwarmConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("config.toml");
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No config.toml found, creating default config");
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            swarm: SwarmConfig::default(),
        }
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Simulation tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_tick_interval() -> u64 {
    1500
}

/// Population scaling and spawn placement settings.
///
/// Bounds and minimum spawn separation stay at their base values up to
/// `crowd_threshold` clients, then grow per extra client up to a cap.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwarmConfig {
    /// Coordinate magnitude clients may roam to at low population.
    #[serde(default = "default_base_bounds")]
    pub base_bounds: f32,
    /// Extra bounds per client beyond the crowd threshold.
    #[serde(default = "default_bounds_growth")]
    pub bounds_growth_per_client: f32,
    /// Cap on population-driven bounds growth.
    #[serde(default = "default_max_extra_bounds")]
    pub max_extra_bounds: f32,
    /// Minimum spawn separation at low population.
    #[serde(default = "default_base_min_distance")]
    pub base_min_distance: f32,
    /// Extra separation per client beyond the crowd threshold.
    #[serde(default = "default_min_distance_growth")]
    pub min_distance_growth_per_client: f32,
    /// Cap on the minimum spawn separation.
    #[serde(default = "default_max_min_distance")]
    pub max_min_distance: f32,
    /// Population at which bounds and separation start growing.
    #[serde(default = "default_crowd_threshold")]
    pub crowd_threshold: usize,
    /// Attempt budget for separation-respecting spawn placement.
    #[serde(default = "default_max_position_attempts")]
    pub max_position_attempts: u32,
    /// Magnitude cap for each random velocity component.
    #[serde(default = "default_max_drift")]
    pub max_drift: f32,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            base_bounds: default_base_bounds(),
            bounds_growth_per_client: default_bounds_growth(),
            max_extra_bounds: default_max_extra_bounds(),
            base_min_distance: default_base_min_distance(),
            min_distance_growth_per_client: default_min_distance_growth(),
            max_min_distance: default_max_min_distance(),
            crowd_threshold: default_crowd_threshold(),
            max_position_attempts: default_max_position_attempts(),
            max_drift: default_max_drift(),
        }
    }
}

fn default_base_bounds() -> f32 {
    14.0
}
fn default_bounds_growth() -> f32 {
    0.25
}
fn default_max_extra_bounds() -> f32 {
    20.0
}
fn default_base_min_distance() -> f32 {
    2.6
}
fn default_min_distance_growth() -> f32 {
    0.02
}
fn default_max_min_distance() -> f32 {
    4.2
}
fn default_crowd_threshold() -> usize {
    20
}
fn default_max_position_attempts() -> u32 {
    30
}
fn default_max_drift() -> f32 {
    0.02
}
