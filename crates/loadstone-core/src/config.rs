use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorCode};
use crate::load::LoadWeights;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LOADSTONE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub load: LoadWeights,
}

/// Overload detection and rebalancing thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityConfig {
    /// Members above this utilization are flagged.
    #[serde(default = "default_overload_threshold")]
    pub overload_threshold_percent: u32,
    /// Only members below this utilization receive reassigned work.
    #[serde(default = "default_low_water")]
    pub low_water_percent: u32,
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            overload_threshold_percent: default_overload_threshold(),
            low_water_percent: default_low_water(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Utilization at which a member counts as overloaded in load dashboards.
    #[serde(default = "default_overloaded_member")]
    pub overloaded_member_percent: u32,
    #[serde(default = "default_top_members")]
    pub top_members_limit: usize,
    #[serde(default = "default_estimation_ranking")]
    pub estimation_ranking_limit: usize,
    #[serde(default = "default_window_days")]
    pub upcoming_window_days: u32,
    #[serde(default = "default_window_days")]
    pub recent_window_days: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            overloaded_member_percent: default_overloaded_member(),
            top_members_limit: default_top_members(),
            estimation_ranking_limit: default_estimation_ranking(),
            upcoming_window_days: default_window_days(),
            recent_window_days: default_window_days(),
        }
    }
}

impl ProjectConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for out-of-range thresholds and
    /// [`Error::InvalidLoadWeights`] for an inconsistent `[load]` table.
    pub fn validate(&self) -> crate::error::Result<()> {
        let capacity = &self.capacity;
        if capacity.overload_threshold_percent == 0 {
            return Err(Error::InvalidConfig(
                "capacity.overload_threshold_percent must be positive".to_string(),
            ));
        }
        if capacity.low_water_percent > capacity.overload_threshold_percent {
            return Err(Error::InvalidConfig(format!(
                "capacity.low_water_percent ({}) exceeds overload_threshold_percent ({})",
                capacity.low_water_percent, capacity.overload_threshold_percent
            )));
        }
        if self.dashboard.overloaded_member_percent == 0 {
            return Err(Error::InvalidConfig(
                "dashboard.overloaded_member_percent must be positive".to_string(),
            ));
        }
        self.load.validate()
    }
}

/// Path of the project config under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".loadstone/config.toml")
}

/// Load `.loadstone/config.toml` under `project_root`, or the file named by
/// `LOADSTONE_CONFIG` when set. A missing project file yields defaults; a
/// missing explicit file is an error.
///
/// # Errors
///
/// Fails when the file cannot be read, does not parse, or fails validation.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    match env::var_os(CONFIG_ENV) {
        Some(explicit) => load_config_file(Path::new(&explicit)),
        None => {
            let path = project_config_path(project_root);
            if !path.exists() {
                return Ok(ProjectConfig::default());
            }
            load_config_file(&path)
        }
    }
}

/// Read, parse and validate one config file.
///
/// # Errors
///
/// Fails when the file cannot be read, does not parse, or fails validation.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to load {}", path.display()))
}

fn parse_config(content: &str) -> Result<ProjectConfig> {
    let code = ErrorCode::ConfigParseError;
    let config = toml::from_str::<ProjectConfig>(content)
        .with_context(|| format!("{code}: {}", code.message()))?;
    config.validate()?;
    Ok(config)
}

const fn default_overload_threshold() -> u32 {
    125
}

const fn default_low_water() -> u32 {
    100
}

const fn default_max_recommendations() -> usize {
    50
}

const fn default_overloaded_member() -> u32 {
    90
}

const fn default_top_members() -> usize {
    10
}

const fn default_estimation_ranking() -> usize {
    5
}

const fn default_window_days() -> u32 {
    14
}
