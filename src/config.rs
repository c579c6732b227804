//! # Pipeline Configuration
//!
//! This module provides configuration parsing and validation for fwistats runs.
//! A configuration file (JSON or YAML) names the data roots shared by all three
//! stages; the command line selects the forcing dataset and the stage inputs.
//!
//! ## Configuration Structure
//!
//! - **output_data**: root of the daily FWI grids and of every summary product
//! - **input_data**: root holding the static domain mask
//! - **working_data**: root holding the warming-level lookup table
//!
//! ## Example Usage
//!
//! ```rust
//! use fwistats::config::PipelineConfig;
//!
//! let yaml = r#"
//! output_data: /data/fwi/output
//! input_data: /data/fwi/input
//! working_data: /data/fwi/working
//! "#;
//! let config = PipelineConfig::from_yaml(yaml)?;
//! assert_eq!(config.ensemble_size, 50);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{StatsError, StatsResult};
use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Upstream bias-adjustment forcing of the daily FWI dataset
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcingDataset {
    #[value(name = "EWEMBI")]
    #[serde(rename = "EWEMBI")]
    Ewembi,
    #[value(name = "S14FD")]
    #[serde(rename = "S14FD")]
    S14fd,
}

impl ForcingDataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForcingDataset::Ewembi => "EWEMBI",
            ForcingDataset::S14fd => "S14FD",
        }
    }

    /// Dataset version string used in directory and file names
    pub fn version(&self) -> String {
        format!("CanLEAD-FWI-{}-v1", self.as_str())
    }
}

impl fmt::Display for ForcingDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emission scenario families handled by the ensemble aggregator
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    #[value(name = "RCP85")]
    #[serde(rename = "RCP85")]
    Rcp85,
    #[value(name = "constructed_RCP26")]
    #[serde(rename = "constructed_RCP26")]
    ConstructedRcp26,
    #[value(name = "constructed_RCP45")]
    #[serde(rename = "constructed_RCP45")]
    ConstructedRcp45,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Rcp85 => "RCP85",
            Scenario::ConstructedRcp26 => "constructed_RCP26",
            Scenario::ConstructedRcp45 => "constructed_RCP45",
        }
    }

    /// Value of the `rcp` global attribute
    pub fn label(&self) -> &'static str {
        match self {
            Scenario::Rcp85 => "RCP8.5",
            Scenario::ConstructedRcp26 => "Constructed RCP2.6",
            Scenario::ConstructedRcp45 => "Constructed RCP4.5",
        }
    }

    /// Constructed scenarios carry per-member warming levels in their files;
    /// the fixed scenario reads them from the lookup table.
    pub fn is_constructed(&self) -> bool {
        !matches!(self, Scenario::Rcp85)
    }

    /// Column of the warming-level table holding this scenario
    pub fn table_column(&self) -> &'static str {
        match self {
            Scenario::Rcp85 => "RCP8.5",
            Scenario::ConstructedRcp26 => "RCP2.6",
            Scenario::ConstructedRcp45 => "RCP4.5",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Climatological metrics summarised by the ensemble aggregator
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[value(name = "fire_season_length")]
    #[serde(rename = "fire_season_length")]
    FireSeasonLength,
    #[value(name = "MJJAS_quantile_fillna")]
    #[serde(rename = "MJJAS_quantile_fillna")]
    MjjasQuantileFillna,
    #[value(name = "exceedances_high")]
    #[serde(rename = "exceedances_high")]
    ExceedancesHigh,
    #[value(name = "exceedances_extreme")]
    #[serde(rename = "exceedances_extreme")]
    ExceedancesExtreme,
    #[value(name = "exceedances_moderate")]
    #[serde(rename = "exceedances_moderate")]
    ExceedancesModerate,
    #[value(name = "MJJAS_mean_fillna")]
    #[serde(rename = "MJJAS_mean_fillna")]
    MjjasMeanFillna,
    #[value(name = "annual_exceedances_1971_2000_MJJAS_95th_quantile_fillna")]
    #[serde(rename = "annual_exceedances_1971_2000_MJJAS_95th_quantile_fillna")]
    AnnualExceedancesMjjas95th,
}

impl Metric {
    /// All metrics, in processing order
    pub const ALL: [Metric; 7] = [
        Metric::FireSeasonLength,
        Metric::MjjasQuantileFillna,
        Metric::ExceedancesHigh,
        Metric::ExceedancesExtreme,
        Metric::ExceedancesModerate,
        Metric::MjjasMeanFillna,
        Metric::AnnualExceedancesMjjas95th,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::FireSeasonLength => "fire_season_length",
            Metric::MjjasQuantileFillna => "MJJAS_quantile_fillna",
            Metric::ExceedancesHigh => "exceedances_high",
            Metric::ExceedancesExtreme => "exceedances_extreme",
            Metric::ExceedancesModerate => "exceedances_moderate",
            Metric::MjjasMeanFillna => "MJJAS_mean_fillna",
            Metric::AnnualExceedancesMjjas95th => {
                "annual_exceedances_1971_2000_MJJAS_95th_quantile_fillna"
            }
        }
    }

    /// Metrics that count days, and therefore carry `days` units
    pub fn is_day_count(&self) -> bool {
        matches!(
            self,
            Metric::FireSeasonLength
                | Metric::ExceedancesHigh
                | Metric::ExceedancesExtreme
                | Metric::ExceedancesModerate
                | Metric::AnnualExceedancesMjjas95th
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration structure for fwistats runs.
///
/// Only the three data roots are required; everything else has a default
/// matching the production dataset layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the daily FWI grids and summary statistics
    pub output_data: PathBuf,
    /// Root holding the domain mask file
    pub input_data: PathBuf,
    /// Root holding `GWL/warming_levels_by_period_all_RCPs.csv`
    #[serde(default)]
    pub working_data: Option<PathBuf>,
    /// Domain mask file name, relative to `input_data`
    #[serde(default = "default_mask_file")]
    pub mask_file: String,
    /// Name of the mask variable inside the mask file
    #[serde(default = "default_mask_variable")]
    pub mask_variable: String,
    /// Mask value marking an included cell
    #[serde(default = "default_mask_include_value")]
    pub mask_include_value: f64,
    /// Exact number of ensemble members required by the aggregator
    #[serde(default = "default_ensemble_size")]
    pub ensemble_size: usize,
    /// Latitude rows read per slab from the daily grids
    #[serde(default = "default_lat_chunk")]
    pub lat_chunk: usize,
    /// Global attribute of a daily file holding its realization label
    #[serde(default = "default_realization_attribute")]
    pub realization_attribute: String,
    /// Repository URL stamped into the per-realization reductions
    #[serde(default = "default_git_repo")]
    pub git_repo: String,
    /// Repository URL stamped into the ensemble statistics
    #[serde(default = "default_ensemble_git_repo")]
    pub ensemble_git_repo: String,
    /// Revision stamped into every output; resolved with git when absent
    #[serde(default)]
    pub git_revision: Option<String>,
}

fn default_mask_file() -> String {
    "CanLEAD_FWI_final_mask.nc".to_string()
}

fn default_mask_variable() -> String {
    "CanLEAD_FWI_mask".to_string()
}

fn default_mask_include_value() -> f64 {
    100.0
}

fn default_ensemble_size() -> usize {
    50
}

fn default_lat_chunk() -> usize {
    10
}

fn default_realization_attribute() -> String {
    "realization".to_string()
}

fn default_git_repo() -> String {
    "https://github.com/ECCC-CCCS/CanLEAD-FWI-v1/".to_string()
}

fn default_ensemble_git_repo() -> String {
    "https://github.com/ECCC-CCCS/CanLEAD-FWI/".to_string()
}

impl PipelineConfig {
    /// Creates a configuration with default settings for the given roots
    pub fn new(output_data: impl Into<PathBuf>, input_data: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            output_data: output_data.into(),
            input_data: input_data.into(),
            working_data: None,
            mask_file: default_mask_file(),
            mask_variable: default_mask_variable(),
            mask_include_value: default_mask_include_value(),
            ensemble_size: default_ensemble_size(),
            lat_chunk: default_lat_chunk(),
            realization_attribute: default_realization_attribute(),
            git_repo: default_git_repo(),
            ensemble_git_repo: default_ensemble_git_repo(),
            git_revision: None,
        }
    }

    /// Loads a configuration file, choosing JSON or YAML by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> StatsResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => {
                return Err(StatsError::Config(format!(
                    "unsupported configuration format: {}",
                    path.display()
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json_str: &str) -> StatsResult<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> StatsResult<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    /// Rejects settings no run could succeed with
    pub fn validate(&self) -> StatsResult<()> {
        if self.ensemble_size == 0 {
            return Err(StatsError::Config("ensemble_size must be positive".to_string()));
        }
        if self.lat_chunk == 0 {
            return Err(StatsError::Config("lat_chunk must be positive".to_string()));
        }
        if self.mask_variable.trim().is_empty() || self.realization_attribute.trim().is_empty() {
            return Err(StatsError::Config(
                "mask_variable and realization_attribute cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mask_path(&self) -> PathBuf {
        self.input_data.join(&self.mask_file)
    }

    pub fn warming_level_table(&self) -> StatsResult<PathBuf> {
        self.working_data
            .as_ref()
            .map(|root| root.join("GWL").join("warming_levels_by_period_all_RCPs.csv"))
            .ok_or_else(|| StatsError::Config("working_data is required for the RCP85 warming-level table".to_string()))
    }

    /// Revision of the generating code, from the configuration or from git
    pub fn resolve_git_revision(&self) -> String {
        if let Some(rev) = &self.git_revision {
            return rev.clone();
        }
        match Command::new("git").args(["rev-parse", "HEAD"]).output() {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
            _ => {
                warn!("Could not resolve git revision, stamping 'unknown'");
                "unknown".to_string()
            }
        }
    }
}

/// Everything a stage needs for one invocation: configuration plus the
/// selection made on the command line.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub config: PipelineConfig,
    pub forcing: ForcingDataset,
    /// Invocation recorded in the `history` attribute
    pub invocation: String,
    pub git_revision: String,
    pub dry_run: bool,
}

impl StageContext {
    pub fn new(config: PipelineConfig, forcing: ForcingDataset, invocation: impl Into<String>) -> Self {
        let git_revision = config.resolve_git_revision();
        StageContext {
            config,
            forcing,
            invocation: invocation.into(),
            git_revision,
            dry_run: false,
        }
    }

    pub fn version(&self) -> String {
        self.forcing.version()
    }

    /// Directory of the daily per-realization grids
    pub fn daily_dir(&self) -> PathBuf {
        self.config.output_data.join(self.version())
    }

    /// `summary_stats/<scenario>` directory of this dataset version
    pub fn summary_dir(&self, scenario: &str) -> PathBuf {
        self.daily_dir().join("summary_stats").join(scenario)
    }

    pub fn seasonal_output(&self, realization: &str) -> PathBuf {
        let version = self.version();
        self.summary_dir("RCP85")
            .join("MJJAS_mean_fillna")
            .join(format!("{}_{}_MJJAS_mean_fillna.nc", realization, version))
    }

    pub fn fire_season_output(&self, realization: &str) -> PathBuf {
        let version = self.version();
        self.summary_dir("RCP85")
            .join("fire_season_length")
            .join(format!("{}_rcp85_{}_fire_season_length.nc", realization, version))
    }

    pub fn climatology_dir(&self, scenario: Scenario, metric: Metric) -> PathBuf {
        self.summary_dir(scenario.as_str()).join(metric.as_str())
    }

    pub fn ensemble_output_dir(&self, scenario: Scenario) -> PathBuf {
        self.summary_dir(scenario.as_str()).join("ensemble_percentiles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json_applies_defaults() {
        let json = r#"{ "output_data": "/out", "input_data": "/in" }"#;
        let config = PipelineConfig::from_json(json).unwrap();
        assert_eq!(config.ensemble_size, 50);
        assert_eq!(config.lat_chunk, 10);
        assert_eq!(config.mask_include_value, 100.0);
        assert_eq!(config.mask_path(), PathBuf::from("/in/CanLEAD_FWI_final_mask.nc"));
        assert!(config.warming_level_table().is_err());
        assert_eq!(config.git_repo, "https://github.com/ECCC-CCCS/CanLEAD-FWI-v1/");
        assert_eq!(config.ensemble_git_repo, "https://github.com/ECCC-CCCS/CanLEAD-FWI/");
    }

    #[test]
    fn test_config_from_yaml_overrides() {
        let yaml = "output_data: /out\ninput_data: /in\nworking_data: /work\nensemble_size: 5\ngit_revision: abc123\n\
                    ensemble_git_repo: https://example.org/fork/\n";
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.ensemble_size, 5);
        assert_eq!(config.ensemble_git_repo, "https://example.org/fork/");
        assert_eq!(config.git_repo, "https://github.com/ECCC-CCCS/CanLEAD-FWI-v1/");
        assert_eq!(config.resolve_git_revision(), "abc123");
        assert_eq!(
            config.warming_level_table().unwrap(),
            PathBuf::from("/work/GWL/warming_levels_by_period_all_RCPs.csv")
        );
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = PipelineConfig::new("/out", "/in");
        config.ensemble_size = 0;
        assert!(config.validate().is_err());
        config.ensemble_size = 50;
        config.lat_chunk = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_layout() {
        let mut config = PipelineConfig::new("/out", "/in");
        config.git_revision = Some("rev".to_string());
        let ctx = StageContext::new(config, ForcingDataset::S14fd, "fwistats seasonal-mean");
        assert_eq!(
            ctx.seasonal_output("r1_r1i1p1"),
            PathBuf::from(
                "/out/CanLEAD-FWI-S14FD-v1/summary_stats/RCP85/MJJAS_mean_fillna/r1_r1i1p1_CanLEAD-FWI-S14FD-v1_MJJAS_mean_fillna.nc"
            )
        );
        assert_eq!(
            ctx.fire_season_output("r2_r3i1p1"),
            PathBuf::from(
                "/out/CanLEAD-FWI-S14FD-v1/summary_stats/RCP85/fire_season_length/r2_r3i1p1_rcp85_CanLEAD-FWI-S14FD-v1_fire_season_length.nc"
            )
        );
        assert_eq!(
            ctx.ensemble_output_dir(Scenario::ConstructedRcp45),
            PathBuf::from("/out/CanLEAD-FWI-S14FD-v1/summary_stats/constructed_RCP45/ensemble_percentiles")
        );
    }

    #[test]
    fn test_metric_units_classification() {
        assert!(Metric::FireSeasonLength.is_day_count());
        assert!(Metric::ExceedancesModerate.is_day_count());
        assert!(!Metric::MjjasMeanFillna.is_day_count());
        assert!(!Metric::MjjasQuantileFillna.is_day_count());
        assert_eq!(Metric::ALL.len(), 7);
    }
}
