//! # CLI Module
//!
//! This module provides the command-line interface for fwistats, including:
//! - Argument parsing with clap
//! - Configuration file loading (JSON/YAML)
//! - Environment variable support with the FWISTATS_ prefix
//! - Merging of flags, environment and configuration file into one
//!   [`PipelineConfig`]

use crate::config::{ForcingDataset, Metric, PipelineConfig, Scenario};
use crate::error::{StatsError, StatsResult};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Summary climatological statistics for ensemble fire weather projections
#[derive(Parser, Debug)]
#[command(name = "fwistats")]
#[command(about = "Reduce daily fire weather index grids to seasonal, annual and ensemble statistics")]
#[command(version)]
#[command(long_about = "
fwistats reduces bias-adjusted daily Fire Weather Index (FWI) System grids in
three independent stages:

  seasonal-mean        annual May to September means of every FWI component
  fire-season-length   annual count of fire season days
  ensemble-stats       percentiles and mean across the 50-member ensemble of
                       30-year climatologies, as absolute values and as
                       differences from 1971-2000

Data roots come from a configuration file, FWISTATS_* environment variables or
flags, in increasing order of priority.

EXAMPLES:
  # Seasonal means of ensemble group 3
  fwistats --config paths.yaml seasonal-mean S14FD 3

  # Fire season length of every realization
  fwistats --output-data /data/out --input-data /data/in fire-season-length EWEMBI

  # Ensemble statistics of two metrics
  fwistats -c paths.yaml ensemble-stats S14FD constructed_RCP45 \\
    --metric fire_season_length --metric MJJAS_mean_fillna

  # Check inputs without writing
  fwistats -c paths.yaml --dry-run ensemble-stats EWEMBI RCP85
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "FWISTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the daily grids and summary statistics
    #[arg(long, global = true, env = "FWISTATS_OUTPUT_DATA")]
    pub output_data: Option<PathBuf>,

    /// Root holding the domain mask
    #[arg(long, global = true, env = "FWISTATS_INPUT_DATA")]
    pub input_data: Option<PathBuf>,

    /// Root holding the warming-level table
    #[arg(long, global = true, env = "FWISTATS_WORKING_DATA")]
    pub working_data: Option<PathBuf>,

    /// Discover and report inputs without writing anything
    #[arg(long, global = true, env = "FWISTATS_DRY_RUN")]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Annual May to September means of the daily FWI components
    #[command(long_about = "
Reduce every daily file of one ensemble group (r{GROUP}_*.nc) to annual
May to September means. Missing days inside the window count as zero.

EXAMPLES:
  fwistats -c paths.yaml seasonal-mean S14FD 1
")]
    SeasonalMean {
        /// Bias-adjustment forcing of the daily dataset
        #[arg(value_enum)]
        forcing: ForcingDataset,

        /// Ensemble group, 1 to 5
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        ens_group: u8,
    },

    /// Annual fire season length of every realization
    #[command(long_about = "
Count the days of the annual fire season of every daily file, masked to the
Canadian domain.

EXAMPLES:
  fwistats -c paths.yaml fire-season-length EWEMBI
")]
    FireSeasonLength {
        /// Bias-adjustment forcing of the daily dataset
        #[arg(value_enum)]
        forcing: ForcingDataset,
    },

    /// Ensemble percentiles of 30-year climatologies
    #[command(long_about = "
Merge the 30-year climatologies of all ensemble members and write, for every
metric, the 10th/50th/90th percentiles and mean across realizations of the
absolute values, the differences from 1971-2000 and the percent differences
from 1971-2000.

EXAMPLES:
  # All seven metrics
  fwistats -c paths.yaml ensemble-stats S14FD RCP85

  # One metric
  fwistats -c paths.yaml ensemble-stats S14FD constructed_RCP26 --metric exceedances_high
")]
    EnsembleStats {
        /// Bias-adjustment forcing of the daily dataset
        #[arg(value_enum)]
        forcing: ForcingDataset,

        /// Emission scenario
        #[arg(value_enum)]
        scenario: Scenario,

        /// Metric to summarise (repeatable, default: all)
        #[arg(long = "metric", value_enum)]
        metrics: Vec<Metric>,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, elvish and PowerShell.

EXAMPLES:
  fwistats completions bash > ~/.bash_completion.d/fwistats
  fwistats completions zsh -o _fwistats
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Commands {
    /// Forcing dataset of a stage command; `None` for `completions`
    pub fn forcing(&self) -> Option<ForcingDataset> {
        match self {
            Commands::SeasonalMean { forcing, .. }
            | Commands::FireSeasonLength { forcing }
            | Commands::EnsembleStats { forcing, .. } => Some(*forcing),
            Commands::Completions { .. } => None,
        }
    }
}

/// Metrics requested on the command line, or all of them in processing order
pub fn selected_metrics(metrics: &[Metric]) -> Vec<Metric> {
    if metrics.is_empty() {
        Metric::ALL.to_vec()
    } else {
        metrics.to_vec()
    }
}

/// Builds the run configuration.
/// Priority: flags and environment (resolved by clap) > config file > defaults
pub fn resolve_config(cli: &Cli) -> StatsResult<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => {
            let (output, input) = match (&cli.output_data, &cli.input_data) {
                (Some(output), Some(input)) => (output.clone(), input.clone()),
                _ => {
                    return Err(StatsError::Config(
                        "output and input data roots are required: pass --config, or --output-data and --input-data \
                         (FWISTATS_OUTPUT_DATA, FWISTATS_INPUT_DATA)"
                            .to_string(),
                    ));
                }
            };
            PipelineConfig::new(output, input)
        }
    };

    if let Some(output) = &cli.output_data {
        config.output_data = output.clone();
    }
    if let Some(input) = &cli.input_data {
        config.input_data = input.clone();
    }
    if let Some(working) = &cli.working_data {
        config.working_data = Some(working.clone());
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paths.yaml");
        fs::write(&path, "output_data: /file/out\ninput_data: /file/in\nensemble_size: 10\n").unwrap();

        let cli = Cli::parse_from([
            "fwistats",
            "--config",
            path.to_str().unwrap(),
            "--output-data",
            "/flag/out",
            "fire-season-length",
            "S14FD",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.output_data, PathBuf::from("/flag/out"));
        assert_eq!(config.input_data, PathBuf::from("/file/in"));
        assert_eq!(config.ensemble_size, 10);
    }

    #[test]
    fn test_flags_alone_are_enough() {
        let cli = Cli::parse_from([
            "fwistats",
            "--output-data",
            "/out",
            "--input-data",
            "/in",
            "--working-data",
            "/work",
            "ensemble-stats",
            "EWEMBI",
            "RCP85",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.working_data, Some(PathBuf::from("/work")));
        assert_eq!(config.ensemble_size, 50);
    }

    #[test]
    fn test_selected_metrics_default_to_all() {
        assert_eq!(selected_metrics(&[]), Metric::ALL.to_vec());
        assert_eq!(
            selected_metrics(&[Metric::ExceedancesHigh]),
            vec![Metric::ExceedancesHigh]
        );
    }
}
