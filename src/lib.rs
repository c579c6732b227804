//! # fwistats
//!
//! A Rust library reducing daily Fire Weather Index (FWI) System grids of a
//! climate model ensemble to summary climatological statistics.
//!
//! ## Stages
//!
//! - **Seasonal mean**: annual May to September means of each daily FWI
//!   component, per realization ([`seasonal`])
//! - **Fire season length**: annual count of fire season days, per
//!   realization, masked to the domain ([`fire_season`])
//! - **Ensemble statistics**: 10th/50th/90th percentiles and mean across all
//!   realizations of 30-year climatologies, as absolute values, differences
//!   and percent differences from 1971-2000 ([`ensemble`])
//!
//! Every stage reads files written by an earlier step and overwrites its own
//! outputs, so a failed run is simply repeated.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fwistats::{StageRequest, run_stage};
//! use fwistats::catalog::FsCatalog;
//! use fwistats::config::{ForcingDataset, PipelineConfig, StageContext};
//!
//! let config = PipelineConfig::from_file("paths.yaml")?;
//! let ctx = StageContext::new(config, ForcingDataset::S14fd, "fwistats fire-season-length S14FD");
//! let written = run_stage(&ctx, &FsCatalog, &StageRequest::FireSeasonLength)?;
//! println!("{} files written", written.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod fire_season;
pub mod grid;
pub mod log;
pub mod mask;
pub mod metadata;
pub mod netcdf_io;
pub mod reduce;
pub mod seasonal;
pub mod stats;
pub mod time;
pub mod warming;


use crate::catalog::FileCatalog;
use crate::config::{Metric, Scenario, StageContext};
use crate::error::StatsResult;
use std::path::PathBuf;

/// Stage selected for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    SeasonalMean { ens_group: u8 },
    FireSeasonLength,
    EnsembleStats { scenario: Scenario, metrics: Vec<Metric> },
}

/// Runs one stage and returns the paths it wrote.
///
/// # Errors
///
/// Returns the first failure of the stage: a missing input variable, a wrong
/// ensemble size, inconsistent members or any read/write error. Files written
/// before the failure are left in place.
pub fn run_stage(ctx: &StageContext, catalog: &dyn FileCatalog, request: &StageRequest) -> StatsResult<Vec<PathBuf>> {
    match request {
        StageRequest::SeasonalMean { ens_group } => seasonal::run(ctx, catalog, *ens_group),
        StageRequest::FireSeasonLength => fire_season::run(ctx, catalog),
        StageRequest::EnsembleStats { scenario, metrics } => ensemble::run(ctx, catalog, *scenario, metrics),
    }
}
