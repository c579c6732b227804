//! # Error Types
//!
//! Every fallible operation in the library returns [`StatsResult`]. The variants
//! separate precondition violations (wrong ensemble size, missing variables),
//! which abort a run, from plain I/O or decoding failures.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reducing fire weather grids
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV table error: {0}")]
    Table(#[from] polars::error::PolarsError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("File pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Variable '{name}' not found in {}", path.display())]
    MissingVariable { path: PathBuf, name: String },

    #[error("Attribute '{name}' not found on '{owner}' in {}", path.display())]
    MissingAttribute {
        path: PathBuf,
        owner: String,
        name: String,
    },

    #[error("Number of files for metric '{metric}' does not equal {expected}: {found}")]
    EnsembleSize {
        metric: String,
        expected: usize,
        found: usize,
    },

    #[error("Ensemble member {} is inconsistent with the first member: {reason}", path.display())]
    InconsistentMembers { path: PathBuf, reason: String },

    #[error("Period '{0}' not found")]
    MissingPeriod(String),

    #[error("Time axis error: {0}")]
    TimeAxis(String),

    #[error("Warming level error: {0}")]
    WarmingLevel(String),

    #[error("Layout violation: {0}")]
    LayoutViolation(String),

    #[error("Unexpected dimensions for '{name}': expected {expected:?}, found {found:?}")]
    Dimensions {
        name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Result type for statistics operations
pub type StatsResult<T> = Result<T, StatsError>;
