//! # Fire-Season-Length Reducer
//!
//! Sums the daily binary `fire_season_mask` over each calendar year. Active
//! days are 1 and inactive days 0, so the annual sum is the fire season
//! length in days. Results are masked to the domain and stored as 16-bit
//! integers. Units are assigned later, by the ensemble aggregator.

use crate::catalog::FileCatalog;
use crate::config::StageContext;
use crate::error::StatsResult;
use crate::grid::{Attributes, GridDataset};
use crate::log::progress_bar;
use crate::mask::DomainMask;
use crate::metadata;
use crate::netcdf_io::{self, VariableEncoding};
use crate::reduce::{self, AnnualReduction};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

pub const SOURCE_VARIABLE: &str = "fire_season_mask";

pub const OUTPUT_VARIABLE: &str = "fire_season";

pub const FREQUENCY: &str = "year";

pub const DESCRIPTION: &str = "Number of days in the annual fire season (when there is measurable fire danger and \
fire weather calculations are turned on) based on temperature thresholds.";

/// Every daily file of the dataset version
pub const INPUT_PATTERN: &str = "*.nc";

/// Attributes of the `fire_season` variable, replacing the mask's
pub fn fire_season_attributes() -> Attributes {
    [
        ("short_name", OUTPUT_VARIABLE),
        ("long_name", "Fire Season Length"),
        ("cell_methods", "time: count within years"),
        ("description", DESCRIPTION),
    ]
    .into_iter()
    .collect()
}

/// Runs the reducer over every realization of the dataset version
pub fn run(ctx: &StageContext, catalog: &dyn FileCatalog) -> StatsResult<Vec<PathBuf>> {
    let dir = ctx.daily_dir();
    let files = catalog.find(&dir, INPUT_PATTERN)?;
    info!("Found {} daily files in {}", files.len(), dir.display());
    if files.is_empty() {
        warn!("Nothing to reduce in {}", dir.display());
        return Ok(Vec::new());
    }

    if ctx.dry_run {
        for path in &files {
            info!("[dry run] would count fire season days of {}", path.display());
        }
        return Ok(Vec::new());
    }

    let mask = DomainMask::load(
        &ctx.config.mask_path(),
        &ctx.config.mask_variable,
        ctx.config.mask_include_value,
    )?;

    let mut written = Vec::with_capacity(files.len());
    let pb = progress_bar(files.len() as u64, "fire season length");
    for path in &files {
        written.push(process_file(ctx, &mask, path)?);
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(written)
}

/// Counts the annual fire season days of one daily file
pub fn process_file(ctx: &StageContext, mask: &DomainMask, path: &Path) -> StatsResult<PathBuf> {
    let file = netcdf_io::open(path)?;
    netcdf_io::require_variable(&file, path, SOURCE_VARIABLE)?;

    let (label, mut ds) = reduce::reduce_daily_file(
        &file,
        path,
        &[SOURCE_VARIABLE.to_string()],
        AnnualReduction::AnnualSum,
        &ctx.config,
    )?;
    drop(file);

    annotate(ctx, &mut ds);
    mask.apply_all(&mut ds)?;

    let output = ctx.fire_season_output(&label);
    netcdf_io::write_dataset(&ds, &output, &VariableEncoding::FIRE_SEASON_LENGTH)?;
    info!("Wrote {}", output.display());

    drop(ds);
    debug!("Released fire season counts of {}", label);
    Ok(output)
}

/// Renames the summed mask and replaces its attributes
pub fn annotate(ctx: &StageContext, ds: &mut GridDataset) {
    for var in ds.data_vars.iter_mut().filter(|v| v.name == SOURCE_VARIABLE) {
        var.name = OUTPUT_VARIABLE.to_string();
        var.attrs = fire_season_attributes();
    }
    ds.attrs.set("frequency", FREQUENCY);
    metadata::stamp_provenance(&mut ds.attrs, ctx, &ctx.config.git_repo);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_season_attributes_have_no_units() {
        let attrs = fire_season_attributes();
        assert_eq!(attrs.len(), 4);
        assert!(!attrs.contains("units"));
        assert_eq!(attrs.text("cell_methods"), Some("time: count within years"));
        assert_eq!(attrs.text("short_name"), Some("fire_season"));
    }
}
