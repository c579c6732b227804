//! # Seasonal Reducer
//!
//! Collapses each daily per-realization grid of one ensemble group to annual
//! May to September means. Days outside the window are discarded and missing
//! days inside it count as zero, so every year averages exactly the same
//! number of days.
//!
//! Input files must carry `time_bnds` and `fire_season_mask`; both are
//! dropped before reduction. Outputs are not masked to the domain.

use crate::catalog::FileCatalog;
use crate::config::StageContext;
use crate::error::{StatsError, StatsResult};
use crate::grid::GridDataset;
use crate::log::progress_bar;
use crate::metadata;
use crate::netcdf_io::{self, VariableEncoding};
use crate::reduce::{self, AnnualReduction};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// Variables required in a daily file and excluded from the seasonal mean
pub const PROVENANCE_VARIABLES: [&str; 2] = ["time_bnds", "fire_season_mask"];

pub const CELL_METHOD: &str = "time: mean over season (interval: 1 day)";

pub const FREQUENCY: &str = "annual fire season";

/// Daily files of one ensemble group: `r{group}_*.nc`
pub fn input_pattern(ens_group: u8) -> String {
    format!("r{}_*.nc", ens_group)
}

/// Runs the seasonal reducer over one ensemble group, returning the paths
/// written
pub fn run(ctx: &StageContext, catalog: &dyn FileCatalog, ens_group: u8) -> StatsResult<Vec<PathBuf>> {
    let dir = ctx.daily_dir();
    let files = catalog.find(&dir, &input_pattern(ens_group))?;
    info!(
        "Found {} daily files for ensemble group {} in {}",
        files.len(),
        ens_group,
        dir.display()
    );
    if files.is_empty() {
        warn!("Nothing to reduce for ensemble group {}", ens_group);
    }

    let mut written = Vec::with_capacity(files.len());
    let pb = progress_bar(files.len() as u64, "MJJAS mean");
    for path in &files {
        pb.set_message(file_name(path));
        if ctx.dry_run {
            info!("[dry run] would reduce {}", path.display());
        } else {
            written.push(process_file(ctx, path)?);
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(written)
}

/// Reduces one daily file and writes its annual seasonal means
pub fn process_file(ctx: &StageContext, path: &Path) -> StatsResult<PathBuf> {
    let file = netcdf_io::open(path)?;
    for name in PROVENANCE_VARIABLES {
        netcdf_io::require_variable(&file, path, name)?;
    }

    let variables: Vec<String> = reduce::daily_variables(&file)
        .into_iter()
        .filter(|name| !PROVENANCE_VARIABLES.contains(&name.as_str()))
        .collect();
    if variables.is_empty() {
        return Err(StatsError::MissingVariable {
            path: path.to_path_buf(),
            name: "any (time, lat, lon) index variable".to_string(),
        });
    }
    debug!("Seasonal mean of {:?}", variables);

    let (label, mut ds) =
        reduce::reduce_daily_file(&file, path, &variables, AnnualReduction::MJJAS_MEAN, &ctx.config)?;
    drop(file);

    annotate(ctx, &mut ds);

    let output = ctx.seasonal_output(&label);
    netcdf_io::write_dataset(&ds, &output, &VariableEncoding::SEASONAL_MEAN)?;
    info!("Wrote {}", output.display());

    drop(ds);
    debug!("Released seasonal means of {}", label);
    Ok(output)
}

/// Records the reduction in variable and dataset attributes
pub fn annotate(ctx: &StageContext, ds: &mut GridDataset) {
    for var in ds.data_vars.iter_mut() {
        var.attrs.append_text("cell_methods", CELL_METHOD);
        var.attrs.remove("ancillary_variables");
    }
    ds.attrs.set("frequency", FREQUENCY);
    metadata::stamp_provenance(&mut ds.attrs, ctx, &ctx.config.git_repo);
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glob::Pattern;

    #[test]
    fn test_group_pattern_does_not_match_other_groups() {
        let pattern = Pattern::new(&input_pattern(1)).unwrap();
        assert!(pattern.matches("r1_r1i1p1_CanLEAD-FWI-S14FD-v1.nc"));
        assert!(!pattern.matches("r2_r1i1p1_CanLEAD-FWI-S14FD-v1.nc"));
        assert!(!pattern.matches("r10_r1i1p1.nc"));
    }
}
