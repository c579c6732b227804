//! # Annual Reductions
//!
//! Stages 1 and 2 both collapse a daily `(time, lat, lon)` grid to one value
//! per year. They differ only in which days are kept, how a year is reduced
//! and where the annual label sits, captured by [`AnnualReduction`].
//!
//! Daily variables are read in slabs of `lat_chunk` latitude rows; each slab
//! is reduced immediately and written into the annual result.

use crate::config::PipelineConfig;
use crate::error::{StatsError, StatsResult};
use crate::grid::{Attributes, CoordValues, Coordinate, GridDataset, GridVariable};
use crate::netcdf_io;
use crate::time::{CfDate, TimeAxis};
use log::debug;
use ndarray::{Array3, Axis, s};
use netcdf::{File, Variable};
use std::path::Path;

/// Dimension order every daily variable must have
pub const DAILY_DIMS: [&str; 3] = ["time", "lat", "lon"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnualReduction {
    /// Mean over months `first_month..=last_month`. Missing days count as zero
    /// so every year averages the same number of days.
    SeasonalMean { first_month: u32, last_month: u32 },
    /// Sum over the calendar year, skipping missing days
    AnnualSum,
}

impl AnnualReduction {
    /// May to September
    pub const MJJAS_MEAN: AnnualReduction = AnnualReduction::SeasonalMean {
        first_month: 5,
        last_month: 9,
    };

    pub fn selects(&self, date: &CfDate) -> bool {
        match self {
            AnnualReduction::SeasonalMean { first_month, last_month } => {
                (*first_month..=*last_month).contains(&date.month)
            }
            AnnualReduction::AnnualSum => true,
        }
    }

    /// Date labelling the reduced value of `year`
    pub fn label(&self, year: i32) -> CfDate {
        match self {
            AnnualReduction::SeasonalMean { first_month, .. } => CfDate::new(year, *first_month, 1),
            AnnualReduction::AnnualSum => CfDate::new(year, 1, 1),
        }
    }

    fn reduce(&self, values: impl Iterator<Item = f64>, count: usize) -> f64 {
        match self {
            AnnualReduction::SeasonalMean { .. } => {
                if count == 0 {
                    return f64::NAN;
                }
                values.map(|v| if v.is_nan() { 0.0 } else { v }).sum::<f64>() / count as f64
            }
            AnnualReduction::AnnualSum => values.filter(|v| !v.is_nan()).sum(),
        }
    }
}

/// Time indices grouped by year, for every year between the first and the
/// last selected day
#[derive(Debug, Clone, PartialEq)]
pub struct YearBins {
    pub years: Vec<i32>,
    pub days: Vec<Vec<usize>>,
}

impl YearBins {
    pub fn new(axis: &TimeAxis, reduction: AnnualReduction) -> StatsResult<Self> {
        let selected: Vec<(usize, i32)> = axis
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| reduction.selects(d))
            .map(|(i, d)| (i, d.year))
            .collect();

        let (first, last) = match (selected.iter().map(|(_, y)| *y).min(), selected.iter().map(|(_, y)| *y).max()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(StatsError::TimeAxis(format!(
                    "no days selected by {:?} in a {}-step time axis",
                    reduction,
                    axis.len()
                )));
            }
        };

        let years: Vec<i32> = (first..=last).collect();
        let mut days = vec![Vec::new(); years.len()];
        for (i, year) in selected {
            days[(year - first) as usize].push(i);
        }
        Ok(YearBins { years, days })
    }

    /// Number of years, never zero
    pub(crate) fn len(&self) -> usize {
        self.years.len()
    }
}

/// Reduces a `(time, lat, lon)` slab to `(year, lat, lon)`
pub fn reduce_slab(slab: &Array3<f64>, bins: &YearBins, reduction: AnnualReduction) -> Array3<f64> {
    let (_, nlat, nlon) = slab.dim();
    let mut out = Array3::from_elem((bins.len(), nlat, nlon), f64::NAN);
    for (y, days) in bins.days.iter().enumerate() {
        for i in 0..nlat {
            for j in 0..nlon {
                let values = days.iter().map(|&t| slab[[t, i, j]]);
                out[[y, i, j]] = reduction.reduce(values, days.len());
            }
        }
    }
    out
}

/// Reduces a daily variable slab by slab
pub fn reduce_variable(
    var: &Variable,
    bins: &YearBins,
    reduction: AnnualReduction,
    lat_chunk: usize,
) -> StatsResult<Array3<f64>> {
    let dims = netcdf_io::dimension_names(var);
    if dims != DAILY_DIMS {
        return Err(StatsError::Dimensions {
            name: var.name(),
            expected: DAILY_DIMS.iter().map(|d| d.to_string()).collect(),
            found: dims,
        });
    }
    let nlat = var.dimensions()[1].len();
    let nlon = var.dimensions()[2].len();
    let mut out = Array3::from_elem((bins.len(), nlat, nlon), f64::NAN);

    let mut start = 0;
    while start < nlat {
        let end = (start + lat_chunk).min(nlat);
        let slab = netcdf_io::read_lat_slab(var, start..end)?;
        out.slice_mut(s![.., start..end, ..]).assign(&reduce_slab(&slab, bins, reduction));
        start = end;
    }
    Ok(out)
}

/// Names of every variable laid out as `(time, lat, lon)`
pub fn daily_variables(file: &File) -> Vec<String> {
    file.variables()
        .filter(|v| netcdf_io::dimension_names(v) == DAILY_DIMS)
        .map(|v| v.name())
        .collect()
}

/// Reads the decoded time axis of a daily file
pub fn read_time_axis(file: &File, path: &Path) -> StatsResult<(TimeAxis, Attributes)> {
    let coord = netcdf_io::read_numeric_coordinate(file, path, "time")?;
    let units = coord.attrs.text("units").ok_or_else(|| StatsError::MissingAttribute {
        path: path.to_path_buf(),
        owner: "time".to_string(),
        name: "units".to_string(),
    })?;
    let values = match &coord.values {
        CoordValues::Numeric(v) => v.clone(),
        CoordValues::Text(_) => {
            return Err(StatsError::TimeAxis(format!("time in {} is not numeric", path.display())));
        }
    };
    let axis = TimeAxis::decode(units, coord.attrs.text("calendar"), &values)?;
    Ok((axis, coord.attrs))
}

/// Reads the realization label stored in a global attribute
pub fn read_realization_label(file: &File, path: &Path, attribute: &str) -> StatsResult<String> {
    netcdf_io::global_attributes(file)
        .text(attribute)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StatsError::MissingAttribute {
            path: path.to_path_buf(),
            owner: "global".to_string(),
            name: attribute.to_string(),
        })
}

/// Reduces the named daily variables of one file to an annual dataset with a
/// leading length-one `realization` dimension.
///
/// The returned dataset keeps the input's global and variable attributes;
/// stage-specific edits are left to the caller. The time coordinate is
/// re-encoded in the input's units and calendar and loses its `bounds`.
pub fn reduce_daily_file(
    file: &File,
    path: &Path,
    variables: &[String],
    reduction: AnnualReduction,
    config: &PipelineConfig,
) -> StatsResult<(String, GridDataset)> {
    let label = read_realization_label(file, path, &config.realization_attribute)?;
    let (axis, mut time_attrs) = read_time_axis(file, path)?;
    let bins = YearBins::new(&axis, reduction)?;
    debug!(
        "{}: {} daily steps reduce to {} years ({}..={})",
        label,
        axis.len(),
        bins.len(),
        bins.years.first().copied().unwrap_or_default(),
        bins.years.last().copied().unwrap_or_default()
    );

    let time_values = bins
        .years
        .iter()
        .map(|&y| axis.encode(reduction.label(y)))
        .collect::<StatsResult<Vec<f64>>>()?;
    time_attrs.remove("bounds");
    time_attrs.set("units", axis.units.as_str());
    time_attrs.set("calendar", axis.calendar.as_str());

    let lat = netcdf_io::read_numeric_coordinate(file, path, "lat")?;
    let lon = netcdf_io::read_numeric_coordinate(file, path, "lon")?;

    let mut ds = GridDataset {
        dims: vec![
            ("realization".to_string(), 1),
            ("time".to_string(), bins.len()),
            ("lat".to_string(), lat.values.len()),
            ("lon".to_string(), lon.values.len()),
        ],
        coords: vec![
            Coordinate::text("realization", "realization", vec![label.clone()]),
            Coordinate::numeric("time", time_values, time_attrs),
            lat,
            lon,
        ],
        data_vars: Vec::with_capacity(variables.len()),
        attrs: netcdf_io::global_attributes(file),
    };

    for name in variables {
        let var = netcdf_io::require_variable(file, path, name)?;
        debug!("Reducing {} of {}", name, label);
        let annual = reduce_variable(&var, &bins, reduction, config.lat_chunk)?;
        let data = annual.insert_axis(Axis(0)).into_dyn();
        ds.data_vars.push(GridVariable::new(
            name,
            vec!["realization".into(), "time".into(), "lat".into(), "lon".into()],
            data,
            netcdf_io::variable_attributes(&var),
        )?);
    }

    ds.validate()?;
    Ok((label, ds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noleap_axis(years: i32) -> TimeAxis {
        let values: Vec<f64> = (0..365 * years).map(f64::from).collect();
        TimeAxis::decode("days since 1950-01-01", Some("noleap"), &values).unwrap()
    }

    #[test]
    fn test_mjjas_window_has_153_days() {
        let bins = YearBins::new(&noleap_axis(2), AnnualReduction::MJJAS_MEAN).unwrap();
        assert_eq!(bins.years, vec![1950, 1951]);
        assert!(bins.days.iter().all(|d| d.len() == 153));
        // 1 May is day 120 of a noleap year
        assert_eq!(bins.days[0][0], 120);
    }

    #[test]
    fn test_single_day_seasonal_mean() {
        let axis = noleap_axis(1);
        let mut slab = Array3::<f64>::zeros((365, 1, 2));
        // a July day inside the window and a January day outside it
        slab[[190, 0, 0]] = 153.0;
        slab[[10, 0, 0]] = 1000.0;
        slab[[200, 0, 1]] = f64::NAN;
        let bins = YearBins::new(&axis, AnnualReduction::MJJAS_MEAN).unwrap();
        let out = reduce_slab(&slab, &bins, AnnualReduction::MJJAS_MEAN);
        assert_eq!(out[[0, 0, 0]], 1.0);
        assert_eq!(out[[0, 0, 1]], 0.0);
    }

    #[test]
    fn test_annual_sum_counts_ones() {
        let axis = noleap_axis(2);
        let mut slab = Array3::<f64>::zeros((730, 1, 1));
        for t in 100..117 {
            slab[[t, 0, 0]] = 1.0;
        }
        slab[[400, 0, 0]] = 1.0;
        slab[[401, 0, 0]] = f64::NAN;
        let bins = YearBins::new(&axis, AnnualReduction::AnnualSum).unwrap();
        let out = reduce_slab(&slab, &bins, AnnualReduction::AnnualSum);
        assert_eq!(out[[0, 0, 0]], 17.0);
        assert_eq!(out[[1, 0, 0]], 1.0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(AnnualReduction::MJJAS_MEAN.label(1990), CfDate::new(1990, 5, 1));
        assert_eq!(AnnualReduction::AnnualSum.label(1990), CfDate::new(1990, 1, 1));
    }

    #[test]
    fn test_axis_without_season_days_fails() {
        let values: Vec<f64> = (0..60).map(f64::from).collect();
        let axis = TimeAxis::decode("days since 1950-01-01", Some("noleap"), &values).unwrap();
        assert!(YearBins::new(&axis, AnnualReduction::MJJAS_MEAN).is_err());
    }
}
