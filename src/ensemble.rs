//! # Ensemble Statistics Aggregator
//!
//! Fans in the 30-year climatological means of every ensemble member for one
//! (scenario, metric), and writes three products:
//!
//! 1. absolute values,
//! 2. differences from 1971-2000,
//! 3. percent differences from 1971-2000,
//!
//! each summarised across realizations as the 10th, 50th and 90th
//! percentiles plus the mean, stacked on a leading `ensemble_statistic` axis.
//!
//! The member count must equal the configured ensemble size exactly; anything
//! else aborts the metric before a file is opened. Before a rank statistic is
//! taken the realization axis is moved last and made contiguous, so every
//! cell's members form one lane in memory.

use crate::catalog::FileCatalog;
use crate::config::{Metric, Scenario, StageContext};
use crate::error::{StatsError, StatsResult};
use crate::grid::{Attributes, CoordValues, Coordinate, GridDataset, GridVariable};
use crate::log::progress_bar;
use crate::mask::DomainMask;
use crate::metadata::{self, Variant};
use crate::netcdf_io::{self, VariableEncoding};
use crate::stats;
use crate::warming::{self, WarmingLevelTable};
use log::{debug, info};
use ndarray::{ArrayView, Axis, IxDyn, concatenate};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const REFERENCE_PERIOD: &str = "1971-2000";

/// Per-member coordinates on the period axis that differ between members and
/// are replaced by the reconciled warming level after merging
pub const MEMBER_COORDINATES: [&str; 3] = ["source_rcp_period", "source_rcp_period_first_year", "warming_level"];

const REALIZATION: &str = "realization";
const PERIOD: &str = "period";
const WARMING_LEVEL: &str = "warming_level";
const ENSEMBLE_STATISTIC: &str = "ensemble_statistic";

/// Renamed so it cannot be confused with the ensemble quantiles
const MEMBER_QUANTILE: &str = "quantile";
const ANNUAL_QUANTILES: &str = "annual_quantiles";

/// Climatology files of one metric: `*_{metric}*_30yr_mean.nc`
pub fn input_pattern(metric: Metric) -> String {
    format!("*_{}*_30yr_mean.nc", metric)
}

pub fn output_path(ctx: &StageContext, scenario: Scenario, metric: Metric, variant: Variant) -> PathBuf {
    ctx.ensemble_output_dir(scenario).join(format!(
        "{}_{}_30yr_mean_{}ensemble_percentiles.nc",
        metric,
        scenario,
        variant.file_infix()
    ))
}

/// One member's climatology, with the per-member period coordinates removed
#[derive(Debug, Clone)]
pub struct Member {
    pub path: PathBuf,
    pub realizations: Vec<String>,
    pub periods: Vec<String>,
    /// `warming_level` labels by period, when the file carries them
    pub warming_levels: Option<Vec<String>>,
    pub dims: Vec<(String, usize)>,
    pub coords: Vec<Coordinate>,
    pub data_vars: Vec<GridVariable>,
    pub attrs: Attributes,
}

impl Member {
    /// Reads one member file. Its `warming_level` labels are only kept for
    /// constructed scenarios; other scenarios take them from the lookup table,
    /// whatever type the file stores them as.
    pub fn load(path: &Path, scenario: Scenario) -> StatsResult<Self> {
        let file = netcdf_io::open(path)?;
        let dims: Vec<(String, usize)> = file.dimensions().map(|d| (d.name(), d.len())).collect();
        for required in [REALIZATION, PERIOD] {
            if !dims.iter().any(|(d, _)| d == required) {
                return Err(StatsError::Dimensions {
                    name: path.display().to_string(),
                    expected: vec![REALIZATION.to_string(), PERIOD.to_string()],
                    found: dims.iter().map(|(d, _)| d.clone()).collect(),
                });
            }
        }

        let mut realizations = None;
        let mut periods = None;
        let mut warming_levels = None;
        let mut coords = Vec::new();
        let mut data_vars = Vec::new();

        for var in file.variables() {
            let name = var.name();
            let var_dims = netcdf_io::dimension_names(&var);

            if name == WARMING_LEVEL && scenario.is_constructed() {
                warming_levels = Some(netcdf_io::read_text_values(&file, path, &name)?);
            } else if MEMBER_COORDINATES.contains(&name.as_str()) {
                debug!("Dropping per-member coordinate '{}' of {}", name, path.display());
            } else if var_dims.len() == 1 && var_dims[0] == name {
                let coord = read_coordinate(&file, path, &name)?;
                match name.as_str() {
                    REALIZATION => realizations = Some(labels(&coord.values)),
                    PERIOD => {
                        periods = Some(labels(&coord.values));
                        coords.push(coord);
                    }
                    _ => coords.push(coord),
                }
            } else if var_dims.iter().any(|d| d == REALIZATION) {
                data_vars.push(netcdf_io::read_variable(&file, path, &name)?);
            } else if var_dims.is_empty() && !netcdf_io::is_text(&var) {
                let mut coord = netcdf_io::read_numeric_coordinate(&file, path, &name)?;
                coord.dim = None;
                coords.push(coord);
            } else {
                debug!("Skipping auxiliary variable '{}' of {}", name, path.display());
            }
        }

        let missing = |name: &str| StatsError::MissingVariable {
            path: path.to_path_buf(),
            name: name.to_string(),
        };
        let mut member = Member {
            path: path.to_path_buf(),
            realizations: realizations.ok_or_else(|| missing(REALIZATION))?,
            periods: periods.ok_or_else(|| missing(PERIOD))?,
            warming_levels,
            dims,
            coords,
            data_vars,
            attrs: netcdf_io::global_attributes(&file),
        };
        if member.data_vars.is_empty() {
            return Err(missing("any variable along 'realization'"));
        }
        member.rename_dimension(MEMBER_QUANTILE, ANNUAL_QUANTILES);
        Ok(member)
    }

    /// Renames a dimension and its coordinate. A scalar coordinate of that
    /// name is renamed even though no dimension exists.
    pub fn rename_dimension(&mut self, from: &str, to: &str) {
        for coord in self.coords.iter_mut() {
            if coord.name == from {
                coord.name = to.to_string();
            }
            if coord.dim.as_deref() == Some(from) {
                coord.dim = Some(to.to_string());
            }
        }
        if !self.dims.iter().any(|(d, _)| d == from) {
            return;
        }
        debug!("Renaming dimension '{}' to '{}' in {}", from, to, self.path.display());
        for (name, _) in self.dims.iter_mut().filter(|(d, _)| d == from) {
            *name = to.to_string();
        }
        for var in self.data_vars.iter_mut() {
            for dim in var.dims.iter_mut().filter(|d| d.as_str() == from) {
                *dim = to.to_string();
            }
        }
    }

    fn dims_without_realization(&self) -> Vec<(String, usize)> {
        self.dims.iter().filter(|(d, _)| d != REALIZATION).cloned().collect()
    }
}

fn read_coordinate(file: &netcdf::File, path: &Path, name: &str) -> StatsResult<Coordinate> {
    let var = netcdf_io::require_variable(file, path, name)?;
    if netcdf_io::is_text(&var) {
        let mut coord = Coordinate::text(name, name, netcdf_io::read_text_values(file, path, name)?);
        coord.attrs = netcdf_io::variable_attributes(&var);
        Ok(coord)
    } else {
        netcdf_io::read_numeric_coordinate(file, path, name)
    }
}

fn labels(values: &CoordValues) -> Vec<String> {
    match values {
        CoordValues::Text(v) => v.clone(),
        CoordValues::Numeric(v) => v.iter().map(|x| x.to_string()).collect(),
    }
}

/// All members merged along `realization`
#[derive(Debug, Clone)]
pub struct MergedEnsemble {
    pub realizations: Vec<String>,
    pub periods: Vec<String>,
    /// Dimensions other than `realization`, in member order
    pub dims: Vec<(String, usize)>,
    pub coords: Vec<Coordinate>,
    pub data_vars: Vec<GridVariable>,
    /// Global attributes of the first member
    pub attrs: Attributes,
}

impl MergedEnsemble {
    /// Concatenates members after checking they share periods, grid and
    /// variables
    pub fn merge(members: Vec<Member>) -> StatsResult<Self> {
        let first = members
            .first()
            .ok_or_else(|| StatsError::Config("cannot merge an empty ensemble".to_string()))?;
        let dims = first.dims_without_realization();
        let periods = first.periods.clone();
        let var_layout: Vec<(String, Vec<String>)> =
            first.data_vars.iter().map(|v| (v.name.clone(), v.dims.clone())).collect();

        let mut realizations = Vec::new();
        let mut seen = HashSet::new();
        for member in &members {
            let inconsistent = |reason: String| StatsError::InconsistentMembers {
                path: member.path.clone(),
                reason,
            };
            if member.periods != periods {
                return Err(inconsistent(format!("periods {:?} differ from {:?}", member.periods, periods)));
            }
            if member.dims_without_realization() != dims {
                return Err(inconsistent("grid dimensions differ".to_string()));
            }
            let layout: Vec<(String, Vec<String>)> =
                member.data_vars.iter().map(|v| (v.name.clone(), v.dims.clone())).collect();
            if layout != var_layout {
                return Err(inconsistent("data variables differ".to_string()));
            }
            for label in &member.realizations {
                if !seen.insert(label.clone()) {
                    return Err(inconsistent(format!("duplicate realization '{}'", label)));
                }
                realizations.push(label.clone());
            }
        }

        let mut data_vars = Vec::with_capacity(var_layout.len());
        for (index, (name, var_dims)) in var_layout.iter().enumerate() {
            let axis = var_dims
                .iter()
                .position(|d| d == REALIZATION)
                .ok_or_else(|| StatsError::Dimensions {
                    name: name.clone(),
                    expected: vec![REALIZATION.to_string()],
                    found: var_dims.clone(),
                })?;
            let views: Vec<ArrayView<f64, IxDyn>> = members.iter().map(|m| m.data_vars[index].data.view()).collect();
            let data = concatenate(Axis(axis), &views)?;
            let attrs = first.data_vars[index].attrs.clone();
            data_vars.push(GridVariable::new(name, var_dims.clone(), data, attrs)?);
        }

        let coords = first.coords.clone();
        let attrs = first.attrs.clone();
        Ok(MergedEnsemble {
            realizations,
            periods,
            dims,
            coords,
            data_vars,
            attrs,
        })
    }

    pub fn reference_index(&self) -> StatsResult<usize> {
        self.periods
            .iter()
            .position(|p| p == REFERENCE_PERIOD)
            .ok_or_else(|| StatsError::MissingPeriod(REFERENCE_PERIOD.to_string()))
    }

    /// Ensemble statistics of one variant, as a dataset ready for metadata
    /// and masking
    pub fn summarise(&self, variant: Variant, warming_levels: &[String]) -> StatsResult<GridDataset> {
        let reference = self.reference_index()?;

        let mut dims = vec![(ENSEMBLE_STATISTIC.to_string(), stats::STATISTIC_LABELS.len())];
        dims.extend(self.dims.iter().cloned());

        let mut coords = vec![Coordinate::text(
            ENSEMBLE_STATISTIC,
            ENSEMBLE_STATISTIC,
            stats::STATISTIC_LABELS.iter().map(|s| s.to_string()).collect(),
        )];
        coords.extend(self.coords.iter().cloned());
        coords.push(Coordinate::text(WARMING_LEVEL, PERIOD, warming_levels.to_vec()));

        let mut data_vars = Vec::with_capacity(self.data_vars.len());
        for var in &self.data_vars {
            let (realization_axis, period_axis) = match (var.axis_of(REALIZATION), var.axis_of(PERIOD)) {
                (Some(r), Some(p)) => (r, p),
                _ => {
                    return Err(StatsError::Dimensions {
                        name: var.name.clone(),
                        expected: vec![REALIZATION.to_string(), PERIOD.to_string()],
                        found: var.dims.clone(),
                    });
                }
            };

            let values = match variant {
                Variant::Absolute => var.data.clone(),
                Variant::Delta => stats::delta(&var.data, period_axis, reference),
                Variant::PercentDelta => stats::percent_delta(&var.data, period_axis, reference),
            };
            let lanes = stats::realization_last(values, realization_axis);
            let summary = stats::ensemble_statistics(&lanes, variant.skipna())?;
            drop(lanes);

            let mut out_dims = vec![ENSEMBLE_STATISTIC.to_string()];
            out_dims.extend(var.dims.iter().filter(|d| d.as_str() != REALIZATION).cloned());
            data_vars.push(GridVariable::new(&var.name, out_dims, summary, var.attrs.clone())?);
        }

        Ok(GridDataset {
            dims,
            coords,
            data_vars,
            attrs: self.attrs.clone(),
        })
    }
}

/// Canonical warming-level labels for the merged periods
pub fn resolve_warming_levels(
    scenario: Scenario,
    members: &[Member],
    periods: &[String],
    table: Option<&WarmingLevelTable>,
) -> StatsResult<Vec<String>> {
    if scenario.is_constructed() {
        let per_member = members
            .iter()
            .map(|m| {
                m.warming_levels.clone().ok_or_else(|| StatsError::MissingVariable {
                    path: m.path.clone(),
                    name: WARMING_LEVEL.to_string(),
                })
            })
            .collect::<StatsResult<Vec<_>>>()?;
        warming::reconcile(&per_member)
    } else {
        let table = table.ok_or_else(|| {
            StatsError::WarmingLevel(format!("{} warming levels need the lookup table", scenario))
        })?;
        table.levels_for(scenario, periods)
    }
}

/// Everything loaded once per run and shared by every metric
pub struct SharedInputs {
    pub mask: DomainMask,
    pub table: Option<WarmingLevelTable>,
}

impl SharedInputs {
    pub fn load(ctx: &StageContext, scenario: Scenario) -> StatsResult<Self> {
        let config = &ctx.config;
        let mask = DomainMask::load(&config.mask_path(), &config.mask_variable, config.mask_include_value)?;
        let table = if scenario.is_constructed() {
            None
        } else {
            Some(WarmingLevelTable::load(&config.warming_level_table()?)?)
        };
        Ok(SharedInputs { mask, table })
    }
}

/// Runs the aggregator for every requested metric of one scenario
pub fn run(
    ctx: &StageContext,
    catalog: &dyn FileCatalog,
    scenario: Scenario,
    metrics: &[Metric],
) -> StatsResult<Vec<PathBuf>> {
    let shared = if ctx.dry_run {
        None
    } else {
        Some(SharedInputs::load(ctx, scenario)?)
    };

    let mut written = Vec::new();
    for &metric in metrics {
        let files = discover(ctx, catalog, scenario, metric)?;
        match &shared {
            None => info!("[dry run] {} members found for {} ({})", files.len(), metric, scenario),
            Some(shared) => written.extend(process_metric(ctx, shared, scenario, metric, &files)?),
        }
    }
    Ok(written)
}

/// Lists the member files of a metric and enforces the ensemble size
pub fn discover(
    ctx: &StageContext,
    catalog: &dyn FileCatalog,
    scenario: Scenario,
    metric: Metric,
) -> StatsResult<Vec<PathBuf>> {
    let dir = ctx.climatology_dir(scenario, metric);
    let files = catalog.find(&dir, &input_pattern(metric))?;
    info!("Found {} climatology files for {} in {}", files.len(), metric, dir.display());
    if files.len() != ctx.config.ensemble_size {
        return Err(StatsError::EnsembleSize {
            metric: metric.to_string(),
            expected: ctx.config.ensemble_size,
            found: files.len(),
        });
    }
    Ok(files)
}

/// Computes and writes the three products of one metric
pub fn process_metric(
    ctx: &StageContext,
    shared: &SharedInputs,
    scenario: Scenario,
    metric: Metric,
    files: &[PathBuf],
) -> StatsResult<Vec<PathBuf>> {
    info!("Computing ensemble statistics of {} for {}", metric, scenario);

    let pb = progress_bar(files.len() as u64, metric.as_str());
    let mut members = Vec::with_capacity(files.len());
    for path in files {
        members.push(Member::load(path, scenario)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let periods = members.first().map(|m| m.periods.clone()).unwrap_or_default();
    let warming_levels = resolve_warming_levels(scenario, &members, &periods, shared.table.as_ref())?;
    debug!("Warming levels: {:?}", warming_levels);

    let merged = MergedEnsemble::merge(members)?;
    debug!(
        "Merged {} realizations over {} periods",
        merged.realizations.len(),
        merged.periods.len()
    );
    let dataset_attrs = metadata::ensemble_dataset_attributes(&merged.attrs, ctx, scenario);

    let mut written = Vec::with_capacity(Variant::ALL.len());
    for variant in Variant::ALL {
        let mut ds = merged.summarise(variant, &warming_levels)?;
        ds.attrs = dataset_attrs.clone();
        for var in ds.data_vars.iter_mut() {
            var.attrs = metadata::variable_attributes(&var.name, &var.attrs, metric, variant);
        }
        shared.mask.apply_all(&mut ds)?;

        let output = output_path(ctx, scenario, metric, variant);
        netcdf_io::write_dataset(&ds, &output, &VariableEncoding::ENSEMBLE_STATISTICS)?;
        info!("Wrote {}", output.display());
        written.push(output);
        drop(ds);
    }

    drop(merged);
    debug!("Released merged ensemble of {}", metric);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForcingDataset, PipelineConfig};
    use ndarray::{ArrayD, IxDyn};

    fn member(label: &str, values: &[f64]) -> Member {
        // (realization, period, lat, lon) with two periods and a 1x1 grid
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 2, 1, 1]), values.to_vec()).unwrap();
        Member {
            path: PathBuf::from(format!("{}_FWI_30yr_mean.nc", label)),
            realizations: vec![label.to_string()],
            periods: vec![REFERENCE_PERIOD.to_string(), "2071-2100".to_string()],
            warming_levels: Some(vec!["GWL:0.60Cvs1850-1900".into(), "GWL:3.00Cvs1850-1900".into()]),
            dims: vec![
                ("realization".into(), 1),
                ("period".into(), 2),
                ("lat".into(), 1),
                ("lon".into(), 1),
            ],
            coords: vec![
                Coordinate::text(PERIOD, PERIOD, vec![REFERENCE_PERIOD.into(), "2071-2100".into()]),
                Coordinate::numeric("lat", vec![50.0], Attributes::new()),
                Coordinate::numeric("lon", vec![-100.0], Attributes::new()),
            ],
            data_vars: vec![
                GridVariable::new(
                    "FWI",
                    vec!["realization".into(), "period".into(), "lat".into(), "lon".into()],
                    data,
                    Attributes::new(),
                )
                .unwrap(),
            ],
            attrs: Attributes::new(),
        }
    }

    fn five_members() -> Vec<Member> {
        (1..=5).map(|i| member(&format!("r{}", i), &[i as f64, 2.0 * i as f64])).collect()
    }

    #[test]
    fn test_output_names() {
        let mut config = PipelineConfig::new("/out", "/in");
        config.git_revision = Some("rev".into());
        let ctx = StageContext::new(config, ForcingDataset::S14fd, "fwistats");
        let path = output_path(&ctx, Scenario::Rcp85, Metric::ExceedancesHigh, Variant::PercentDelta);
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "exceedances_high_RCP85_30yr_mean_percent_delta_1971_2000_ensemble_percentiles.nc"
        );
        assert_eq!(input_pattern(Metric::FireSeasonLength), "*_fire_season_length*_30yr_mean.nc");
    }

    #[test]
    fn test_merge_and_summarise_absolute() {
        let merged = MergedEnsemble::merge(five_members()).unwrap();
        assert_eq!(merged.realizations, vec!["r1", "r2", "r3", "r4", "r5"]);
        assert_eq!(merged.data_vars[0].data.shape(), &[5, 2, 1, 1]);

        let levels = vec!["a".to_string(), "b".to_string()];
        let ds = merged.summarise(Variant::Absolute, &levels).unwrap();
        ds.validate().unwrap();
        let fwi = ds.data_var("FWI").unwrap();
        assert_eq!(fwi.dims, vec!["ensemble_statistic", "period", "lat", "lon"]);
        // reference period holds 1..=5
        assert!((fwi.data[[0, 0, 0, 0]] - 1.4).abs() < 1e-12);
        assert_eq!(fwi.data[[1, 0, 0, 0]], 3.0);
        assert!((fwi.data[[2, 0, 0, 0]] - 4.6).abs() < 1e-12);
        assert_eq!(fwi.data[[3, 0, 0, 0]], 3.0);
        assert_eq!(
            ds.coord(WARMING_LEVEL).unwrap().values,
            CoordValues::Text(levels)
        );
    }

    #[test]
    fn test_delta_and_percent_delta_products() {
        let merged = MergedEnsemble::merge(five_members()).unwrap();
        let levels = vec!["a".to_string(), "b".to_string()];

        let delta = merged.summarise(Variant::Delta, &levels).unwrap();
        let fwi = delta.data_var("FWI").unwrap();
        for k in 0..4 {
            assert_eq!(fwi.data[[k, 0, 0, 0]], 0.0);
        }
        assert_eq!(fwi.data[[3, 1, 0, 0]], 3.0);

        let pct = merged.summarise(Variant::PercentDelta, &levels).unwrap();
        let fwi = pct.data_var("FWI").unwrap();
        assert_eq!(fwi.data[[1, 1, 0, 0]], 100.0);
    }

    #[test]
    fn test_percent_delta_missing_member_masks_cell() {
        let mut members = five_members();
        members.push(member("r6", &[0.0, 4.0]));
        let merged = MergedEnsemble::merge(members).unwrap();
        let levels = vec!["a".to_string(), "b".to_string()];

        let pct = merged.summarise(Variant::PercentDelta, &levels).unwrap();
        assert!(pct.data_var("FWI").unwrap().data.iter().all(|v| v.is_nan()));

        let delta = merged.summarise(Variant::Delta, &levels).unwrap();
        assert!(delta.data_var("FWI").unwrap().data.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_merge_rejects_inconsistent_members() {
        let mut members = five_members();
        members[3].periods = vec!["1971-2000".into(), "2041-2070".into()];
        assert!(matches!(
            MergedEnsemble::merge(members),
            Err(StatsError::InconsistentMembers { .. })
        ));

        let mut members = five_members();
        members[4].realizations = vec!["r1".into()];
        assert!(matches!(
            MergedEnsemble::merge(members),
            Err(StatsError::InconsistentMembers { .. })
        ));
    }

    #[test]
    fn test_missing_reference_period() {
        let mut members = five_members();
        for m in members.iter_mut() {
            m.periods = vec!["1981-2010".into(), "2071-2100".into()];
        }
        let merged = MergedEnsemble::merge(members).unwrap();
        assert!(matches!(
            merged.summarise(Variant::Delta, &["a".into(), "b".into()]),
            Err(StatsError::MissingPeriod(_))
        ));
    }

    #[test]
    fn test_constructed_levels_are_reconciled() {
        let mut members = five_members();
        members[0].warming_levels = Some(vec!["GWL:0.70Cvs1850-1900".into(), "GWL:3.50Cvs1850-1900".into()]);
        let levels =
            resolve_warming_levels(Scenario::ConstructedRcp45, &members, &members[0].periods, None).unwrap();
        assert_eq!(levels, vec!["GWL:0.62Cvs1850-1900", "GWL:3.10Cvs1850-1900"]);

        members[2].warming_levels = None;
        assert!(resolve_warming_levels(Scenario::ConstructedRcp26, &members, &members[0].periods, None).is_err());
        assert!(resolve_warming_levels(Scenario::Rcp85, &members, &members[0].periods, None).is_err());
    }

    #[test]
    fn test_rename_member_quantile_dimension() {
        let mut m = member("r1", &[1.0, 2.0]);
        m.dims.push(("quantile".into(), 1));
        m.coords.push(Coordinate::numeric("quantile", vec![0.95], Attributes::new()));
        m.rename_dimension(MEMBER_QUANTILE, ANNUAL_QUANTILES);
        assert!(m.dims.iter().any(|(d, _)| d == "annual_quantiles"));
        assert!(
            m.coords
                .iter()
                .any(|c| c.name == "annual_quantiles" && c.dim.as_deref() == Some("annual_quantiles"))
        );
    }

    #[test]
    fn test_rename_scalar_member_quantile() {
        let mut m = member("r1", &[1.0, 2.0]);
        m.coords.push(Coordinate::scalar("quantile", 0.95, Attributes::new()));
        m.rename_dimension(MEMBER_QUANTILE, ANNUAL_QUANTILES);
        let coord = m.coords.iter().find(|c| c.name == "annual_quantiles").unwrap();
        assert_eq!(coord.dim, None);
        assert!(!m.dims.iter().any(|(d, _)| d == "annual_quantiles"));

        let merged = MergedEnsemble::merge(vec![m]).unwrap();
        let ds = merged.summarise(Variant::Absolute, &["a".into(), "b".into()]).unwrap();
        ds.validate().unwrap();
        assert!(ds.coord("annual_quantiles").is_some());
    }
}
