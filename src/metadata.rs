//! # Output Metadata
//!
//! Provenance stamping shared by all stages, the dataset attributes of the
//! ensemble products, and the variable attribute table keyed by
//! ([`Metric`], [`Variant`]).
//!
//! Variable attributes are derived in one pass from the merged input's
//! attributes. Edits are looked up from [`MetricSpec`] and [`Variant`] rather
//! than applied as a chain of in-place mutations, so the three variants of a
//! metric can be derived in any order.

use crate::config::{Metric, Scenario, StageContext};
use crate::grid::Attributes;
use chrono::Utc;

pub const INSTITUTION: &str = "Canadian Centre for Climate Services, Environment and Climate Change Canada";
pub const INSTITUTE_ID: &str = "CCCS/ECCC";
pub const DOMAIN: &str = "Canada land areas, excluding the Northern Arctic";

pub const REFERENCES: &str = "Van Vliet, L. et al. In review. Developing user-informed fire weather projections for Canada. Climate Services. \n\
Natural Resources Canada (NRCan). [no date]. Background Information: Canadian Forest Fire Weather \
Index (FWI) System. Accessed on: 2023-04-27. \
Available at: https://cwfis.cfs.nrcan.gc.ca/background/summary/fwi.";

pub const INDEX_PACKAGE_INFORMATION: &str = "FWI System outputs calculated using xclim 0.39.0 indices.fwi.fire_weather_ufunc \
and indices.fwi.fire_season. Reference: Logan, Travis, et al. Ouranosinc/xclim: \
V0.39.0. v0.39.0, Zenodo, 2 Nov. 2022, p., doi:10.5281/zenodo.7274811.";

/// Daily-file attributes repeated verbatim in every member and dropped from
/// ensemble products
pub const BIAS_ADJUSTMENT_ATTRIBUTES: [&str; 3] = [
    "CanLEAD_CanRCM4_bc_method_id",
    "CanLEAD_CanRCM4_bc_info",
    "CanLEAD_CanRCM4_bc_observation_id",
];

pub const FIRE_SEASON_DESCRIPTION: &str = "Number of days in the annual fire season based on temperature thresholds \
(when there is measurable fire danger and fire weather calculations are turned on).";

/// Records the invocation, code revision and repository in global attributes
pub fn stamp_provenance(attrs: &mut Attributes, ctx: &StageContext, git_repo: &str) {
    attrs.set("history", format!("Generated by {}", ctx.invocation));
    attrs.set("git_id", ctx.git_revision.as_str());
    attrs.set("git_repo", git_repo);
}

/// Global attributes of an ensemble product, starting from the first
/// member's global attributes
pub fn ensemble_dataset_attributes(member: &Attributes, ctx: &StageContext, scenario: Scenario) -> Attributes {
    let mut attrs = member.clone();
    for name in BIAS_ADJUSTMENT_ATTRIBUTES {
        attrs.remove(name);
    }
    attrs.set("creation_date", Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string());
    attrs.set("institution", INSTITUTION);
    attrs.set("institute_id", INSTITUTE_ID);
    attrs.set("domain", DOMAIN);
    attrs.set(
        "title",
        format!(
            "Canadian Forest Fire Weather Index (FWI) System projections based on CanLEAD-CanRCM4-{}",
            ctx.forcing
        ),
    );
    attrs.set("references", REFERENCES);
    attrs.set("index_package_information", INDEX_PACKAGE_INFORMATION);
    attrs.set("rcp", scenario.label());
    stamp_provenance(&mut attrs, ctx, &ctx.config.ensemble_git_repo);
    attrs
}

/// The three products computed for every metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Absolute,
    Delta,
    PercentDelta,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Absolute, Variant::Delta, Variant::PercentDelta];

    pub fn cell_methods_clause(&self) -> &'static str {
        match self {
            Variant::Absolute => "",
            Variant::Delta => " time: difference from 1971-2000",
            Variant::PercentDelta => " time: percent difference from 1971-2000",
        }
    }

    pub fn short_name_suffix(&self) -> &'static str {
        match self {
            Variant::Absolute => "",
            Variant::Delta => "_delta_1971_2000",
            Variant::PercentDelta => "_percent_delta_1971_2000",
        }
    }

    pub fn long_name_suffix(&self) -> &'static str {
        match self {
            Variant::Absolute => "",
            Variant::Delta => ", difference from 1971-2000",
            Variant::PercentDelta => ", percent difference from 1971-2000",
        }
    }

    /// Inserted between `30yr_mean_` and `ensemble_percentiles.nc`
    pub fn file_infix(&self) -> &'static str {
        match self {
            Variant::Absolute => "",
            Variant::Delta => "delta_1971_2000_",
            Variant::PercentDelta => "percent_delta_1971_2000_",
        }
    }

    /// Percent differences are only summarised where every member is defined
    pub fn skipna(&self) -> bool {
        !matches!(self, Variant::PercentDelta)
    }

    pub fn units(&self, metric: Metric) -> Option<&'static str> {
        match self {
            Variant::PercentDelta => Some("percent"),
            Variant::Absolute | Variant::Delta if metric.is_day_count() => Some("days"),
            _ => None,
        }
    }
}

/// How a metric rewrites the long name inherited from its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongNameEdit {
    Keep,
    Append(&'static str),
    /// Keep the text before the first `:` and append
    ReplaceAfterColon(&'static str),
}

/// Per-metric attribute edits applied before the variant suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    pub remove: &'static [&'static str],
    pub long_name: LongNameEdit,
    pub short_name_suffix: &'static str,
    pub cell_methods: Option<&'static str>,
}

impl MetricSpec {
    pub fn of(metric: Metric) -> Self {
        let unchanged = MetricSpec {
            remove: &[],
            long_name: LongNameEdit::Keep,
            short_name_suffix: "",
            cell_methods: None,
        };
        match metric {
            Metric::MjjasMeanFillna => MetricSpec {
                remove: &["ancillary_variables"],
                long_name: LongNameEdit::Append(": May to September mean value (NaNs filled with zeroes)"),
                short_name_suffix: "_MJJAS_fillna_mean",
                cell_methods: Some("time: mean over MJJAS (interval: 1 day) time: mean over years"),
            },
            Metric::MjjasQuantileFillna => MetricSpec {
                long_name: LongNameEdit::Append(
                    ": May to September (annual) quantile value (NaNs filled with zeroes)",
                ),
                short_name_suffix: "_MJJAS_fillna_quantile",
                ..unchanged
            },
            Metric::AnnualExceedancesMjjas95th => MetricSpec {
                long_name: LongNameEdit::ReplaceAfterColon(
                    ": Count of days that exceed the 95th percentile May to September value (NaNs filled with zeroes) in 1971-2000",
                ),
                short_name_suffix: "_fillna",
                ..unchanged
            },
            Metric::FireSeasonLength
            | Metric::ExceedancesHigh
            | Metric::ExceedancesExtreme
            | Metric::ExceedancesModerate => unchanged,
        }
    }
}

/// Attributes of variable `name` in the `variant` product of `metric`,
/// derived from the attributes it carried in the merged input.
///
/// Missing `short_name` and `long_name` fall back to the variable name.
pub fn variable_attributes(name: &str, source: &Attributes, metric: Metric, variant: Variant) -> Attributes {
    let spec = MetricSpec::of(metric);
    let mut attrs = source.clone();
    for attr in spec.remove {
        attrs.remove(attr);
    }

    let long_name = attrs.text("long_name").unwrap_or(name).to_string();
    let long_name = match spec.long_name {
        LongNameEdit::Keep => long_name,
        LongNameEdit::Append(suffix) => format!("{}{}", long_name, suffix),
        LongNameEdit::ReplaceAfterColon(suffix) => {
            format!("{}{}", long_name.split(':').next().unwrap_or_default(), suffix)
        }
    };
    let short_name = format!("{}{}", attrs.text("short_name").unwrap_or(name), spec.short_name_suffix);
    let cell_methods = match spec.cell_methods {
        Some(replacement) => replacement.to_string(),
        None => attrs.text("cell_methods").unwrap_or_default().to_string(),
    };

    let cell_methods = format!("{} (interval: 1 year){}", cell_methods, variant.cell_methods_clause());
    attrs.set("cell_methods", cell_methods.trim_start());
    attrs.set("short_name", format!("{}{}", short_name, variant.short_name_suffix()));
    attrs.set("long_name", format!("{}{}", long_name, variant.long_name_suffix()));

    let description = if metric == Metric::FireSeasonLength {
        Some(FIRE_SEASON_DESCRIPTION.to_string())
    } else {
        attrs.text("description").map(|d| {
            let lead = d.split(" (").next().unwrap_or_default();
            format!("{}: \"{}.\" (NRCan n.d.)", name, lead)
        })
    };
    if let Some(description) = description {
        attrs.set("description", description);
    }

    if let Some(units) = variant.units(metric) {
        attrs.set("units", units);
    }
    attrs
}
