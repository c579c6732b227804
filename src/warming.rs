//! # Warming Levels
//!
//! Each 30-year period is labelled with the global warming level reached in
//! it, written as `GWL:{level:.2}Cvs1850-1900`.
//!
//! - RCP8.5 levels come from a CSV table with the period label in the first
//!   column and one column per scenario.
//! - Constructed scenarios store a level per member and per period. Members
//!   differ slightly, so the canonical level of a period is the mean over
//!   members.

use crate::config::Scenario;
use crate::error::{StatsError, StatsResult};
use log::debug;
use polars::prelude::*;
use std::path::Path;

const BASELINE_SUFFIX: &str = "Cvs1850-1900";

/// Formats a level in degrees Celsius as a coordinate label
pub fn format_level(level: f64) -> String {
    format!("GWL:{:.2}{}", level, BASELINE_SUFFIX)
}

/// Extracts the numeric level, the text between `:` and `C`
pub fn parse_level(label: &str) -> StatsResult<f64> {
    let invalid = || StatsError::WarmingLevel(format!("cannot parse warming level '{}'", label));
    let (_, rest) = label.split_once(':').ok_or_else(invalid)?;
    let number = rest.split('C').next().unwrap_or(rest).trim();
    number.parse::<f64>().map_err(|_| invalid())
}

/// Averages per-member labels period by period and formats the result.
///
/// `members[m][p]` is the label of member `m` for period `p`.
pub fn reconcile(members: &[Vec<String>]) -> StatsResult<Vec<String>> {
    let first = members
        .first()
        .ok_or_else(|| StatsError::WarmingLevel("no members to reconcile".to_string()))?;
    let n_periods = first.len();

    let mut sums = vec![0.0; n_periods];
    for (m, labels) in members.iter().enumerate() {
        if labels.len() != n_periods {
            return Err(StatsError::WarmingLevel(format!(
                "member {} has {} warming levels, expected {}",
                m,
                labels.len(),
                n_periods
            )));
        }
        for (sum, label) in sums.iter_mut().zip(labels) {
            *sum += parse_level(label)?;
        }
    }

    let n = members.len() as f64;
    Ok(sums.into_iter().map(|s| format_level(s / n)).collect())
}

/// Warming levels by period and scenario
#[derive(Debug, Clone)]
pub struct WarmingLevelTable {
    frame: DataFrame,
}

impl WarmingLevelTable {
    pub fn load(path: &Path) -> StatsResult<Self> {
        debug!("Reading warming levels from {}", path.display());
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        Self::from_frame(frame)
    }

    /// Wraps a frame whose first column holds period labels
    pub fn from_frame(frame: DataFrame) -> StatsResult<Self> {
        if frame.width() < 2 {
            return Err(StatsError::WarmingLevel(format!(
                "warming level table needs a period column and at least one scenario column, found {} columns",
                frame.width()
            )));
        }
        Ok(WarmingLevelTable { frame })
    }

    fn periods(&self) -> StatsResult<Vec<Option<String>>> {
        let column = self.frame.get_columns()[0].cast(&DataType::String)?;
        Ok(column.str()?.into_iter().map(|p| p.map(|s| s.trim().to_string())).collect())
    }

    /// Labels for `periods`, matched by period label, from the column of
    /// `scenario`
    pub fn levels_for(&self, scenario: Scenario, periods: &[String]) -> StatsResult<Vec<String>> {
        let name = scenario.table_column();
        let column = self.frame.column(name).map_err(|_| {
            StatsError::WarmingLevel(format!("warming level table has no '{}' column", name))
        })?;
        let values: Vec<Option<f64>> = column.cast(&DataType::Float64)?.f64()?.into_iter().collect();
        let table_periods = self.periods()?;

        periods
            .iter()
            .map(|period| {
                let row = table_periods
                    .iter()
                    .position(|p| p.as_deref() == Some(period.as_str()))
                    .ok_or_else(|| StatsError::MissingPeriod(period.clone()))?;
                values[row].map(format_level).ok_or_else(|| {
                    StatsError::WarmingLevel(format!("no {} warming level for period {}", name, period))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        assert_eq!(parse_level("GWL:1.25Cvs1850-1900").unwrap(), 1.25);
        assert_eq!(format_level(0.6), "GWL:0.60Cvs1850-1900");
        assert!(parse_level("1.25").is_err());
        assert!(parse_level("GWL:abcCvs1850-1900").is_err());
    }

    #[test]
    fn test_reconcile_averages_members() {
        let members = vec![
            vec!["GWL:0.60Cvs1850-1900".to_string(), "GWL:2.00Cvs1850-1900".to_string()],
            vec!["GWL:0.70Cvs1850-1900".to_string(), "GWL:2.10Cvs1850-1900".to_string()],
        ];
        assert_eq!(
            reconcile(&members).unwrap(),
            vec!["GWL:0.65Cvs1850-1900", "GWL:2.05Cvs1850-1900"]
        );
    }

    #[test]
    fn test_reconcile_rejects_ragged_members() {
        let members = vec![
            vec!["GWL:0.60Cvs1850-1900".to_string()],
            vec!["GWL:0.70Cvs1850-1900".to_string(), "GWL:2.10Cvs1850-1900".to_string()],
        ];
        assert!(reconcile(&members).is_err());
        assert!(reconcile(&[]).is_err());
    }

    #[test]
    fn test_table_matches_periods_by_label() {
        let frame = df! {
            "period" => ["1971-2000", "2021-2050", "2071-2100"],
            "RCP2.6" => [0.61, 1.4, 1.5],
            "RCP8.5" => [0.61, 1.63, 4.12],
        }
        .unwrap();
        let table = WarmingLevelTable::from_frame(frame).unwrap();
        let periods = vec!["2071-2100".to_string(), "1971-2000".to_string()];
        assert_eq!(
            table.levels_for(Scenario::Rcp85, &periods).unwrap(),
            vec!["GWL:4.12Cvs1850-1900", "GWL:0.61Cvs1850-1900"]
        );

        let missing = table.levels_for(Scenario::Rcp85, &["1951-1980".to_string()]);
        assert!(matches!(missing, Err(StatsError::MissingPeriod(p)) if p == "1951-1980"));
    }

    #[test]
    fn test_table_load_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warming_levels_by_period_all_RCPs.csv");
        std::fs::write(&path, "period,RCP2.6,RCP4.5,RCP8.5\n1971-2000,0.6,0.6,0.6\n2041-2070,1.5,2.0,2.7\n").unwrap();
        let table = WarmingLevelTable::load(&path).unwrap();
        assert_eq!(
            table.levels_for(Scenario::Rcp85, &["2041-2070".to_string()]).unwrap(),
            vec!["GWL:2.70Cvs1850-1900"]
        );
    }
}
