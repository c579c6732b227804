//! # CF Time Axis
//!
//! Decodes and encodes `"<unit> since <date>"` time coordinates for the
//! calendars used by bias-adjusted regional climate model output: the standard
//! (proleptic Gregorian) calendar plus the fixed-length `noleap`, `all_leap`
//! and `360_day` calendars.

use crate::error::{StatsError, StatsResult};
use chrono::{Datelike, NaiveDate};
use std::fmt;

const NOLEAP_MONTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
const ALL_LEAP_MONTHS: [u32; 12] = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Calendar named by a CF `calendar` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    Standard,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    /// Parses a CF calendar name. A missing attribute means `standard`.
    pub fn parse(name: Option<&str>) -> StatsResult<Self> {
        match name.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("standard") | Some("gregorian") | Some("proleptic_gregorian") => {
                Ok(Calendar::Standard)
            }
            Some("noleap") | Some("365_day") => Ok(Calendar::NoLeap),
            Some("all_leap") | Some("366_day") => Ok(Calendar::AllLeap),
            Some("360_day") => Ok(Calendar::Day360),
            Some(other) => Err(StatsError::TimeAxis(format!("unsupported calendar '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Calendar::Standard => "standard",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        }
    }

    fn days_in_month(&self, year: i32, month: u32) -> u32 {
        let idx = (month - 1) as usize;
        match self {
            Calendar::NoLeap => NOLEAP_MONTHS[idx],
            Calendar::AllLeap => ALL_LEAP_MONTHS[idx],
            Calendar::Day360 => 30,
            Calendar::Standard => {
                let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
                if leap { ALL_LEAP_MONTHS[idx] } else { NOLEAP_MONTHS[idx] }
            }
        }
    }

    fn fixed_year_length(&self) -> Option<i64> {
        match self {
            Calendar::Standard => None,
            Calendar::NoLeap => Some(365),
            Calendar::AllLeap => Some(366),
            Calendar::Day360 => Some(360),
        }
    }

    /// Day number of a date, counted from an arbitrary calendar-specific origin
    fn ordinal(&self, date: CfDate) -> StatsResult<i64> {
        match self.fixed_year_length() {
            None => NaiveDate::from_ymd_opt(date.year, date.month, date.day)
                .map(|d| i64::from(d.num_days_from_ce()))
                .ok_or_else(|| StatsError::TimeAxis(format!("invalid date {}", date))),
            Some(year_len) => {
                if date.month == 0 || date.month > 12 || date.day == 0 || date.day > self.days_in_month(date.year, date.month) {
                    return Err(StatsError::TimeAxis(format!("invalid {} date {}", self.as_str(), date)));
                }
                let day_of_year: u32 =
                    (1..date.month).map(|m| self.days_in_month(date.year, m)).sum::<u32>() + date.day - 1;
                Ok(i64::from(date.year) * year_len + i64::from(day_of_year))
            }
        }
    }

    fn from_ordinal(&self, ordinal: i64) -> StatsResult<CfDate> {
        match self.fixed_year_length() {
            None => {
                let days = i32::try_from(ordinal)
                    .map_err(|_| StatsError::TimeAxis(format!("day number {} out of range", ordinal)))?;
                NaiveDate::from_num_days_from_ce_opt(days)
                    .map(|d| CfDate::new(d.year(), d.month(), d.day()))
                    .ok_or_else(|| StatsError::TimeAxis(format!("day number {} out of range", ordinal)))
            }
            Some(year_len) => {
                let year = ordinal.div_euclid(year_len) as i32;
                let mut remaining = ordinal.rem_euclid(year_len) as u32;
                let mut month = 1;
                while remaining >= self.days_in_month(year, month) {
                    remaining -= self.days_in_month(year, month);
                    month += 1;
                }
                Ok(CfDate::new(year, month, remaining + 1))
            }
        }
    }
}

/// A calendar date without time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CfDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        CfDate { year, month, day }
    }

    fn parse(s: &str) -> StatsResult<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 3 {
            return Err(StatsError::TimeAxis(format!("invalid reference date '{}'", s)));
        }
        let parse_part = |p: &str| {
            p.parse::<i64>()
                .map_err(|_| StatsError::TimeAxis(format!("invalid reference date '{}'", s)))
        };
        Ok(CfDate::new(
            parse_part(parts[0])? as i32,
            parse_part(parts[1])? as u32,
            parse_part(parts[2])? as u32,
        ))
    }
}

impl fmt::Display for CfDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A decoded time coordinate
#[derive(Debug, Clone)]
pub struct TimeAxis {
    pub units: String,
    pub calendar: Calendar,
    pub dates: Vec<CfDate>,
    epoch_ordinal: i64,
    days_per_unit: f64,
}

impl TimeAxis {
    /// Decodes raw offsets using the variable's `units` and `calendar` attributes.
    /// Sub-daily offsets are floored to the containing day.
    pub fn decode(units: &str, calendar: Option<&str>, values: &[f64]) -> StatsResult<Self> {
        let calendar = Calendar::parse(calendar)?;
        let tokens: Vec<&str> = units.split_whitespace().collect();
        if tokens.len() < 3 || !tokens[1].eq_ignore_ascii_case("since") {
            return Err(StatsError::TimeAxis(format!("unsupported time units '{}'", units)));
        }
        let days_per_unit = match tokens[0].to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => 1.0,
            "hours" | "hour" | "h" => 1.0 / 24.0,
            "minutes" | "minute" => 1.0 / 1440.0,
            "seconds" | "second" | "s" => 1.0 / 86400.0,
            other => return Err(StatsError::TimeAxis(format!("unsupported time unit '{}'", other))),
        };
        // "1950-01-01T00:00:00" and "1950-01-01 00:00:00" both reduce to the date part
        let date_token = tokens[2].split('T').next().unwrap_or(tokens[2]);
        let epoch_ordinal = calendar.ordinal(CfDate::parse(date_token)?)?;

        let dates = values
            .iter()
            .map(|v| {
                if !v.is_finite() {
                    return Err(StatsError::TimeAxis(format!("non-finite time value {}", v)));
                }
                let offset = (v * days_per_unit + 1e-9).floor() as i64;
                calendar.from_ordinal(epoch_ordinal + offset)
            })
            .collect::<StatsResult<Vec<_>>>()?;

        Ok(TimeAxis {
            units: units.to_string(),
            calendar,
            dates,
            epoch_ordinal,
            days_per_unit,
        })
    }

    /// Encodes a date as an offset in this axis' units and calendar
    pub fn encode(&self, date: CfDate) -> StatsResult<f64> {
        let ordinal = self.calendar.ordinal(date)?;
        Ok((ordinal - self.epoch_ordinal) as f64 / self.days_per_unit)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noleap_year_has_no_february_29() {
        let values: Vec<f64> = (0..365).map(f64::from).collect();
        let axis = TimeAxis::decode("days since 1952-01-01", Some("noleap"), &values).unwrap();
        assert_eq!(axis.dates[0], CfDate::new(1952, 1, 1));
        assert_eq!(axis.dates[59], CfDate::new(1952, 3, 1));
        assert_eq!(axis.dates[364], CfDate::new(1952, 12, 31));
    }

    #[test]
    fn test_standard_calendar_leap_day() {
        let axis = TimeAxis::decode("days since 2000-02-28 00:00:00", Some("standard"), &[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(axis.dates, vec![
            CfDate::new(2000, 2, 28),
            CfDate::new(2000, 2, 29),
            CfDate::new(2000, 3, 1)
        ]);
    }

    #[test]
    fn test_hours_are_floored_to_days() {
        let axis = TimeAxis::decode("hours since 1950-01-01", Some("365_day"), &[12.0, 36.0]).unwrap();
        assert_eq!(axis.dates, vec![CfDate::new(1950, 1, 1), CfDate::new(1950, 1, 2)]);
    }

    #[test]
    fn test_encode_round_trips_for_360_day() {
        let axis = TimeAxis::decode("days since 1950-01-01", Some("360_day"), &[0.0]).unwrap();
        let offset = axis.encode(CfDate::new(1951, 5, 1)).unwrap();
        assert_eq!(offset, 360.0 + 120.0);
    }

    #[test]
    fn test_unknown_calendar_is_rejected() {
        assert!(Calendar::parse(Some("julian_lunar")).is_err());
        assert!(TimeAxis::decode("days after 1950-01-01", None, &[0.0]).is_err());
    }
}
