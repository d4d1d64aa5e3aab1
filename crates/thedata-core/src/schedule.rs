//! Cron-driven schedules bound to jobs.
//!
//! A [`ScheduleDefinition`] only records *when* a job should run. Firing it
//! is up to the external scheduler; [`CronSchedule::next_after`] exists so
//! the registration surface can show upcoming ticks. All times are UTC.

use crate::asset::validate_key;
use crate::error::{DataError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// CronSchedule
// ---------------------------------------------------------------------------

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];
const DAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

// Give up looking for a match this many years past the start.
const SEARCH_YEARS: i32 = 5;

/// A parsed five-field cron expression: minute, hour, day of month, month,
/// day of week.
///
/// Each field is a bitmask of allowed values. When both day fields are
/// restricted (neither starts with `*`), a day matches if either does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CronSchedule {
    expr: String,
    minutes: u64,
    hours: u64,
    days_of_month: u64,
    months: u64,
    days_of_week: u64,
    dom_restricted: bool,
    dow_restricted: bool,
}

struct CronField {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    // Offset added to a name's index to get its value.
    name_base: u32,
}

const MINUTE: CronField = CronField {
    name: "minute",
    min: 0,
    max: 59,
    names: &[],
    name_base: 0,
};
const HOUR: CronField = CronField {
    name: "hour",
    min: 0,
    max: 23,
    names: &[],
    name_base: 0,
};
const DAY_OF_MONTH: CronField = CronField {
    name: "day of month",
    min: 1,
    max: 31,
    names: &[],
    name_base: 0,
};
const MONTH: CronField = CronField {
    name: "month",
    min: 1,
    max: 12,
    names: &MONTH_NAMES,
    name_base: 1,
};
const DAY_OF_WEEK: CronField = CronField {
    name: "day of week",
    min: 0,
    max: 7,
    names: &DAY_NAMES,
    name_base: 0,
};

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: String| DataError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid(format!("expected 5 fields, found {}", fields.len())));
        }

        let minutes = parse_field(fields[0], &MINUTE).map_err(invalid)?;
        let hours = parse_field(fields[1], &HOUR).map_err(invalid)?;
        let days_of_month = parse_field(fields[2], &DAY_OF_MONTH).map_err(invalid)?;
        let months = parse_field(fields[3], &MONTH).map_err(invalid)?;
        let mut days_of_week = parse_field(fields[4], &DAY_OF_WEEK).map_err(invalid)?;
        // 7 is an alias for Sunday.
        if days_of_week & (1 << 7) != 0 {
            days_of_week = (days_of_week & !(1 << 7)) | 1;
        }

        Ok(Self {
            expr: fields.join(" "),
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: !fields[2].starts_with('*'),
            dow_restricted: !fields[4].starts_with('*'),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// True if `t` (to the minute) matches the expression.
    pub fn matches(&self, t: &DateTime<Utc>) -> bool {
        let n = t.naive_utc();
        self.month_matches(n.date())
            && self.day_matches(n.date())
            && bit(self.hours, n.hour())
            && bit(self.minutes, n.minute())
    }

    /// First whole minute strictly after `after` that matches, or `None` if
    /// nothing matches within the search horizon (e.g. `0 0 30 2 *`).
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.naive_utc();
        let mut t =
            start.date().and_hms_opt(start.hour(), start.minute(), 0)? + Duration::minutes(1);
        let horizon = start.year() + SEARCH_YEARS;

        while t.year() <= horizon {
            let date = t.date();
            if !self.month_matches(date) {
                t = first_of_next_month(date)?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.day_matches(date) {
                t = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !bit(self.hours, t.hour()) {
                t = truncate_to_hour(t)? + Duration::hours(1);
                continue;
            }
            if !bit(self.minutes, t.minute()) {
                t += Duration::minutes(1);
                continue;
            }
            return Some(t.and_utc());
        }
        None
    }

    /// The next `count` fire times after `after`.
    pub fn upcoming(&self, after: &DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut cursor = *after;
        while out.len() < count {
            match self.next_after(&cursor) {
                Some(next) => {
                    out.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        out
    }

    fn month_matches(&self, date: NaiveDate) -> bool {
        bit(self.months, date.month())
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = bit(self.days_of_month, date.day());
        let dow = bit(self.days_of_week, date.weekday().num_days_from_sunday());
        if self.dom_restricted && self.dow_restricted {
            dom || dow
        } else {
            dom && dow
        }
    }
}

impl FromStr for CronSchedule {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CronSchedule {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CronSchedule> for String {
    fn from(cron: CronSchedule) -> Self {
        cron.expr
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn bit(mask: u64, value: u32) -> bool {
    mask & (1u64 << value) != 0
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

fn truncate_to_hour(t: NaiveDateTime) -> Option<NaiveDateTime> {
    t.date().and_hms_opt(t.hour(), 0, 0)
}

fn parse_field(field: &str, field_def: &CronField) -> std::result::Result<u64, String> {
    let mut mask = 0u64;
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("invalid step '{step}' in {} field", field_def.name))?;
                if step == 0 || step > field_def.max {
                    return Err(format!(
                        "step must be between 1 and {} in {} field",
                        field_def.max, field_def.name
                    ));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (lo, hi) = if range == "*" {
            (field_def.min, field_def.max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, field_def)?, parse_value(b, field_def)?)
        } else {
            let v = parse_value(range, field_def)?;
            // `5/10` means "from 5 to the end, every 10".
            (v, if step.is_some() { field_def.max } else { v })
        };
        if lo > hi {
            return Err(format!("range {lo}-{hi} is reversed in {} field", field_def.name));
        }

        for v in (lo..=hi).step_by(step.unwrap_or(1) as usize) {
            mask |= 1u64 << v;
        }
    }
    Ok(mask)
}

fn parse_value(raw: &str, field_def: &CronField) -> std::result::Result<u32, String> {
    let lower = raw.to_ascii_lowercase();
    let value = match field_def.names.iter().position(|n| *n == lower) {
        Some(i) => i as u32 + field_def.name_base,
        None => raw
            .parse()
            .map_err(|_| format!("invalid value '{raw}' in {} field", field_def.name))?,
    };
    if value < field_def.min || value > field_def.max {
        return Err(format!(
            "value {value} out of range {}-{} in {} field",
            field_def.min, field_def.max, field_def.name
        ));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// ScheduleDefinition
// ---------------------------------------------------------------------------

/// Fires a job on a cron expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDefinition {
    pub name: String,
    pub job_name: String,
    pub cron: CronSchedule,
}

impl ScheduleDefinition {
    /// Schedule `job_name` on `cron`, named `<job_name>_schedule`.
    pub fn new(job_name: impl Into<String>, cron: &str) -> Result<Self> {
        let job_name = job_name.into();
        let name = format!("{job_name}_schedule");
        Self::named(name, job_name, cron)
    }

    pub fn named(name: impl Into<String>, job_name: impl Into<String>, cron: &str) -> Result<Self> {
        let name = name.into();
        let job_name = job_name.into();
        validate_key(&name)?;
        validate_key(&job_name)?;
        Ok(Self {
            name,
            job_name,
            cron: CronSchedule::parse(cron)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn every_fifteen_minutes() {
        let cron = CronSchedule::parse("*/15 * * * *").unwrap();
        let ticks = cron.upcoming(&at(2024, 3, 1, 10, 7), 5);
        assert_eq!(
            ticks,
            vec![
                at(2024, 3, 1, 10, 15),
                at(2024, 3, 1, 10, 30),
                at(2024, 3, 1, 10, 45),
                at(2024, 3, 1, 11, 0),
                at(2024, 3, 1, 11, 15),
            ]
        );
    }

    #[test]
    fn next_is_strictly_after() {
        let cron = CronSchedule::parse("*/15 * * * *").unwrap();
        assert_eq!(
            cron.next_after(&at(2024, 3, 1, 10, 15)),
            Some(at(2024, 3, 1, 10, 30))
        );
        let mid_minute = at(2024, 3, 1, 10, 14) + Duration::seconds(59);
        assert_eq!(cron.next_after(&mid_minute), Some(at(2024, 3, 1, 10, 15)));
    }

    #[test]
    fn rolls_over_year_end() {
        let cron = CronSchedule::parse("30 2 1 jan *").unwrap();
        assert_eq!(
            cron.next_after(&at(2024, 6, 1, 0, 0)),
            Some(at(2025, 1, 1, 2, 30))
        );
    }

    #[test]
    fn day_fields_combine_with_or_when_both_restricted() {
        // 13th of the month or any Friday.
        let cron = CronSchedule::parse("0 0 13 * 5").unwrap();
        // 2024-09-01 is a Sunday; the next Friday is the 6th.
        assert_eq!(
            cron.next_after(&at(2024, 9, 1, 0, 0)),
            Some(at(2024, 9, 6, 0, 0))
        );
        assert!(cron.matches(&at(2024, 9, 13, 0, 0)));
    }

    #[test]
    fn sunday_alias() {
        let seven = CronSchedule::parse("0 12 * * 7").unwrap();
        let zero = CronSchedule::parse("0 12 * * sun").unwrap();
        // 2024-09-08 is a Sunday.
        assert!(seven.matches(&at(2024, 9, 8, 12, 0)));
        assert!(zero.matches(&at(2024, 9, 8, 12, 0)));
        assert!(!seven.matches(&at(2024, 9, 9, 12, 0)));
    }

    #[test]
    fn lists_ranges_and_steps() {
        let cron = CronSchedule::parse("0,30 9-17/4 * * mon-fri").unwrap();
        assert!(cron.matches(&at(2024, 9, 9, 9, 30)));
        assert!(cron.matches(&at(2024, 9, 9, 13, 0)));
        assert!(cron.matches(&at(2024, 9, 9, 17, 0)));
        assert!(!cron.matches(&at(2024, 9, 9, 11, 0)));
        assert!(!cron.matches(&at(2024, 9, 8, 9, 0)));
    }

    #[test]
    fn largest_step_selects_only_the_start() {
        let cron = CronSchedule::parse("7/59 * * * *").unwrap();
        assert!(cron.matches(&at(2024, 3, 1, 10, 7)));
        assert!(!cron.matches(&at(2024, 3, 1, 10, 8)));
    }

    #[test]
    fn upcoming_with_huge_count_stops_when_nothing_matches() {
        let cron = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert!(cron.upcoming(&at(2024, 1, 1, 0, 0), usize::MAX).is_empty());
    }

    #[test]
    fn impossible_date_yields_none() {
        let cron = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert_eq!(cron.next_after(&at(2024, 1, 1, 0, 0)), None);
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in [
            "* * * *",
            "* * * * * *",
            "60 * * * *",
            "* 24 * * *",
            "* * 0 * *",
            "* * * 13 *",
            "*/0 * * * *",
            "5-1 * * * *",
            "abc * * * *",
            "1-59/4294967295 * * * *",
            "*/60 * * * *",
            "* */25 * * *",
        ] {
            assert!(CronSchedule::parse(expr).is_err(), "expected invalid: {expr}");
        }
    }

    #[test]
    fn expression_is_normalized_and_serialized_as_string() {
        let cron = CronSchedule::parse("  */15  * * * * ").unwrap();
        assert_eq!(cron.as_str(), "*/15 * * * *");
        assert_eq!(serde_json::to_string(&cron).unwrap(), "\"*/15 * * * *\"");
    }

    #[test]
    fn schedule_default_name() {
        let schedule = ScheduleDefinition::new("sample_job", "*/15 * * * *").unwrap();
        assert_eq!(schedule.name, "sample_job_schedule");
        assert_eq!(schedule.job_name, "sample_job");
    }
}
