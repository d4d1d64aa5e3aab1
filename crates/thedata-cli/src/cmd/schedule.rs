use crate::output::{print_json, print_table};
use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thedata_core::repository::thedata_repository;

#[derive(Serialize)]
struct UpcomingTicks {
    name: String,
    job: String,
    cron: String,
    upcoming: Vec<DateTime<Utc>>,
}

/// Print the next `count` fire times of each schedule (or just `name`).
pub fn run(name: Option<&str>, count: usize, after: Option<DateTime<Utc>>, json: bool) -> Result<()> {
    let defs = thedata_repository()?;
    let after = after.unwrap_or_else(Utc::now);

    let ticks: Vec<UpcomingTicks> = defs
        .schedules()
        .filter(|s| name.map_or(true, |n| n == s.name))
        .map(|s| UpcomingTicks {
            name: s.name.clone(),
            job: s.job_name.clone(),
            cron: s.cron.to_string(),
            upcoming: s.cron.upcoming(&after, count),
        })
        .collect();

    if let (Some(name), true) = (name, ticks.is_empty()) {
        bail!("schedule not found: {name}");
    }

    if json {
        return print_json(&ticks);
    }

    let rows: Vec<Vec<String>> = ticks
        .iter()
        .flat_map(|t| {
            t.upcoming.iter().map(|at| {
                vec![
                    t.name.clone(),
                    t.job.clone(),
                    at.to_rfc3339_opts(SecondsFormat::Secs, true),
                ]
            })
        })
        .collect();
    print_table(&["SCHEDULE", "JOB", "NEXT RUN (UTC)"], &rows);
    Ok(())
}
