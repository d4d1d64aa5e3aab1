use crate::output::{dash_if_empty, print_json, print_table};
use anyhow::Result;
use thedata_core::repository::thedata_repository;

/// Print the registration surface of `thedata_repository`.
pub fn run(json: bool) -> Result<()> {
    let summary = thedata_repository()?.describe()?;
    if json {
        return print_json(&summary);
    }

    println!("Repository: {}\n", summary.name);

    let assets: Vec<Vec<String>> = summary
        .assets
        .iter()
        .map(|a| {
            let deps: Vec<String> = a
                .inputs
                .iter()
                .map(|(name, key)| format!("{name}<-{key}"))
                .collect();
            vec![
                a.key.to_string(),
                dash_if_empty(&deps.join(", ")),
                dash_if_empty(a.description.as_deref().unwrap_or_default()),
            ]
        })
        .collect();
    print_table(&["ASSET", "INPUTS", "DESCRIPTION"], &assets);
    println!();

    let jobs: Vec<Vec<String>> = summary
        .jobs
        .iter()
        .map(|j| {
            let selection: Vec<&str> = j.selection.iter().map(|k| k.as_str()).collect();
            vec![j.name.clone(), selection.join(" -> ")]
        })
        .collect();
    print_table(&["JOB", "SELECTION"], &jobs);
    println!();

    let schedules: Vec<Vec<String>> = summary
        .schedules
        .iter()
        .map(|s| vec![s.name.clone(), s.job.clone(), s.cron.clone()])
        .collect();
    print_table(&["SCHEDULE", "JOB", "CRON"], &schedules);
    Ok(())
}
