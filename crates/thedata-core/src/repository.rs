//! The `thedata_repository` definitions: two sample assets, a job that
//! materializes both and a schedule that runs the job every 15 minutes.

use crate::asset::{AssetDefinition, AssetInputs, AssetKey};
use crate::definitions::Definitions;
use crate::error::Result;
use crate::job::JobDefinition;
use crate::schedule::ScheduleDefinition;
use serde_json::{json, Value};

pub const REPOSITORY_NAME: &str = "thedata_repository";
pub const SAMPLE_DATA: &str = "sample_data";
pub const PROCESSED_DATA: &str = "processed_data";
pub const SAMPLE_JOB: &str = "sample_job";
pub const SAMPLE_CRON: &str = "*/15 * * * *";

/// Source asset with no dependencies.
pub fn sample_data() -> Result<AssetDefinition> {
    Ok(AssetDefinition::new(AssetKey::new(SAMPLE_DATA)?, |_| {
        Ok(sample_data_value())
    })
    .description("A sample data asset that demonstrates asset functionality."))
}

fn sample_data_value() -> Value {
    json!({ "status": "ok", "message": "Sample data asset is working" })
}

/// Derived asset reading `sample_data` through its `source_data` input.
pub fn processed_data() -> Result<AssetDefinition> {
    Ok(
        AssetDefinition::new(AssetKey::new(PROCESSED_DATA)?, process)
            .description("A sample processing asset that depends on sample_data.")
            .input("source_data", AssetKey::new(SAMPLE_DATA)?),
    )
}

fn process(inputs: &AssetInputs) -> Result<Value> {
    let status = inputs.require_str("source_data", "status")?;
    let message = inputs.require_str("source_data", "message")?;
    Ok(json!({
        "status": "processed",
        "source_status": status,
        "message": format!("Processed: {message}"),
    }))
}

pub fn sample_job() -> Result<JobDefinition> {
    JobDefinition::new(
        SAMPLE_JOB,
        vec![AssetKey::new(SAMPLE_DATA)?, AssetKey::new(PROCESSED_DATA)?],
    )
}

pub fn sample_schedule() -> Result<ScheduleDefinition> {
    ScheduleDefinition::new(SAMPLE_JOB, SAMPLE_CRON)
}

/// Build and validate the repository.
pub fn thedata_repository() -> Result<Definitions> {
    let defs = Definitions::new(REPOSITORY_NAME)
        .asset(sample_data()?)?
        .asset(processed_data()?)?
        .job(sample_job()?)?
        .schedule(sample_schedule()?)?;
    defs.validate()?;
    Ok(defs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;

    #[test]
    fn repository_is_valid() {
        let defs = thedata_repository().unwrap();
        assert_eq!(defs.name, REPOSITORY_NAME);
        assert_eq!(defs.graph().len(), 2);
        assert_eq!(defs.jobs().count(), 1);
        assert_eq!(defs.schedules().count(), 1);
    }

    #[test]
    fn sample_data_has_no_dependencies() {
        let asset = sample_data().unwrap();
        assert!(asset.ins.is_empty());
        let value = asset.compute(&AssetInputs::new(&asset.key)).unwrap();
        assert_eq!(
            value,
            json!({ "status": "ok", "message": "Sample data asset is working" })
        );
    }

    #[test]
    fn processed_data_derives_from_source() {
        let asset = processed_data().unwrap();
        let inputs = AssetInputs::new(&asset.key).with(
            "source_data",
            json!({ "status": "ok", "message": "Sample data asset is working" }),
        );
        assert_eq!(
            asset.compute(&inputs).unwrap(),
            json!({
                "status": "processed",
                "source_status": "ok",
                "message": "Processed: Sample data asset is working",
            })
        );
    }

    #[test]
    fn processed_data_without_source_fails() {
        let asset = processed_data().unwrap();
        let err = asset.compute(&AssetInputs::new(&asset.key)).unwrap_err();
        assert!(matches!(err, DataError::MissingInput { .. }));
    }

    #[test]
    fn job_plan_runs_source_first() {
        let defs = thedata_repository().unwrap();
        let plan: Vec<String> = defs
            .job_plan(SAMPLE_JOB)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(plan, vec![SAMPLE_DATA, PROCESSED_DATA]);
    }

    #[test]
    fn schedule_targets_sample_job() {
        let schedule = sample_schedule().unwrap();
        assert_eq!(schedule.job_name, SAMPLE_JOB);
        assert_eq!(schedule.cron.as_str(), SAMPLE_CRON);
    }
}
