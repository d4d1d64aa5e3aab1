//! The registration surface: everything an orchestration runtime needs to
//! discover assets, jobs and schedules.

use crate::asset::{AssetDefinition, AssetKey};
use crate::error::{DataError, Result};
use crate::graph::AssetGraph;
use crate::job::JobDefinition;
use crate::schedule::ScheduleDefinition;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Definitions {
    pub name: String,
    graph: AssetGraph,
    jobs: BTreeMap<String, JobDefinition>,
    schedules: BTreeMap<String, ScheduleDefinition>,
}

impl Definitions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: AssetGraph::new(),
            jobs: BTreeMap::new(),
            schedules: BTreeMap::new(),
        }
    }

    pub fn asset(mut self, asset: AssetDefinition) -> Result<Self> {
        self.graph.add(asset)?;
        Ok(self)
    }

    pub fn job(mut self, job: JobDefinition) -> Result<Self> {
        if self.jobs.contains_key(&job.name) {
            return Err(DataError::JobExists(job.name));
        }
        self.jobs.insert(job.name.clone(), job);
        Ok(self)
    }

    pub fn schedule(mut self, schedule: ScheduleDefinition) -> Result<Self> {
        if self.schedules.contains_key(&schedule.name) {
            return Err(DataError::ScheduleExists(schedule.name));
        }
        self.schedules.insert(schedule.name.clone(), schedule);
        Ok(self)
    }

    pub fn graph(&self) -> &AssetGraph {
        &self.graph
    }

    pub fn get_job(&self, name: &str) -> Result<&JobDefinition> {
        self.jobs
            .get(name)
            .ok_or_else(|| DataError::JobNotFound(name.to_string()))
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobDefinition> {
        self.jobs.values()
    }

    pub fn schedules(&self) -> impl Iterator<Item = &ScheduleDefinition> {
        self.schedules.values()
    }

    /// Check the asset graph, job selections and schedule targets.
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        for job in self.jobs.values() {
            for key in &job.selection {
                if !self.graph.contains(key) {
                    return Err(DataError::UnknownSelection {
                        job: job.name.clone(),
                        asset: key.to_string(),
                    });
                }
            }
        }
        for schedule in self.schedules.values() {
            self.get_job(&schedule.job_name)?;
        }
        Ok(())
    }

    /// Assets in the order `job` should materialize them.
    pub fn job_plan(&self, job: &str) -> Result<Vec<AssetKey>> {
        let job = self.get_job(job)?;
        self.graph.topological_order(&job.selection)
    }

    /// Serializable summary of everything registered.
    pub fn describe(&self) -> Result<DefinitionsSummary> {
        let assets = self
            .graph
            .assets()
            .map(|a| AssetSummary {
                key: a.key.clone(),
                description: a.description.clone(),
                inputs: a
                    .ins
                    .iter()
                    .map(|i| (i.name.clone(), i.key.clone()))
                    .collect(),
            })
            .collect();

        let jobs = self
            .jobs
            .values()
            .map(|j| {
                Ok(JobSummary {
                    name: j.name.clone(),
                    selection: self.graph.topological_order(&j.selection)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let schedules = self
            .schedules
            .values()
            .map(|s| ScheduleSummary {
                name: s.name.clone(),
                job: s.job_name.clone(),
                cron: s.cron.as_str().to_string(),
            })
            .collect();

        Ok(DefinitionsSummary {
            name: self.name.clone(),
            assets,
            jobs,
            schedules,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DefinitionsSummary {
    pub name: String,
    pub assets: Vec<AssetSummary>,
    pub jobs: Vec<JobSummary>,
    pub schedules: Vec<ScheduleSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub key: AssetKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input name → upstream asset key.
    pub inputs: BTreeMap<String, AssetKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub selection: Vec<AssetKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub name: String,
    pub job: String,
    pub cron: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
