use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid key '{0}': must be lowercase alphanumeric with underscores, starting with a letter")]
    InvalidKey(String),

    #[error("asset already exists: {0}")]
    AssetExists(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("asset '{asset}' depends on unknown asset '{dependency}'")]
    UnknownDependency { asset: String, dependency: String },

    #[error("dependency cycle involving: {0}")]
    CycleDetected(String),

    #[error("job already exists: {0}")]
    JobExists(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("job '{job}' selects unknown asset '{asset}'")]
    UnknownSelection { job: String, asset: String },

    #[error("schedule already exists: {0}")]
    ScheduleExists(String),

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("asset '{asset}' is missing input '{input}'")]
    MissingInput { asset: String, input: String },

    #[error("asset '{asset}' received malformed input '{input}': {reason}")]
    MalformedInput {
        asset: String,
        input: String,
        reason: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;
