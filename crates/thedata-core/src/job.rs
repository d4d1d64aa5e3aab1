use crate::asset::{validate_key, AssetKey};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A named selection of assets that are materialized together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub selection: Vec<AssetKey>,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, selection: Vec<AssetKey>) -> Result<Self> {
        let name = name.into();
        validate_key(&name)?;
        Ok(Self { name, selection })
    }
}
