//! Named computations ("assets") and the inputs they are evaluated with.
//!
//! An asset is registered here and evaluated by an external orchestration
//! engine. The engine resolves each declared input to the result of the
//! upstream asset and calls [`AssetDefinition::compute`].

use crate::error::{DataError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

// ---------------------------------------------------------------------------
// AssetKey
// ---------------------------------------------------------------------------

static KEY_RE: OnceLock<Regex> = OnceLock::new();

fn key_re() -> &'static Regex {
    KEY_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap())
}

/// Validate a name used for assets, jobs and schedules.
pub fn validate_key(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !key_re().is_match(name) {
        return Err(DataError::InvalidKey(name.to_string()));
    }
    Ok(())
}

/// Unique name of an asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_key(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AssetKey {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<AssetKey> for String {
    fn from(key: AssetKey) -> Self {
        key.0
    }
}

// ---------------------------------------------------------------------------
// AssetIn / AssetInputs
// ---------------------------------------------------------------------------

/// Binds a local input name to the upstream asset whose result feeds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetIn {
    pub name: String,
    pub key: AssetKey,
}

/// Upstream results handed to a compute function, keyed by input name.
#[derive(Debug, Clone)]
pub struct AssetInputs {
    asset: AssetKey,
    values: BTreeMap<String, Value>,
}

impl AssetInputs {
    pub fn new(asset: &AssetKey) -> Self {
        Self {
            asset: asset.clone(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look up an input, failing with [`DataError::MissingInput`] if absent.
    pub fn require(&self, name: &str) -> Result<&Value> {
        self.values.get(name).ok_or_else(|| DataError::MissingInput {
            asset: self.asset.to_string(),
            input: name.to_string(),
        })
    }

    /// Read a string field of an input object.
    pub fn require_str(&self, name: &str, field: &str) -> Result<&str> {
        self.require(name)?
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| DataError::MalformedInput {
                asset: self.asset.to_string(),
                input: name.to_string(),
                reason: format!("expected string field '{field}'"),
            })
    }
}

// ---------------------------------------------------------------------------
// AssetDefinition
// ---------------------------------------------------------------------------

pub type ComputeFn = Arc<dyn Fn(&AssetInputs) -> Result<Value> + Send + Sync>;

/// A registered computation: key, declared inputs and the function itself.
#[derive(Clone)]
pub struct AssetDefinition {
    pub key: AssetKey,
    pub description: Option<String>,
    pub ins: Vec<AssetIn>,
    compute: ComputeFn,
}

impl AssetDefinition {
    pub fn new<F>(key: AssetKey, compute: F) -> Self
    where
        F: Fn(&AssetInputs) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            key,
            description: None,
            ins: Vec::new(),
            compute: Arc::new(compute),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Declare an input named `name` fed by the asset `upstream`.
    pub fn input(mut self, name: impl Into<String>, upstream: AssetKey) -> Self {
        self.ins.push(AssetIn {
            name: name.into(),
            key: upstream,
        });
        self
    }

    /// Keys of the assets this one depends on, in declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &AssetKey> {
        self.ins.iter().map(|i| &i.key)
    }

    /// Evaluate the asset. Every declared input must be present.
    pub fn compute(&self, inputs: &AssetInputs) -> Result<Value> {
        for input in &self.ins {
            inputs.require(&input.name)?;
        }
        (self.compute)(inputs)
    }
}

impl fmt::Debug for AssetDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetDefinition")
            .field("key", &self.key)
            .field("description", &self.description)
            .field("ins", &self.ins)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> AssetKey {
        AssetKey::new(name).unwrap()
    }

    #[test]
    fn valid_keys() {
        for name in ["sample_data", "a", "processed_data_2", "x1"] {
            AssetKey::new(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_keys() {
        for name in ["", "_leading", "1abc", "has space", "UPPER", "a-b"] {
            assert!(AssetKey::new(name).is_err(), "expected invalid: {name}");
        }
        assert!(AssetKey::new("a".repeat(65)).is_err());
    }

    #[test]
    fn key_deserialization_validates() {
        let ok: AssetKey = serde_json::from_str("\"sample_data\"").unwrap();
        assert_eq!(ok.as_str(), "sample_data");
        assert!(serde_json::from_str::<AssetKey>("\"Bad Key\"").is_err());
    }

    #[test]
    fn compute_rejects_missing_declared_input() {
        let asset = AssetDefinition::new(key("derived"), |_| Ok(json!(null)))
            .input("source", key("source"));
        let err = asset.compute(&AssetInputs::new(&asset.key)).unwrap_err();
        assert!(matches!(err, DataError::MissingInput { ref input, .. } if input == "source"));
    }

    #[test]
    fn require_str_reports_malformed_input() {
        let inputs = AssetInputs::new(&key("derived")).with("source", json!({"status": 3}));
        let err = inputs.require_str("source", "status").unwrap_err();
        assert!(matches!(err, DataError::MalformedInput { .. }));
    }

    #[test]
    fn dependencies_follow_declaration_order() {
        let asset = AssetDefinition::new(key("c"), |_| Ok(json!(1)))
            .input("first", key("b"))
            .input("second", key("a"));
        let deps: Vec<&str> = asset.dependencies().map(AssetKey::as_str).collect();
        assert_eq!(deps, vec!["b", "a"]);
    }
}
