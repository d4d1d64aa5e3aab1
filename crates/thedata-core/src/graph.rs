//! Directed acyclic graph of assets.
//!
//! Nodes are [`AssetDefinition`]s, edges are the upstream keys each asset
//! declares as inputs. The graph is plain data: an external engine reads the
//! order from it and does the evaluating.

use crate::asset::{AssetDefinition, AssetKey};
use crate::error::{DataError, Result};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct AssetGraph {
    assets: BTreeMap<AssetKey, AssetDefinition>,
}

impl AssetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset. Keys are unique within a graph.
    pub fn add(&mut self, asset: AssetDefinition) -> Result<()> {
        if self.assets.contains_key(&asset.key) {
            return Err(DataError::AssetExists(asset.key.to_string()));
        }
        self.assets.insert(asset.key.clone(), asset);
        Ok(())
    }

    pub fn get(&self, key: &AssetKey) -> Result<&AssetDefinition> {
        self.assets
            .get(key)
            .ok_or_else(|| DataError::AssetNotFound(key.to_string()))
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.assets.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets in key order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetDefinition> {
        self.assets.values()
    }

    /// Direct dependencies of `key`.
    pub fn upstream(&self, key: &AssetKey) -> Result<Vec<AssetKey>> {
        let asset = self.get(key)?;
        let deps: BTreeSet<AssetKey> = asset.dependencies().cloned().collect();
        Ok(deps.into_iter().collect())
    }

    /// Assets that declare `key` as a direct dependency.
    pub fn downstream(&self, key: &AssetKey) -> Result<Vec<AssetKey>> {
        self.get(key)?;
        Ok(self
            .assets
            .values()
            .filter(|a| a.dependencies().any(|d| d == key))
            .map(|a| a.key.clone())
            .collect())
    }

    /// Check that every dependency is registered and that there are no cycles.
    pub fn validate(&self) -> Result<()> {
        for asset in self.assets.values() {
            for dep in asset.dependencies() {
                if !self.assets.contains_key(dep) {
                    return Err(DataError::UnknownDependency {
                        asset: asset.key.to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }
        self.full_order().map(|_| ())
    }

    /// Order `selection` so every asset comes after the assets it depends on,
    /// directly or through unselected assets. Ties are broken by key.
    pub fn topological_order(&self, selection: &[AssetKey]) -> Result<Vec<AssetKey>> {
        for key in selection {
            self.get(key)?;
        }
        let wanted: BTreeSet<&AssetKey> = selection.iter().collect();
        Ok(self
            .full_order()?
            .into_iter()
            .filter(|k| wanted.contains(k))
            .collect())
    }

    // Kahn's algorithm over the registered assets. Dependencies on unknown
    // assets are ignored here; `validate` reports them.
    fn full_order(&self) -> Result<Vec<AssetKey>> {
        let mut remaining: BTreeMap<&AssetKey, BTreeSet<&AssetKey>> = self
            .assets
            .values()
            .map(|a| {
                let deps = a
                    .dependencies()
                    .filter(|d| self.assets.contains_key(*d))
                    .collect();
                (&a.key, deps)
            })
            .collect();

        let mut order = Vec::with_capacity(remaining.len());
        loop {
            let ready: Vec<&AssetKey> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(k, _)| *k)
                .collect();
            let Some(next) = ready.first().copied() else {
                break;
            };
            remaining.remove(next);
            for deps in remaining.values_mut() {
                deps.remove(next);
            }
            order.push(next.clone());
        }

        if !remaining.is_empty() {
            let stuck: Vec<&str> = remaining.keys().map(|k| k.as_str()).collect();
            return Err(DataError::CycleDetected(stuck.join(", ")));
        }
        Ok(order)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
