//! Route registry
//!
//! The registry is the shared, append-only list of entity types the
//! orchestrator serves. Each entry points at the entity's binding file (its
//! "import") and lists the operation routes to mount. Adding an entry whose
//! key, handler name or path is already registered fails with
//! [`SimJobError::DuplicateRoute`]; nothing is ever overwritten.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::entity::{Operation, OrchestratorBinding};
use crate::error::SimJobError;

/// Registry of every entity type and its routes, keyed by entity key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRegistry {
    #[serde(default)]
    pub entities: BTreeMap<String, RouteEntry>,
}

/// Routes registered for one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Binding file, relative to the registry file's directory
    pub import: PathBuf,
    pub routes: Vec<RoutePath>,
}

/// One mounted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePath {
    pub operation: Operation,
    /// Handler name, e.g. `run_coverage_sim_job`
    pub name: String,
    pub method: String,
    pub path: String,
}

impl RouteEntry {
    /// Routes for every operation of a binding, mounted under `/{entity_key}`
    pub fn for_binding(binding: &OrchestratorBinding, import: PathBuf) -> Self {
        let routes = Operation::ALL
            .iter()
            .map(|op| RoutePath {
                operation: *op,
                name: binding
                    .operations
                    .get(op)
                    .cloned()
                    .unwrap_or_else(|| op.handler_name(&binding.entity_key)),
                method: "POST".to_string(),
                path: format!("/{}/{}", binding.entity_key, op.path_segment()),
            })
            .collect();

        Self { import, routes }
    }

    pub fn route(&self, operation: Operation) -> Option<&RoutePath> {
        self.routes.iter().find(|r| r.operation == operation)
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&RouteEntry> {
        self.entities.get(key)
    }

    /// Whether a handler name is registered under any entity
    pub fn contains_route(&self, name: &str) -> bool {
        self.entities
            .values()
            .flat_map(|e| e.routes.iter())
            .any(|r| r.name == name)
    }

    fn contains_path(&self, path: &str) -> bool {
        self.entities
            .values()
            .flat_map(|e| e.routes.iter())
            .any(|r| r.path == path)
    }

    /// Checks that `entry` can be added under `key` without clashing
    pub fn check_insert(&self, key: &str, entry: &RouteEntry) -> Result<(), SimJobError> {
        if self.entities.contains_key(key) {
            return Err(SimJobError::DuplicateRoute(format!(
                "entity '{key}' is already registered"
            )));
        }
        for route in &entry.routes {
            if self.contains_route(&route.name) {
                return Err(SimJobError::DuplicateRoute(format!(
                    "route name '{}' is already registered",
                    route.name
                )));
            }
            if self.contains_path(&route.path) {
                return Err(SimJobError::DuplicateRoute(format!(
                    "route path '{}' is already registered",
                    route.path
                )));
            }
        }
        Ok(())
    }

    /// Adds an entry; fails on any duplicate key, name or path
    pub fn insert(&mut self, key: &str, entry: RouteEntry) -> Result<(), SimJobError> {
        self.check_insert(key, &entry)?;
        self.entities.insert(key.to_string(), entry);
        Ok(())
    }

    pub fn from_json(content: &str) -> Result<Self, SimJobError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(content)?)
    }

    /// Pretty JSON with a trailing newline; entity keys are sorted
    pub fn to_json(&self) -> Result<String, SimJobError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Loads a registry file; a missing file is an empty registry
    pub fn load(path: &Path) -> Result<Self, SimJobError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SimJobError::file(path, e)),
        }
    }

    /// Writes the whole registry back out, replacing the file atomically
    pub fn save(&self, path: &Path) -> Result<(), SimJobError> {
        let content = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SimJobError::file(parent, e))?;
        }
        std::fs::write(&tmp, content).map_err(|e| SimJobError::file(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| SimJobError::file(path, e))?;
        Ok(())
    }
}
