//! Registry loading
//!
//! Resolves every registry entry into the entity descriptor and binding it
//! imports. Paths inside the registry and the bindings are relative to the
//! registry file's directory.

use simjob_core::SimJobError;
use simjob_core::domain::entity::{EntityDescriptor, OrchestratorBinding};
use simjob_core::domain::registry::{RouteEntry, RouteRegistry};
use std::path::{Path, PathBuf};

/// One entity type, ready to be served
#[derive(Debug, Clone)]
pub struct LoadedEntity {
    pub descriptor: EntityDescriptor,
    pub binding: OrchestratorBinding,
    pub routes: RouteEntry,
}

/// Loads and resolves every entity of the registry at `routes_file`
pub fn load_entities(routes_file: &Path) -> Result<Vec<LoadedEntity>, SimJobError> {
    let registry = RouteRegistry::load(routes_file)?;
    let base = routes_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut entities = Vec::with_capacity(registry.len());
    for (key, entry) in registry.entities {
        entities.push(resolve(&base, &key, entry)?);
    }

    tracing::info!(
        "Loaded {} entity type(s) from {:?}",
        entities.len(),
        routes_file
    );
    Ok(entities)
}

fn resolve(base: &Path, key: &str, routes: RouteEntry) -> Result<LoadedEntity, SimJobError> {
    let mut binding: OrchestratorBinding = read_json(&base.join(&routes.import))?;
    if binding.entity_key != key {
        return Err(SimJobError::Config(format!(
            "binding {:?} is for '{}', registered as '{}'",
            routes.import, binding.entity_key, key
        )));
    }

    let descriptor: EntityDescriptor = read_json(&base.join(&binding.descriptor))?;
    descriptor.validate()?;
    if descriptor.entity_key != key {
        return Err(SimJobError::Config(format!(
            "descriptor {:?} is for '{}', registered as '{}'",
            binding.descriptor, descriptor.entity_key, key
        )));
    }

    binding.image_asset = binding.image_asset.map(|asset| absolute(base, asset));

    Ok(LoadedEntity {
        descriptor,
        binding,
        routes,
    })
}

fn absolute(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SimJobError> {
    let content = std::fs::read_to_string(path).map_err(|e| SimJobError::file(path, e))?;
    Ok(serde_json::from_str(&content)?)
}
