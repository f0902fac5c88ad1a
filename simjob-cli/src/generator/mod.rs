//! Actor generator
//!
//! Stamps out a new entity type from a declarative description:
//! - `<models_dir>/<key>.json`: the entity descriptor (SimJob record shape)
//! - `<actors_dir>/<key>.json`: the orchestrator binding
//! - an entry appended to the route registry
//!
//! The registry is read, checked and written back under an exclusive lock.
//! A clash with an existing entry fails with [`SimJobError::DuplicateRoute`]
//! before anything is written. Output is a pure function of the inputs.

mod lock;

use lock::RegistryLock;

use serde::Serialize;
use simjob_core::SimJobError;
use simjob_core::domain::entity::{EntityDescriptor, OrchestratorBinding};
use simjob_core::domain::registry::{RouteEntry, RouteRegistry};
use std::path::{Component, Path, PathBuf};

/// Description of the entity type to generate
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub entity_name: String,
    pub table_name: String,
    pub parent_entity: String,
    pub parent_field: String,
    pub join_column: String,
    pub models_dir: PathBuf,
    pub actors_dir: PathBuf,
    pub routes_file: PathBuf,
    pub options: BindingOptions,
}

/// Optional overrides of the binding defaults
#[derive(Debug, Clone, Default)]
pub struct BindingOptions {
    pub raw_output_extension: Option<String>,
    pub key_column: Option<String>,
    pub value_column: Option<String>,
    pub report_title: Option<String>,
    pub image_asset: Option<PathBuf>,
}

/// What a generation run wrote
#[derive(Debug, Clone)]
pub struct Generated {
    pub entity_key: String,
    pub descriptor_file: PathBuf,
    pub binding_file: PathBuf,
    pub routes: RouteEntry,
}

/// Generates an entity type and registers its routes
pub fn generate(req: &GenerateRequest) -> Result<Generated, SimJobError> {
    let descriptor = EntityDescriptor::new(
        &req.entity_name,
        &req.table_name,
        &req.parent_entity,
        &req.parent_field,
        &req.join_column,
    )?;
    let key = descriptor.entity_key.clone();

    let _lock = RegistryLock::acquire(&req.routes_file)?;
    let mut registry = RouteRegistry::load(&req.routes_file)?;

    let base = registry_dir(&req.routes_file);
    let descriptor_file = req.models_dir.join(format!("{key}.json"));
    let binding_file = req.actors_dir.join(format!("{key}.json"));

    let binding = binding(&descriptor, registry_relative(&descriptor_file, &base)?, &req.options)?;
    let routes = RouteEntry::for_binding(&binding, registry_relative(&binding_file, &base)?);

    // Nothing is written past this point if the entry clashes.
    registry.check_insert(&key, &routes)?;

    write_json(&descriptor_file, &descriptor)?;
    write_json(&binding_file, &binding)?;
    registry.insert(&key, routes.clone())?;
    registry.save(&req.routes_file)?;

    Ok(Generated {
        entity_key: key,
        descriptor_file,
        binding_file,
        routes,
    })
}

fn binding(
    descriptor: &EntityDescriptor,
    descriptor_path: PathBuf,
    options: &BindingOptions,
) -> Result<OrchestratorBinding, SimJobError> {
    let mut binding = OrchestratorBinding::new(descriptor, descriptor_path);

    if let Some(ext) = &options.raw_output_extension {
        let ext = ext.trim().trim_start_matches('.');
        if ext.is_empty() {
            return Err(SimJobError::Validation(
                "raw output extension cannot be empty".into(),
            ));
        }
        binding.raw_output_extension = ext.to_string();
    }
    for (value, target) in [
        (&options.key_column, &mut binding.key_column),
        (&options.value_column, &mut binding.value_column),
        (&options.report_title, &mut binding.report_title),
    ] {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            *target = value.to_string();
        }
    }
    if binding.key_column == binding.value_column {
        return Err(SimJobError::Validation(format!(
            "key and value columns must differ (both '{}')",
            binding.key_column
        )));
    }
    binding.image_asset = options.image_asset.clone();

    Ok(binding)
}

fn registry_dir(routes_file: &Path) -> PathBuf {
    routes_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// `path` relative to the registry directory
///
/// Paths outside the registry directory are stored absolute.
fn registry_relative(path: &Path, base: &Path) -> Result<PathBuf, SimJobError> {
    let path = normalize(path);
    let base = normalize(base);
    if let Ok(relative) = path.strip_prefix(&base) {
        return Ok(relative.to_path_buf());
    }
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir()?;
    Ok(normalize(&cwd.join(path)))
}

/// Drops `.` components
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SimJobError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SimJobError::file(parent, e))?;
    }
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    std::fs::write(path, content).map_err(|e| SimJobError::file(path, e))
}
