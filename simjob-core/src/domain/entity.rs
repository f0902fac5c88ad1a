//! Entity descriptors
//!
//! One generic orchestrator serves every simulation entity type (coverage,
//! handover, routing, beam hopping, ...). What distinguishes the types is
//! captured declaratively here: an [`EntityDescriptor`] describes the job
//! record of the type, an [`OrchestratorBinding`] binds it to the runner,
//! ingestor and renderer contracts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::SimJobError;

/// Declarative description of one entity type's job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Display name, e.g. `Beam Hopping`
    pub entity_name: String,
    /// Snake-case key derived from the display name, e.g. `beam_hopping`
    pub entity_key: String,
    /// Backing table of the parameter records
    pub table_name: String,
    /// Backing table of the job records
    pub job_table: String,
    /// Upstream entity the records join to
    pub parent_entity: String,
    /// Name of the parent reference field on the job record
    pub parent_field: String,
    /// Column used for the join
    pub join_column: String,
    /// Ordered job record fields
    pub fields: Vec<FieldSpec>,
}

/// One field of a job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub nullable: bool,
    /// `table.column` this field references, for foreign keys
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub references: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Uuid,
    Status,
    Path,
    Json,
    Timestamp,
}

/// Operations exposed per entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Run,
    Poll,
    Download,
    DeleteResult,
    DeleteJob,
}

/// Binding of an entity type to the runner, ingestor and renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorBinding {
    pub entity_key: String,
    /// Descriptor file, relative to the binding's registry
    pub descriptor: PathBuf,
    /// Extension of the simulator's raw output file, without the dot
    pub raw_output_extension: String,
    /// Column holding the break/key of each row
    pub key_column: String,
    /// Column holding the numeric value of each row
    pub value_column: String,
    pub report_title: String,
    /// Static image used on page 2 when the simulator leaves no plot
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_asset: Option<PathBuf>,
    /// Handler name per operation
    pub operations: BTreeMap<Operation, String>,
}

pub const DEFAULT_RAW_OUTPUT_EXTENSION: &str = "csv";
pub const DEFAULT_KEY_COLUMN: &str = "break";
pub const DEFAULT_VALUE_COLUMN: &str = "value";

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Run,
        Operation::Poll,
        Operation::Download,
        Operation::DeleteResult,
        Operation::DeleteJob,
    ];

    /// Handler name for an entity key, e.g. `run_coverage_sim_job`
    pub fn handler_name(self, key: &str) -> String {
        match self {
            Operation::Create => format!("create_{key}"),
            Operation::Run => format!("run_{key}_sim_job"),
            Operation::Poll => format!("poll_{key}_sim_job"),
            Operation::Download => format!("download_{key}_sim_result"),
            Operation::DeleteResult => format!("delete_{key}_sim_result"),
            Operation::DeleteJob => format!("delete_{key}_sim_job"),
        }
    }

    /// Last path segment of the operation's route
    pub fn path_segment(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Run => "run",
            Operation::Poll => "poll",
            Operation::Download => "download",
            Operation::DeleteResult => "delete_result",
            Operation::DeleteJob => "delete_job",
        }
    }
}

impl EntityDescriptor {
    /// Builds the descriptor of a new entity type
    pub fn new(
        entity_name: &str,
        table_name: &str,
        parent_entity: &str,
        parent_field: &str,
        join_column: &str,
    ) -> Result<Self, SimJobError> {
        let entity_key = to_snake_case(entity_name);
        let descriptor = Self {
            entity_name: entity_name.trim().to_string(),
            job_table: format!("{}_sim_job", table_name.trim()),
            table_name: table_name.trim().to_string(),
            parent_entity: parent_entity.trim().to_string(),
            parent_field: parent_field.trim().to_string(),
            join_column: join_column.trim().to_string(),
            fields: job_fields(table_name.trim(), parent_field.trim(), join_column.trim()),
            entity_key,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn validate(&self) -> Result<(), SimJobError> {
        if self.entity_name.is_empty() {
            return Err(SimJobError::Validation("entity name cannot be empty".into()));
        }
        if !is_identifier(&self.entity_key) {
            return Err(SimJobError::Validation(format!(
                "entity name '{}' does not yield a valid key (got '{}')",
                self.entity_name, self.entity_key
            )));
        }
        for (label, value) in [
            ("table name", &self.table_name),
            ("parent field", &self.parent_field),
            ("join column", &self.join_column),
        ] {
            if !is_identifier(value) {
                return Err(SimJobError::Validation(format!(
                    "{label} '{value}' is not a valid identifier"
                )));
            }
        }
        if self.parent_entity.is_empty() {
            return Err(SimJobError::Validation("parent entity cannot be empty".into()));
        }
        Ok(())
    }
}

impl OrchestratorBinding {
    /// Default binding for a descriptor stored at `descriptor`
    pub fn new(entity: &EntityDescriptor, descriptor: PathBuf) -> Self {
        let operations = Operation::ALL
            .iter()
            .map(|op| (*op, op.handler_name(&entity.entity_key)))
            .collect();

        Self {
            entity_key: entity.entity_key.clone(),
            descriptor,
            raw_output_extension: DEFAULT_RAW_OUTPUT_EXTENSION.to_string(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            report_title: format!("{} Simulation Report", entity.entity_name),
            image_asset: None,
            operations,
        }
    }
}

/// The SimJob record shape, with the parent reference named after the parent field
fn job_fields(table_name: &str, parent_field: &str, join_column: &str) -> Vec<FieldSpec> {
    let field = |name: &str, ty: FieldType, nullable: bool| FieldSpec {
        name: name.to_string(),
        ty,
        nullable,
        references: None,
    };

    vec![
        field("job_id", FieldType::Uuid, false),
        FieldSpec {
            name: parent_field.to_string(),
            ty: FieldType::Uuid,
            nullable: false,
            references: Some(format!("{table_name}.{join_column}")),
        },
        field("status", FieldType::Status, false),
        field("result_dir", FieldType::Path, false),
        field("report_path", FieldType::Path, true),
        field("error_info", FieldType::Json, true),
        field("created_at", FieldType::Timestamp, false),
        field("finished_at", FieldType::Timestamp, true),
    ]
}

/// Converts a display name into a snake-case key
///
/// `"Beam Hopping"` and `"BeamHopping"` both become `beam_hopping`;
/// acronyms stay together (`"HTTPRoute"` becomes `http_route`).
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
                let boundary = prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower);
                if boundary && !out.ends_with('_') {
                    out.push('_');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
