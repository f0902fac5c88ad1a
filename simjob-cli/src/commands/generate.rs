//! Generate command handler
//!
//! Stamps out a new entity type through the actor generator.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;

use crate::generator::{self, BindingOptions, GenerateRequest};

/// Arguments of `simjob generate`
#[derive(Args)]
pub struct GenerateArgs {
    /// Display name of the entity, e.g. "Beam Hopping"
    pub entity_name: String,

    /// Table holding the entity's parameter records
    pub table_name: String,

    /// Name of the parent entity
    pub parent_entity: String,

    /// Field of the job record referencing the parent
    pub parent_field: String,

    /// Column of the parameter table the parent field joins on
    pub join_column: String,

    /// Directory receiving the entity descriptor
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// Directory receiving the orchestrator binding
    #[arg(long, default_value = "actors")]
    pub actors_dir: PathBuf,

    /// Route registry to append to
    #[arg(long, env = "SIMJOB_ROUTES_FILE", default_value = "routes.json")]
    pub routes_file: PathBuf,

    /// Extension of the simulator's raw output
    #[arg(long)]
    pub raw_output_extension: Option<String>,

    /// Column holding the result keys
    #[arg(long)]
    pub key_column: Option<String>,

    /// Column holding the result values
    #[arg(long)]
    pub value_column: Option<String>,

    /// Title of the rendered report
    #[arg(long)]
    pub report_title: Option<String>,

    /// Image embedded when the simulator produces no plot
    #[arg(long)]
    pub image_asset: Option<PathBuf>,
}

impl From<GenerateArgs> for GenerateRequest {
    fn from(args: GenerateArgs) -> Self {
        GenerateRequest {
            entity_name: args.entity_name,
            table_name: args.table_name,
            parent_entity: args.parent_entity,
            parent_field: args.parent_field,
            join_column: args.join_column,
            models_dir: args.models_dir,
            actors_dir: args.actors_dir,
            routes_file: args.routes_file,
            options: BindingOptions {
                raw_output_extension: args.raw_output_extension,
                key_column: args.key_column,
                value_column: args.value_column,
                report_title: args.report_title,
                image_asset: args.image_asset,
            },
        }
    }
}

/// Handle `simjob generate`
pub fn handle_generate(args: GenerateArgs) -> Result<()> {
    let name = args.entity_name.clone();
    let generated = generator::generate(&args.into())
        .with_context(|| format!("Failed to generate entity '{}'", name))?;

    println!(
        "{}",
        format!("✓ Generated entity {}", generated.entity_key)
            .green()
            .bold()
    );
    println!(
        "  Descriptor: {}",
        generated.descriptor_file.display().to_string().dimmed()
    );
    println!(
        "  Binding:    {}",
        generated.binding_file.display().to_string().dimmed()
    );
    println!();
    println!("{}", "Routes:".bold());
    for route in &generated.routes.routes {
        println!(
            "  {} {} {} {}",
            "▸".cyan(),
            route.method.yellow(),
            route.path,
            format!("({})", route.name).dimmed()
        );
    }

    Ok(())
}
