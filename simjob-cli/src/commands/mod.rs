//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod generate;
mod job;
mod routes;

pub use generate::GenerateArgs;
pub use job::JobCommands;
pub use routes::RoutesArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new entity type and register its routes
    Generate(GenerateArgs),
    /// List the route registry
    Routes(RoutesArgs),
    /// Parameter records and simulation jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Generate(args) => generate::handle_generate(args),
        Commands::Routes(args) => routes::handle_routes(args),
        Commands::Job { command } => job::handle_job_command(command, config).await,
    }
}
