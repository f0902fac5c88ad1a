//! Routes command handler

use anyhow::Result;
use clap::Args;
use colored::*;
use simjob_core::domain::registry::RouteRegistry;
use std::path::PathBuf;

/// Arguments of `simjob routes`
#[derive(Args)]
pub struct RoutesArgs {
    /// Route registry to read
    #[arg(long, env = "SIMJOB_ROUTES_FILE", default_value = "routes.json")]
    pub routes_file: PathBuf,
}

/// List every registered entity and its routes
pub fn handle_routes(args: RoutesArgs) -> Result<()> {
    let registry = RouteRegistry::load(&args.routes_file)?;

    if registry.is_empty() {
        println!(
            "{}",
            format!("No entities registered in {}.", args.routes_file.display()).yellow()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} entity type(s):", registry.len()).bold()
    );
    for (key, entry) in &registry.entities {
        println!();
        println!("  {} {}", "▸".cyan(), key.bold());
        println!("    Import: {}", entry.import.display().to_string().dimmed());
        for route in &entry.routes {
            println!(
                "    {:<6} {:<28} {}",
                route.method.yellow(),
                route.path,
                route.name.dimmed()
            );
        }
    }

    Ok(())
}
