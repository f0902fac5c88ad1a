//! Job command handlers
//!
//! Drives one entity's operation surface on the orchestrator: records,
//! runs, polling, report download and cleanup.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use serde_json::{Map, Value};
use simjob_client::{DownloadResult, OrchestratorClient};
use simjob_core::domain::job::{JobSnapshot, JobStatus};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Create a parameter record
    Create {
        /// Entity key, e.g. coverage
        entity: String,

        /// Display name of the record
        #[arg(long)]
        name: String,

        /// Parameters as a JSON object
        #[arg(long, conflicts_with = "params_file")]
        params: Option<String>,

        /// File holding the parameters as a JSON object
        #[arg(long)]
        params_file: Option<PathBuf>,
    },
    /// Start a simulation for a record
    Run {
        entity: String,
        record_id: Uuid,

        /// Poll until the job finishes
        #[arg(short, long)]
        wait: bool,

        /// Poll interval in milliseconds when waiting
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Show the state of a job
    Poll { entity: String, job_id: Uuid },
    /// Download the rendered report of a job
    Download {
        entity: String,
        job_id: Uuid,

        /// Output file (defaults to <entity>_<job_id>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete the result directory and report of a job
    DeleteResult { entity: String, job_id: Uuid },
    /// Delete a parameter record together with its jobs
    DeleteJob { entity: String, record_id: Uuid },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        JobCommands::Create {
            entity,
            name,
            params,
            params_file,
        } => {
            let params = read_params(params.as_deref(), params_file.as_deref())?;
            create_record(&client, &entity, &name, params).await
        }
        JobCommands::Run {
            entity,
            record_id,
            wait,
            interval_ms,
        } => run_job(&client, &entity, record_id, wait.then(|| Duration::from_millis(interval_ms))).await,
        JobCommands::Poll { entity, job_id } => {
            let snapshot = client.poll_job(&entity, job_id).await?;
            print_job_details(&snapshot);
            Ok(())
        }
        JobCommands::Download {
            entity,
            job_id,
            output,
        } => {
            let output =
                output.unwrap_or_else(|| PathBuf::from(format!("{}_{}.pdf", entity, job_id)));
            download_result(&client, &entity, job_id, &output).await
        }
        JobCommands::DeleteResult { entity, job_id } => {
            let snapshot = client.delete_result(&entity, job_id).await?;
            println!(
                "{}",
                format!("✓ Result of job {} deleted", snapshot.job_id)
                    .green()
                    .bold()
            );
            Ok(())
        }
        JobCommands::DeleteJob { entity, record_id } => {
            client.delete_record(&entity, record_id).await?;
            println!(
                "{}",
                format!("✓ Record {} and its jobs deleted", record_id)
                    .green()
                    .bold()
            );
            Ok(())
        }
    }
}

async fn create_record(
    client: &OrchestratorClient,
    entity: &str,
    name: &str,
    params: Map<String, Value>,
) -> Result<()> {
    let record = client.create_record(entity, name, params).await?;

    println!("{}", "✓ Record created".green().bold());
    println!("  ID:     {}", record.id.to_string().cyan());
    println!("  Entity: {}", record.entity);
    println!("  Name:   {}", record.name);
    Ok(())
}

async fn run_job(
    client: &OrchestratorClient,
    entity: &str,
    record_id: Uuid,
    wait: Option<Duration>,
) -> Result<()> {
    let job_id = client.run_job(entity, record_id).await?;
    println!(
        "{}",
        format!("✓ Job {} started", job_id).green().bold()
    );

    let Some(interval) = wait else {
        println!(
            "{}",
            format!("  Poll with: simjob job poll {} {}", entity, job_id).dimmed()
        );
        return Ok(());
    };

    loop {
        let snapshot = client.poll_job(entity, job_id).await?;
        if snapshot.status.is_terminal() {
            println!();
            print_job_details(&snapshot);
            if snapshot.status == JobStatus::Failed {
                bail!("Job {} failed", job_id);
            }
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}

async fn download_result(
    client: &OrchestratorClient,
    entity: &str,
    job_id: Uuid,
    output: &Path,
) -> Result<()> {
    match client.download_result(entity, job_id).await? {
        DownloadResult::Report(content) => {
            std::fs::write(output, &content)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "{}",
                format!("✓ Report saved to {} ({} bytes)", output.display(), content.len())
                    .green()
                    .bold()
            );
        }
        DownloadResult::Pending(message) => {
            println!("{}", format!("⏳ {}", message).yellow());
        }
    }
    Ok(())
}

/// Parameters from `--params` or `--params-file`; none means an empty object
fn read_params(inline: Option<&str>, file: Option<&Path>) -> Result<Map<String, Value>> {
    let content = match (inline, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(file)) => std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?,
        (None, None) => return Ok(Map::new()),
    };
    parse_params(&content)
}

fn parse_params(content: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(content).context("Parameters are not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Parameters must be a JSON object, got {}", kind_of(&other)),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Print detailed job information
fn print_job_details(job: &JobSnapshot) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", job.job_id.to_string().cyan());
    println!("  Entity:    {}", job.entity);
    println!("  Record:    {}", job.parent_ref.to_string().dimmed());
    println!("  Status:    {}", colorize_status(job.status));
    println!(
        "  Created:   {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(started) = job.started_at {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(finished) = job.finished_at {
        println!("  Finished:  {}", finished.format("%Y-%m-%d %H:%M:%S"));
        if let Some(started) = job.started_at {
            let seconds = finished.signed_duration_since(started).num_seconds();
            println!("  Duration:  {}s", seconds);
        }
    }
    if job.stale {
        println!(
            "  {}",
            "⚠ Job has been running longer than expected".yellow()
        );
    }
    if let Some(report) = &job.report_path {
        println!("  Report:    {}", report.display());
    }

    if let Some(results) = &job.results {
        println!("\n{}", "Results:".bold());
        for (key, value) in results {
            println!("  {} = {}", key.cyan(), value);
        }
    }

    if let Some(error) = &job.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.message.red());
        if let Some(diagnostic) = &error.diagnostic {
            println!("{}", diagnostic.dimmed());
        }
    }
}

/// Colorize job status for display
fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Created => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Succeeded => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Deleted => status_str.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_params_object() {
        let params = parse_params(r#"{"a": 1, "b": {"c": [1, 2]}}"#).unwrap();
        assert_eq!(params["a"], json!(1));
        assert_eq!(params["b"]["c"], json!([1, 2]));
    }

    #[test]
    fn test_parse_params_rejects_non_objects() {
        let err = parse_params("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("an array"));
        assert!(parse_params("{oops").is_err());
    }

    #[test]
    fn test_read_params_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("params.json");
        std::fs::write(&file, r#"{"seed": 7}"#).unwrap();

        assert_eq!(read_params(None, Some(&file)).unwrap()["seed"], json!(7));
        assert_eq!(
            read_params(Some(r#"{"seed": 1}"#), None).unwrap()["seed"],
            json!(1)
        );
        assert!(read_params(None, None).unwrap().is_empty());
        assert!(read_params(None, Some(&dir.path().join("missing.json"))).is_err());
    }
}
