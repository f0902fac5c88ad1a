//! Orchestrator configuration

use anyhow::Context;
use simjob_runner::RunnerConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// Root of the per-job result directories
    pub data_root: PathBuf,

    /// Root of the rendered reports
    pub report_root: PathBuf,

    /// Route registry mounted at start-up
    pub routes_file: PathBuf,

    /// Running jobs older than this are flagged stale on poll
    pub stale_after: Duration,

    pub runner: RunnerConfig,
}

impl OrchestratorConfig {
    /// Creates a new configuration with defaults
    pub fn new(data_root: impl Into<PathBuf>, runner: RunnerConfig) -> Self {
        let data_root = data_root.into();
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            report_root: data_root.join("reports"),
            routes_file: PathBuf::from("routes.json"),
            stale_after: runner.job_timeout * 2,
            data_root,
            runner,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ORCHESTRATOR_BIND_ADDR (optional, default: "0.0.0.0:8080")
    /// - SIMJOB_DATA_ROOT (optional, default: "./data")
    /// - SIMJOB_REPORT_ROOT (optional, default: "$SIMJOB_DATA_ROOT/reports")
    /// - SIMJOB_ROUTES_FILE (optional, default: "routes.json")
    /// - SIMJOB_STALE_AFTER (optional, seconds, default: twice the job timeout)
    /// - the runner variables, see [`RunnerConfig::from_env`]
    pub fn from_env() -> anyhow::Result<Self> {
        let runner = RunnerConfig::from_env().context("loading runner configuration")?;

        let data_root = std::env::var("SIMJOB_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let mut config = Self::new(data_root, runner);

        if let Ok(addr) = std::env::var("ORCHESTRATOR_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(root) = std::env::var("SIMJOB_REPORT_ROOT") {
            config.report_root = PathBuf::from(root);
        }
        if let Ok(file) = std::env::var("SIMJOB_ROUTES_FILE") {
            config.routes_file = PathBuf::from(file);
        }
        if let Some(secs) = std::env::var("SIMJOB_STALE_AFTER")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.stale_after = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.runner.validate()?;

        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.stale_after < self.runner.job_timeout {
            anyhow::bail!(
                "stale_after ({:?}) must not be shorter than job_timeout ({:?})",
                self.stale_after,
                self.runner.job_timeout
            );
        }

        Ok(())
    }
}
