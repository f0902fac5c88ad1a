//! External simulator process
//!
//! The simulator is an opaque subprocess: it receives the job's parameters
//! and a writable result directory, runs to completion and exits 0 on
//! success. Runs are bound to a wall-clock budget; a run exceeding it is
//! killed.

use async_trait::async_trait;
use serde_json::{Map, Value};
use simjob_core::SimJobError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;

/// File the parameters are handed over in, inside the result directory
pub const PARAMS_FILE_NAME: &str = "params.json";

/// Lines of process output kept for diagnostics
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Everything a simulator run needs
#[derive(Debug, Clone)]
pub struct SimRequest {
    pub job_id: Uuid,
    pub entity: String,
    pub params: Map<String, Value>,
    /// Freshly created directory owned by this job
    pub result_dir: PathBuf,
}

/// How a simulator run ended
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Exit code, `-1` when the process was terminated by a signal
    pub exit_code: i32,
    pub elapsed: Duration,
    /// Tail of stderr
    pub diagnostic: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Service trait for running the external simulator
#[async_trait]
pub trait Simulator: Send + Sync {
    /// Runs the simulator to completion
    ///
    /// Returns the outcome for any exit code. Errors mean the process could
    /// not be started ([`SimJobError::ExternalProcess`]) or exceeded its time
    /// budget ([`SimJobError::Timeout`]).
    async fn run(&self, request: &SimRequest) -> Result<ProcessOutcome, SimJobError>;
}

/// Runs the simulator as a child process
pub struct ProcessSimulator {
    config: RunnerConfig,
}

impl ProcessSimulator {
    /// Creates a new process simulator
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Substitutes `{params}` and `{result_dir}` in the configured arguments
    fn expand_args(&self, params_file: &str, result_dir: &str) -> Vec<String> {
        self.config
            .simulator_args
            .iter()
            .map(|arg| {
                arg.replace("{params}", params_file)
                    .replace("{result_dir}", result_dir)
            })
            .collect()
    }

    fn build_command(&self, request: &SimRequest, params_file: &Path) -> Command {
        let params_str = params_file.to_string_lossy().to_string();
        let dir_str = request.result_dir.to_string_lossy().to_string();

        let mut cmd = Command::new(&self.config.simulator_program);
        cmd.args(self.expand_args(&params_str, &dir_str))
            .env("SIMJOB_PARAMS_FILE", &params_str)
            .env("SIMJOB_RESULT_DIR", &dir_str)
            .env("SIMJOB_JOB_ID", request.job_id.to_string())
            .env("SIMJOB_ENTITY", &request.entity)
            .current_dir(&request.result_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Simulator for ProcessSimulator {
    async fn run(&self, request: &SimRequest) -> Result<ProcessOutcome, SimJobError> {
        let params_file = request.result_dir.join(PARAMS_FILE_NAME);
        let params = serde_json::to_vec_pretty(&request.params)?;
        tokio::fs::write(&params_file, params)
            .await
            .map_err(|e| SimJobError::file(&params_file, e))?;

        let mut cmd = self.build_command(request, &params_file);

        info!(
            "Launching simulator '{}' for job {}",
            self.config.simulator_program, request.job_id
        );
        let started = Instant::now();

        // Dropping the output future on timeout kills the child (kill_on_drop).
        let output = match tokio::time::timeout(self.config.job_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SimJobError::ExternalProcess(format!(
                    "Failed to start simulator '{}': {}",
                    self.config.simulator_program, e
                )));
            }
            Err(_) => {
                warn!(
                    "Simulator for job {} exceeded {:?}, killed",
                    request.job_id, self.config.job_timeout
                );
                return Err(SimJobError::Timeout {
                    limit: self.config.job_timeout,
                });
            }
        };

        let elapsed = started.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("Simulator stdout for job {}: {}", request.job_id, stdout.trim());
        }

        info!(
            "Simulator for job {} exited with code {} after {:?}",
            request.job_id, exit_code, elapsed
        );

        Ok(ProcessOutcome {
            exit_code,
            elapsed,
            diagnostic: tail(&String::from_utf8_lossy(&output.stderr), DIAGNOSTIC_TAIL_LINES),
        })
    }
}

/// Last `lines` lines of `text`
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
