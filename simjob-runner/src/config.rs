//! Runner configuration
//!
//! Defines how the external simulator is invoked and supervised:
//! command line, wall-clock budget, output wait and pool size.

use std::time::Duration;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Simulator executable
    pub simulator_program: String,

    /// Simulator arguments. `{params}` and `{result_dir}` are substituted
    /// with the parameters file and the job's result directory.
    pub simulator_args: Vec<String>,

    /// Maximum time a simulator run may take before it is killed
    pub job_timeout: Duration,

    /// How long to wait for the raw output file after a successful exit
    pub output_wait: Duration,

    /// Max simulator processes running at once
    pub max_parallel_jobs: usize,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(simulator_program: impl Into<String>, simulator_args: Vec<String>) -> Self {
        Self {
            simulator_program: simulator_program.into(),
            simulator_args,
            job_timeout: Duration::from_secs(300),
            output_wait: Duration::from_secs(5),
            max_parallel_jobs: 2,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SIMJOB_SIMULATOR (required)
    /// - SIMJOB_SIMULATOR_ARGS (optional, whitespace separated,
    ///   default: "--params {params} --output {result_dir}")
    /// - SIMJOB_JOB_TIMEOUT (optional, seconds, default: 300)
    /// - SIMJOB_OUTPUT_WAIT (optional, seconds, default: 5)
    /// - SIMJOB_MAX_PARALLEL_JOBS (optional, default: 2)
    pub fn from_env() -> anyhow::Result<Self> {
        let simulator_program = std::env::var("SIMJOB_SIMULATOR")
            .map_err(|_| anyhow::anyhow!("SIMJOB_SIMULATOR environment variable not set"))?;

        let simulator_args = std::env::var("SIMJOB_SIMULATOR_ARGS")
            .unwrap_or_else(|_| "--params {params} --output {result_dir}".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let job_timeout = std::env::var("SIMJOB_JOB_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(300));

        let output_wait = std::env::var("SIMJOB_OUTPUT_WAIT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let max_parallel_jobs = std::env::var("SIMJOB_MAX_PARALLEL_JOBS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(2);

        Ok(Self {
            simulator_program,
            simulator_args,
            job_timeout,
            output_wait,
            max_parallel_jobs,
        })
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_output_wait(mut self, wait: Duration) -> Self {
        self.output_wait = wait;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.simulator_program.trim().is_empty() {
            anyhow::bail!("simulator_program cannot be empty");
        }

        if self.job_timeout.is_zero() {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::new("simulator", vec![]);
        assert_eq!(config.job_timeout, Duration::from_secs(300));
        assert_eq!(config.output_wait, Duration::from_secs(5));
        assert_eq!(config.max_parallel_jobs, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RunnerConfig::new("simulator", vec![]);

        config.simulator_program = "  ".to_string();
        assert!(config.validate().is_err());
        config.simulator_program = "simulator".to_string();

        config.job_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.job_timeout = Duration::from_secs(1);

        config.max_parallel_jobs = 0;
        assert!(config.validate().is_err());
        config.max_parallel_jobs = 1;

        assert!(config.validate().is_ok());
    }
}
