//! Background job supervision
//!
//! One supervisor task per submitted job. The task waits for a pool permit,
//! runs the simulator, then ingests the raw output and renders the report.
//! Every failure ends up on the job as [`ErrorInfo`]; nothing escapes the
//! task.

use serde_json::{Map, Value};
use simjob_core::SimJobError;
use simjob_core::domain::job::{ErrorInfo, JobStatus};
use simjob_core::domain::record::RecordStatus;
use simjob_runner::{Ingestor, ReportRenderer, SimRequest, Simulator};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::repository::{JobStore, ParameterStore};

/// Shared worker pool running simulator jobs
#[derive(Clone)]
pub struct Supervisor {
    simulator: Arc<dyn Simulator>,
    permits: Arc<Semaphore>,
    output_wait: Duration,
}

/// Everything the background task needs to drive one job
pub struct JobRun {
    pub job_id: Uuid,
    pub parent_ref: Uuid,
    pub entity: String,
    pub params: Map<String, Value>,
    pub result_dir: PathBuf,
    pub report_path: PathBuf,
    pub ingestor: Ingestor,
    pub renderer: ReportRenderer,
    /// Fallback plot when the simulator leaves no `*.png`
    pub image_asset: Option<PathBuf>,
    pub jobs: Arc<JobStore>,
    pub records: Arc<dyn ParameterStore>,
}

impl Supervisor {
    pub fn new(simulator: Arc<dyn Simulator>, max_parallel_jobs: usize, output_wait: Duration) -> Self {
        Self {
            simulator,
            permits: Arc::new(Semaphore::new(max_parallel_jobs.max(1))),
            output_wait,
        }
    }

    /// Starts supervising a job that is already `running`
    pub fn spawn(&self, run: JobRun) -> JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move { supervisor.supervise(run).await })
    }

    async fn supervise(self, run: JobRun) {
        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                let err = SimJobError::ExternalProcess("worker pool is shut down".into());
                finish(&run, Err(ErrorInfo::from(&err)));
                return;
            }
        };

        if is_deleted(&run) {
            debug!("Job {} deleted before it started", run.job_id);
            set_record_status(&run, RecordStatus::Idle);
            run.jobs.release(run.parent_ref, run.job_id);
            return;
        }

        let outcome = self.execute(&run).await;
        finish(&run, outcome);
    }

    async fn execute(&self, run: &JobRun) -> Result<BTreeMap<String, f64>, ErrorInfo> {
        tokio::fs::create_dir_all(&run.result_dir)
            .await
            .map_err(|e| ErrorInfo::from(&SimJobError::file(&run.result_dir, e)))?;

        let request = SimRequest {
            job_id: run.job_id,
            entity: run.entity.clone(),
            params: run.params.clone(),
            result_dir: run.result_dir.clone(),
        };
        let outcome = self
            .simulator
            .run(&request)
            .await
            .map_err(|e| ErrorInfo::from(&e))?;

        if !outcome.success() {
            let err = SimJobError::ExternalProcess(format!(
                "simulator exited with code {}",
                outcome.exit_code
            ));
            return Err(ErrorInfo::from(&err).with_diagnostic(outcome.diagnostic));
        }

        if !run
            .ingestor
            .wait_for_output(&run.result_dir, self.output_wait)
            .await
        {
            warn!(
                "Job {}: no *.{} output after {:?}",
                run.job_id,
                run.ingestor.extension(),
                self.output_wait
            );
        }

        let ingestor = run.ingestor.clone();
        let renderer = run.renderer.clone();
        let params = run.params.clone();
        let result_dir = run.result_dir.clone();
        let report_path = run.report_path.clone();
        let image_asset = run.image_asset.clone();

        tokio::task::spawn_blocking(move || -> Result<BTreeMap<String, f64>, SimJobError> {
            let results = ingestor.ingest(&result_dir)?;
            let image = find_plot(&result_dir).or(image_asset);
            renderer.render(&params, image.as_deref(), &report_path)?;
            Ok(results)
        })
        .await
        .map_err(|e| ErrorInfo::from(&SimJobError::Render(format!("report task aborted: {e}"))))?
        .map_err(|e| ErrorInfo::from(&e))
    }
}

/// Records the outcome, flips the record status and releases the run slot
///
/// The slot goes last so a job started afterwards is not overwritten by
/// this job's record status.
fn finish(run: &JobRun, outcome: Result<BTreeMap<String, f64>, ErrorInfo>) {
    let succeeded = outcome.is_ok();
    let recorded = run.jobs.update(run.job_id, |job| {
        if job.status == JobStatus::Deleted {
            return Ok(false);
        }
        match outcome {
            Ok(results) => job.mark_succeeded(run.report_path.clone(), results)?,
            Err(info) => job.mark_failed(info)?,
        }
        Ok(true)
    });

    match recorded {
        Ok(true) => {
            let status = if succeeded {
                RecordStatus::Completed
            } else {
                remove_file(&run.report_path);
                RecordStatus::Failed
            };
            set_record_status(run, status);
            info!(
                "Job {} completed with status: {:?}",
                run.job_id,
                if succeeded {
                    JobStatus::Succeeded
                } else {
                    JobStatus::Failed
                }
            );
        }
        Ok(false) => {
            info!("Job {} was deleted while running, discarding output", run.job_id);
            remove_dir(&run.result_dir);
            remove_file(&run.report_path);
            set_record_status(run, RecordStatus::Idle);
        }
        Err(e) => error!("Job {} could not be finalized: {}", run.job_id, e),
    }
    run.jobs.release(run.parent_ref, run.job_id);
}

fn set_record_status(run: &JobRun, status: RecordStatus) {
    if let Err(e) = run.records.set_status(run.parent_ref, status) {
        debug!("Record {} status not updated: {}", run.parent_ref, e);
    }
}

fn is_deleted(run: &JobRun) -> bool {
    run.jobs
        .find_by_id(run.job_id)
        .is_none_or(|job| job.status == JobStatus::Deleted)
}

/// First `*.png` in `dir`, by name
fn find_plot(dir: &Path) -> Option<PathBuf> {
    let mut plots: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    plots.sort();
    plots.into_iter().next()
}

fn remove_dir(path: &Path) {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}

fn remove_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}
