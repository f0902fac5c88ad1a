//! SimJob Service
//!
//! One [`Orchestrator`] per entity type. It turns parameter records into
//! supervised simulator jobs and serves their lifecycle operations. All
//! orchestrators share the job store and the worker pool.

use chrono::Utc;
use serde_json::{Map, Value};
use simjob_core::SimJobError;
use simjob_core::domain::entity::{EntityDescriptor, OrchestratorBinding};
use simjob_core::domain::job::{JobSnapshot, JobStatus, SimJob};
use simjob_core::domain::record::{ParameterRecord, RecordStatus};
use simjob_core::domain::registry::RouteEntry;
use simjob_core::dto::job::{JobRef, RunJob};
use simjob_core::dto::record::{CreateRecord, RecordRef};
use simjob_runner::{Ingestor, ReportRenderer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::registry::LoadedEntity;
use crate::repository::{JobStore, ParameterStore};
use crate::service::supervisor::{JobRun, Supervisor};

/// Orchestrator bound to one entity type
pub struct Orchestrator {
    descriptor: EntityDescriptor,
    binding: OrchestratorBinding,
    routes: RouteEntry,
    ingestor: Ingestor,
    renderer: ReportRenderer,
    jobs: Arc<JobStore>,
    records: Arc<dyn ParameterStore>,
    supervisor: Supervisor,
    /// `<data_root>/<entity_key>`
    result_root: PathBuf,
    /// `<report_root>/<entity_key>`
    report_root: PathBuf,
    stale_after: chrono::Duration,
}

/// Outcome of a download request
#[derive(Debug)]
pub enum Download {
    /// The rendered report
    Ready { path: PathBuf, content: Vec<u8> },
    /// The job has not finished yet
    Pending(JobStatus),
}

impl Orchestrator {
    pub fn new(
        entity: LoadedEntity,
        config: &OrchestratorConfig,
        jobs: Arc<JobStore>,
        records: Arc<dyn ParameterStore>,
        supervisor: Supervisor,
    ) -> Self {
        let key = entity.descriptor.entity_key.clone();
        let stale_after = chrono::Duration::from_std(config.stale_after)
            .unwrap_or_else(|_| chrono::Duration::MAX);

        Self {
            ingestor: Ingestor::for_binding(&entity.binding),
            renderer: ReportRenderer::new(entity.binding.report_title.clone()),
            descriptor: entity.descriptor,
            binding: entity.binding,
            routes: entity.routes,
            jobs,
            records,
            supervisor,
            result_root: config.data_root.join(&key),
            report_root: config.report_root.join(&key),
            stale_after,
        }
    }

    pub fn key(&self) -> &str {
        &self.descriptor.entity_key
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn routes(&self) -> &RouteEntry {
        &self.routes
    }

    /// Fixed location of a job's report
    pub fn report_path(&self, job_id: Uuid) -> PathBuf {
        self.report_root.join(format!("{job_id}.pdf"))
    }

    // =========================================================================
    // Parameter records
    // =========================================================================

    /// `create_<T>`
    pub fn create_record(&self, req: CreateRecord) -> Result<ParameterRecord, SimJobError> {
        let name = req.name()?.to_string();
        let record = self
            .records
            .create(ParameterRecord::new(self.key(), name, req.params))?;

        info!("Record {} created for {}", record.id, self.key());
        Ok(record)
    }

    fn record(&self, record_id: Uuid) -> Result<ParameterRecord, SimJobError> {
        self.records
            .get(record_id)
            .filter(|record| record.entity == self.key())
            .ok_or_else(|| SimJobError::NotFound(format!("Record {} not found", record_id)))
    }

    /// `delete_<T>_sim_job`: deletes every job of the record, then the record
    ///
    /// Refused while a job for the record is running. The record's run slot
    /// is held throughout so no job can start for it meanwhile.
    pub async fn delete_record(&self, req: RecordRef) -> Result<(), SimJobError> {
        let record_id = req.record_id()?;
        self.record(record_id)?;

        let _claim = self.jobs.claim_parent(record_id).inspect_err(|e| {
            warn!("Deletion refused for record {}: {}", record_id, e);
        })?;

        for job in self.jobs.find_by_parent(record_id) {
            self.delete(job.job_id).await?;
        }
        self.records.delete(record_id);
        let purged = self.jobs.purge_parent(record_id);

        info!("Record {} deleted with {} job(s)", record_id, purged);
        Ok(())
    }

    // =========================================================================
    // Job lifecycle
    // =========================================================================

    /// `run_<T>_sim_job`: submits the record's parameters
    pub fn run(&self, req: RunJob) -> Result<Uuid, SimJobError> {
        let record = self.record(req.record_id()?)?;
        self.submit(record.id, record.params)
    }

    /// Starts a job for `parent_ref` and returns without waiting for it
    ///
    /// Fails with [`SimJobError::Conflict`] while another job of the same
    /// parent is running.
    pub fn submit(&self, parent_ref: Uuid, params: Map<String, Value>) -> Result<Uuid, SimJobError> {
        let mut job = SimJob::new(self.key(), parent_ref, PathBuf::new());
        job.result_dir = self.result_root.join(job.job_id.to_string());

        let job = self.jobs.start(job).inspect_err(|e| {
            warn!("Run rejected for record {}: {}", parent_ref, e);
        })?;

        if let Err(e) = self.records.set_status(parent_ref, RecordStatus::Processing) {
            debug!("Record {} status not updated: {}", parent_ref, e);
        }

        self.supervisor.spawn(JobRun {
            job_id: job.job_id,
            parent_ref,
            entity: self.key().to_string(),
            params,
            result_dir: job.result_dir.clone(),
            report_path: self.report_path(job.job_id),
            ingestor: self.ingestor.clone(),
            renderer: self.renderer.clone(),
            image_asset: self.binding.image_asset.clone(),
            jobs: self.jobs.clone(),
            records: self.records.clone(),
        });

        info!("Job {} submitted for record {}", job.job_id, parent_ref);
        Ok(job.job_id)
    }

    fn job(&self, job_id: Uuid) -> Result<SimJob, SimJobError> {
        self.jobs
            .find_by_id(job_id)
            .filter(|job| job.entity == self.key())
            .ok_or_else(|| SimJobError::NotFound(format!("Job {} not found", job_id)))
    }

    /// Current state of a job, never blocking on the simulator
    pub fn poll(&self, job_id: Uuid) -> Result<JobSnapshot, SimJobError> {
        let job = self.job(job_id)?;
        let stale = job.is_stale(self.stale_after, Utc::now());
        if stale {
            warn!(
                "Job {} has been running since {:?}, treat it as failed",
                job_id, job.started_at
            );
        }
        Ok(job.snapshot(stale))
    }

    /// Waits until the job reaches a terminal status
    pub async fn wait(&self, job_id: Uuid) -> Result<JobSnapshot, SimJobError> {
        self.job(job_id)?;
        if let Some(mut rx) = self.jobs.subscribe(job_id) {
            loop {
                let status = *rx.borrow_and_update();
                if status.is_terminal() || rx.changed().await.is_err() {
                    break;
                }
            }
        }
        self.poll(job_id)
    }

    /// `download_<T>_sim_result`
    ///
    /// Only a succeeded job has a report; failed, deleted and unknown jobs
    /// are [`SimJobError::NotFound`].
    pub async fn download(&self, job_id: Uuid) -> Result<Download, SimJobError> {
        let job = self.job(job_id)?;
        match (job.status, job.report_path) {
            (JobStatus::Created | JobStatus::Running, _) => Ok(Download::Pending(job.status)),
            (JobStatus::Succeeded, Some(path)) => match tokio::fs::read(&path).await {
                Ok(content) => Ok(Download::Ready { path, content }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SimJobError::NotFound(
                    format!("Report of job {} is missing", job_id),
                )),
                Err(e) => Err(SimJobError::file(path, e)),
            },
            (status, _) => Err(SimJobError::NotFound(format!(
                "Job {} has no report ({})",
                job_id, status
            ))),
        }
    }

    /// `delete_<T>_sim_result`: idempotent
    ///
    /// Marks the job `deleted`, then removes the result directory and the
    /// report. Absent files are not an error. A running job keeps its run
    /// slot until the simulator exits; the supervisor frees it then.
    pub async fn delete(&self, job_id: Uuid) -> Result<JobSnapshot, SimJobError> {
        self.job(job_id)?;

        let (previous, job) = self.jobs.update(job_id, |job| {
            let previous = job.status;
            job.mark_deleted();
            Ok((previous, job.clone()))
        })?;

        if previous == JobStatus::Deleted {
            debug!("Job {} already deleted", job_id);
            return Ok(job.snapshot(false));
        }

        remove_path(&job.result_dir, true).await?;
        remove_path(&self.report_path(job_id), false).await?;

        info!("Job {} deleted (was {})", job_id, previous);
        Ok(job.snapshot(false))
    }

    /// `delete_<T>_sim_result` with the request body
    pub async fn delete_result(&self, req: JobRef) -> Result<JobSnapshot, SimJobError> {
        self.delete(req.job_id()?).await
    }
}

async fn remove_path(path: &Path, dir: bool) -> Result<(), SimJobError> {
    let removed = if dir {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{:?} already absent", path);
            Ok(())
        }
        Err(e) => Err(SimJobError::file(path, e)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::registry::tests::write_entity;
    use crate::registry::load_entities;
    use crate::repository::InMemoryParameterStore;
    use async_trait::async_trait;
    use serde_json::json;
    use simjob_core::ErrorKind;
    use simjob_runner::{ProcessOutcome, RunnerConfig, SimRequest, Simulator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Simulator double: optionally sleeps, writes `output`, exits with `exit_code`
    pub(crate) struct FakeSimulator {
        pub output: Option<&'static str>,
        pub exit_code: i32,
        pub delay: Duration,
    }

    impl FakeSimulator {
        pub(crate) fn writing(output: &'static str) -> Self {
            Self {
                output: Some(output),
                exit_code: 0,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Simulator for FakeSimulator {
        async fn run(&self, request: &SimRequest) -> Result<ProcessOutcome, SimJobError> {
            tokio::time::sleep(self.delay).await;
            if let Some(output) = self.output {
                std::fs::write(request.result_dir.join("result.csv"), output)?;
            }
            Ok(ProcessOutcome {
                exit_code: self.exit_code,
                elapsed: self.delay,
                diagnostic: if self.exit_code == 0 {
                    String::new()
                } else {
                    "propagation model diverged".to_string()
                },
            })
        }
    }

    struct Fixture {
        _dir: TempDir,
        orchestrator: Orchestrator,
        records: Arc<InMemoryParameterStore>,
    }

    fn fixture(simulator: FakeSimulator) -> Fixture {
        let dir = TempDir::new().unwrap();
        write_entity(dir.path(), "Coverage");
        let entity = load_entities(&dir.path().join("routes.json"))
            .unwrap()
            .remove(0);

        let runner = RunnerConfig::new("unused", vec![]).with_output_wait(Duration::from_millis(200));
        let config = OrchestratorConfig::new(dir.path().join("data"), runner);
        let records = Arc::new(InMemoryParameterStore::new());
        let supervisor = Supervisor::new(Arc::new(simulator), 2, config.runner.output_wait);
        let orchestrator = Orchestrator::new(
            entity,
            &config,
            Arc::new(JobStore::new()),
            records.clone(),
            supervisor,
        );

        Fixture {
            _dir: dir,
            orchestrator,
            records,
        }
    }

    fn create(fx: &Fixture) -> ParameterRecord {
        let params = json!({"elevation": 10, "orbit": {"altitude": 550}});
        let params = params.as_object().unwrap().clone();
        fx.orchestrator
            .create_record(CreateRecord {
                name: Some("LEO sweep".into()),
                params,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let fx = fixture(FakeSimulator::writing("break,value\n1,5.0\n"));
        let record = create(&fx);

        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        assert_eq!(
            fx.records.get(record.id).unwrap().status,
            RecordStatus::Processing
        );

        let snapshot = fx.orchestrator.wait(job_id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Succeeded);
        let report = snapshot.report_path.clone().unwrap();
        assert!(report.is_file());
        assert_eq!(snapshot.results.unwrap()["1"], 5.0);
        assert_eq!(
            fx.records.get(record.id).unwrap().status,
            RecordStatus::Completed
        );

        match fx.orchestrator.download(job_id).await.unwrap() {
            Download::Ready { content, .. } => assert!(content.starts_with(b"%PDF")),
            other => panic!("unexpected download: {other:?}"),
        }

        let deleted = fx.orchestrator.delete(job_id).await.unwrap();
        assert_eq!(deleted.status, JobStatus::Deleted);
        assert!(!report.exists());

        let polled = fx.orchestrator.poll(job_id).unwrap();
        assert_eq!(polled.status, JobStatus::Deleted);
        assert!(polled.report_path.is_none());
        assert!(fx.orchestrator.download(job_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_second_submit_conflicts() {
        let fx = fixture(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);

        let first = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        let second = fx.orchestrator.run(RunJob::new(record.id)).unwrap_err();

        assert!(matches!(second, SimJobError::Conflict(_)));
        assert_eq!(
            fx.orchestrator.poll(first).unwrap().status,
            JobStatus::Running
        );

        fx.orchestrator.wait(first).await.unwrap();
        assert!(fx.orchestrator.run(RunJob::new(record.id)).is_ok());
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails_with_diagnostic() {
        let fx = fixture(FakeSimulator {
            exit_code: 2,
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);

        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        let snapshot = fx.orchestrator.wait(job_id).await.unwrap();

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert!(snapshot.report_path.is_none());
        let error = snapshot.error.unwrap();
        assert_eq!(error.kind, ErrorKind::ExternalProcess);
        assert!(error.message.contains("code 2"));
        assert_eq!(error.diagnostic.as_deref(), Some("propagation model diverged"));
        assert_eq!(
            fx.records.get(record.id).unwrap().status,
            RecordStatus::Failed
        );
        assert!(fx.orchestrator.download(job_id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_missing_output_fails() {
        let fx = fixture(FakeSimulator {
            output: None,
            ..FakeSimulator::writing("")
        });
        let record = create(&fx);

        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        let snapshot = fx.orchestrator.wait(job_id).await.unwrap();

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.error.unwrap().kind, ErrorKind::MissingOutput);
    }

    #[tokio::test]
    async fn test_schema_error_fails() {
        let fx = fixture(FakeSimulator::writing("break,snr\n1,5.0\n"));
        let record = create(&fx);

        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        let error = fx.orchestrator.wait(job_id).await.unwrap().error.unwrap();

        assert_eq!(error.kind, ErrorKind::Schema);
        assert!(error.message.contains("snr"));
    }

    #[tokio::test]
    async fn test_download_while_running_is_pending() {
        let fx = fixture(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);
        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();

        assert!(matches!(
            fx.orchestrator.download(job_id).await.unwrap(),
            Download::Pending(JobStatus::Running)
        ));
        fx.orchestrator.wait(job_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let fx = fixture(FakeSimulator::writing("break,value\n1,5.0\n"));
        let record = create(&fx);
        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        fx.orchestrator.wait(job_id).await.unwrap();

        let first = fx.orchestrator.delete(job_id).await.unwrap();
        let second = fx.orchestrator.delete(job_id).await.unwrap();

        assert_eq!(first.status, JobStatus::Deleted);
        assert_eq!(second.status, first.status);
        assert_eq!(second.finished_at, first.finished_at);
        assert_eq!(second.report_path, first.report_path);
    }

    /// Waits for the supervisor to let go of the record's run slot
    async fn slot_released(fx: &Fixture, record_id: Uuid) {
        for _ in 0..100 {
            if fx.orchestrator.jobs.running_for(record_id).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("run slot of record {record_id} never released");
    }

    #[tokio::test]
    async fn test_delete_running_job_discards_output() {
        let fx = fixture(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);
        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();

        fx.orchestrator.delete(job_id).await.unwrap();
        let deleted = fx.orchestrator.wait(job_id).await.unwrap();
        assert_eq!(deleted.status, JobStatus::Deleted);

        // The simulator is still running, so the slot is still taken.
        let err = fx.orchestrator.run(RunJob::new(record.id)).unwrap_err();
        assert!(matches!(err, SimJobError::Conflict(_)));
        assert_eq!(fx.orchestrator.jobs.running_for(record.id), Some(job_id));

        slot_released(&fx, record.id).await;
        let job = fx.orchestrator.jobs.find_by_id(job_id).unwrap();
        assert_eq!(job.status, JobStatus::Deleted);
        assert!(!job.result_dir.exists());
        assert!(!fx.orchestrator.report_path(job_id).exists());
        assert_eq!(fx.records.get(record.id).unwrap().status, RecordStatus::Idle);

        let next = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        let snapshot = fx.orchestrator.wait(next).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Succeeded);
    }

    /// Counts simulator runs that are live at the same time
    #[derive(Default)]
    struct CountingSimulator {
        live: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Simulator for CountingSimulator {
        async fn run(&self, request: &SimRequest) -> Result<ProcessOutcome, SimJobError> {
            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(live, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(400)).await;
            self.live.fetch_sub(1, Ordering::SeqCst);
            // Gone if the job was deleted meanwhile.
            let _ = std::fs::write(request.result_dir.join("result.csv"), "break,value\n1,5.0\n");
            Ok(ProcessOutcome {
                exit_code: 0,
                elapsed: Duration::from_millis(400),
                diagnostic: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_delete_running_job_never_overlaps_runs() {
        let dir = TempDir::new().unwrap();
        write_entity(dir.path(), "Coverage");
        let entity = load_entities(&dir.path().join("routes.json"))
            .unwrap()
            .remove(0);
        let runner = RunnerConfig::new("unused", vec![]).with_output_wait(Duration::from_millis(200));
        let config = OrchestratorConfig::new(dir.path().join("data"), runner);
        let simulator = Arc::new(CountingSimulator::default());
        let supervisor = Supervisor::new(simulator.clone(), 4, config.runner.output_wait);
        let orchestrator = Orchestrator::new(
            entity,
            &config,
            Arc::new(JobStore::new()),
            Arc::new(InMemoryParameterStore::new()),
            supervisor,
        );
        let parent = Uuid::new_v4();

        let first = orchestrator.submit(parent, Map::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        orchestrator.delete(first).await.unwrap();

        let err = orchestrator.submit(parent, Map::new()).unwrap_err();
        assert!(matches!(err, SimJobError::Conflict(_)));
        assert_eq!(simulator.live.load(Ordering::SeqCst), 1);

        for _ in 0..100 {
            if orchestrator.jobs.running_for(parent).is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let second = orchestrator.submit(parent, Map::new()).unwrap();
        orchestrator.wait(second).await.unwrap();

        assert_eq!(simulator.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let fx = fixture(FakeSimulator::writing("break,value\n"));
        let unknown = Uuid::new_v4();

        assert!(fx.orchestrator.poll(unknown).unwrap_err().is_not_found());
        assert!(fx.orchestrator.delete(unknown).await.unwrap_err().is_not_found());
        assert!(fx.orchestrator.run(RunJob::new(unknown)).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_record_refused_while_running() {
        let fx = fixture(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);
        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();

        let err = fx
            .orchestrator
            .delete_record(RecordRef::new(record.id))
            .await
            .unwrap_err();
        assert!(matches!(err, SimJobError::Conflict(_)));

        fx.orchestrator.wait(job_id).await.unwrap();
        fx.orchestrator
            .delete_record(RecordRef::new(record.id))
            .await
            .unwrap();

        assert!(fx.records.get(record.id).is_none());
        assert!(fx.orchestrator.poll(job_id).unwrap_err().is_not_found());
        assert!(fx.orchestrator.jobs.find_by_parent(record.id).is_empty());
        assert!(fx.orchestrator.jobs.running_for(record.id).is_none());
    }

    #[tokio::test]
    async fn test_delete_record_refused_while_deleted_job_still_runs() {
        let fx = fixture(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);
        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();
        fx.orchestrator.delete(job_id).await.unwrap();

        let err = fx
            .orchestrator
            .delete_record(RecordRef::new(record.id))
            .await
            .unwrap_err();
        assert!(matches!(err, SimJobError::Conflict(_)));

        slot_released(&fx, record.id).await;
        fx.orchestrator
            .delete_record(RecordRef::new(record.id))
            .await
            .unwrap();
        assert!(fx.records.get(record.id).is_none());
    }

    #[tokio::test]
    async fn test_stale_running_job_is_flagged() {
        let fx = fixture(FakeSimulator {
            delay: Duration::from_millis(300),
            ..FakeSimulator::writing("break,value\n1,5.0\n")
        });
        let record = create(&fx);
        let job_id = fx.orchestrator.run(RunJob::new(record.id)).unwrap();

        fx.orchestrator
            .jobs
            .update(job_id, |job| {
                job.started_at = Some(Utc::now() - chrono::Duration::hours(1));
                Ok(())
            })
            .unwrap();

        let snapshot = fx.orchestrator.poll(job_id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert!(snapshot.stale);
        fx.orchestrator.wait(job_id).await.unwrap();
    }
}
