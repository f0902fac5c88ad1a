//! Job Repository
//!
//! In-memory state store for simulation jobs.
//!
//! Locking is sharded: jobs are keyed by `job_id`, the running-slot map is
//! keyed by `parent_ref`, and neither is ever locked while holding the other
//! except in [`JobStore::start`], which always takes the slot first.
//!
//! A watcher lives only until its job reaches a terminal status; jobs
//! themselves stay until their parent record is purged.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use simjob_core::SimJobError;
use simjob_core::domain::job::{JobStatus, SimJob};
use tokio::sync::watch;
use uuid::Uuid;

/// Slot holder marking a parent record as being deleted
const DELETING: Uuid = Uuid::nil();

#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, SimJob>,
    /// `parent_ref -> job_id` of the job currently holding the run slot
    running: DashMap<Uuid, Uuid>,
    watchers: DashMap<Uuid, watch::Sender<JobStatus>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims the run slot of the job's parent record and moves
    /// the job to `running`
    ///
    /// Fails with [`SimJobError::Conflict`] when another job already holds the
    /// slot; the job is then not stored at all.
    pub fn start(&self, mut job: SimJob) -> Result<SimJob, SimJobError> {
        match self.running.entry(job.parent_ref) {
            Entry::Occupied(slot) => Err(busy(job.parent_ref, *slot.get())),
            Entry::Vacant(slot) => {
                job.mark_running()?;
                let (tx, _) = watch::channel(job.status);
                self.watchers.insert(job.job_id, tx);
                self.jobs.insert(job.job_id, job.clone());
                slot.insert(job.job_id);
                Ok(job)
            }
        }
    }

    /// Holds the run slot of `parent_ref` until the claim is dropped
    ///
    /// Used while a record is deleted so no job can start for it meanwhile.
    /// Fails with [`SimJobError::Conflict`] when the slot is taken.
    pub fn claim_parent(&self, parent_ref: Uuid) -> Result<ParentClaim<'_>, SimJobError> {
        match self.running.entry(parent_ref) {
            Entry::Occupied(slot) => Err(busy(parent_ref, *slot.get())),
            Entry::Vacant(slot) => {
                slot.insert(DELETING);
                Ok(ParentClaim {
                    store: self,
                    parent_ref,
                })
            }
        }
    }

    /// Find a job by ID
    pub fn find_by_id(&self, job_id: Uuid) -> Option<SimJob> {
        self.jobs.get(&job_id).map(|job| job.clone())
    }

    /// Find all jobs of a parent record
    pub fn find_by_parent(&self, parent_ref: Uuid) -> Vec<SimJob> {
        let mut jobs: Vec<SimJob> = self
            .jobs
            .iter()
            .filter(|job| job.parent_ref == parent_ref)
            .map(|job| job.clone())
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Job currently holding the run slot of `parent_ref`
    pub fn running_for(&self, parent_ref: Uuid) -> Option<Uuid> {
        self.running.get(&parent_ref).map(|id| *id)
    }

    /// Applies `f` to the stored job and publishes its status afterwards
    pub fn update<T>(
        &self,
        job_id: Uuid,
        f: impl FnOnce(&mut SimJob) -> Result<T, SimJobError>,
    ) -> Result<T, SimJobError> {
        let (result, status) = {
            let mut job = self
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| SimJobError::NotFound(format!("Job {} not found", job_id)))?;
            let result = f(&mut *job);
            (result, job.status)
        };

        if let Some(tx) = self.watchers.get(&job_id) {
            tx.send_if_modified(|current| {
                let changed = *current != status;
                *current = status;
                changed
            });
        }
        if status.is_terminal() {
            self.watchers.remove(&job_id);
        }
        result
    }

    /// Releases the run slot of `parent_ref` if `job_id` still holds it
    pub fn release(&self, parent_ref: Uuid, job_id: Uuid) -> bool {
        self.running
            .remove_if(&parent_ref, |_, holder| *holder == job_id)
            .is_some()
    }

    /// Drops every job of `parent_ref`, returning how many were removed
    pub fn purge_parent(&self, parent_ref: Uuid) -> usize {
        let ids: Vec<Uuid> = self
            .jobs
            .iter()
            .filter(|job| job.parent_ref == parent_ref)
            .map(|job| job.job_id)
            .collect();
        for id in &ids {
            self.jobs.remove(id);
            self.watchers.remove(id);
        }
        ids.len()
    }

    /// Status updates of a job, starting from its current status
    ///
    /// `None` once the job is terminal or unknown.
    pub fn subscribe(&self, job_id: Uuid) -> Option<watch::Receiver<JobStatus>> {
        self.watchers.get(&job_id).map(|tx| tx.subscribe())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn busy(parent_ref: Uuid, holder: Uuid) -> SimJobError {
    if holder == DELETING {
        SimJobError::Conflict(format!("Record {} is being deleted", parent_ref))
    } else {
        SimJobError::Conflict(format!(
            "Job {} is already running for record {}",
            holder, parent_ref
        ))
    }
}

/// Exclusive hold on a parent's run slot, see [`JobStore::claim_parent`]
pub struct ParentClaim<'a> {
    store: &'a JobStore,
    parent_ref: Uuid,
}

impl Drop for ParentClaim<'_> {
    fn drop(&mut self) {
        self.store.release(self.parent_ref, DELETING);
    }
}
