use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;

use crate::entities::{AnalysisJob, JobState, JobStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {job_id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job {0} already exists")]
    AlreadyExists(String),
}

/// Keyed storage for analysis jobs.
///
/// Readers always see a whole job, either before or after an update.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: AnalysisJob) -> Result<(), JobStoreError>;

    fn get(&self, job_id: &str) -> Option<AnalysisJob>;

    /// Move a job to `next`, enforcing the forward-only lifecycle.
    fn transition(&self, job_id: &str, next: JobState) -> Result<AnalysisJob, JobStoreError>;
}

/// Process-local store backed by a sharded concurrent map.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<String, AnalysisJob>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: AnalysisJob) -> Result<(), JobStoreError> {
        use dashmap::mapref::entry::Entry;

        match self.jobs.entry(job.job_id.clone()) {
            Entry::Occupied(_) => Err(JobStoreError::AlreadyExists(job.job_id)),
            Entry::Vacant(slot) => {
                slot.insert(job);
                Ok(())
            }
        }
    }

    fn get(&self, job_id: &str) -> Option<AnalysisJob> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    fn transition(&self, job_id: &str, next: JobState) -> Result<AnalysisJob, JobStoreError> {
        // get_mut holds the shard write lock for the whole check-and-set
        let mut entry = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))?;

        let from = entry.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            return Err(JobStoreError::InvalidTransition {
                job_id: job_id.to_string(),
                from,
                to,
            });
        }

        entry.state = next;
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }
}
