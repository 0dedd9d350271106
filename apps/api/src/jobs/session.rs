//! Session Table: in-memory registry of résumé jobs and their progress.
//!
//! Backed by a `DashMap`, so a poll on one session never waits on writes to
//! another. Each session is written only by the job runner that owns it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

/// Progress marker of a job.
///
/// Clients see the numeric phases `0..=3` and the strings `"Starting"` and
/// `"Error"`, so serialization is hand-written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Created, waiting for a worker.
    Starting,
    /// 0: the batch's files are being read and structured.
    Extracting,
    /// 1: extraction done, ranking in progress.
    Ranking,
    /// 2: ranking done, candidates being persisted.
    Persisting,
    /// 3: every batch finished.
    Completed,
    Error,
}

impl JobStatus {
    /// Numeric phase reported to clients, if this status has one.
    pub fn phase(self) -> Option<u8> {
        match self {
            JobStatus::Extracting => Some(0),
            JobStatus::Ranking => Some(1),
            JobStatus::Persisting => Some(2),
            JobStatus::Completed => Some(3),
            JobStatus::Starting | JobStatus::Error => None,
        }
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self, self.phase()) {
            (_, Some(phase)) => serializer.serialize_u8(phase),
            (JobStatus::Error, None) => serializer.serialize_str("Error"),
            (_, None) => serializer.serialize_str("Starting"),
        }
    }
}

/// What a successful job reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub summary: String,
    pub query_used: String,
    pub num_files: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobResult {
    Completed(JobSummary),
    Failed { error: String },
}

/// 1-based batch currently being processed, out of `total_batches`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub batch: usize,
    pub total_batches: usize,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub query: String,
    pub status: JobStatus,
    pub result: Option<JobResult>,
    pub progress: Option<BatchProgress>,
    /// Last touched; drives expiry.
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(Uuid),
}

#[derive(Clone, Default)]
pub struct SessionTable {
    sessions: Arc<DashMap<Uuid, Session>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session in `Starting` and returns its identifier.
    pub fn create(&self, query: &str) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if let Entry::Vacant(slot) = self.sessions.entry(id) {
                slot.insert(Session {
                    query: query.to_string(),
                    status: JobStatus::Starting,
                    result: None,
                    progress: None,
                    timestamp: Utc::now(),
                });
                return id;
            }
        }
    }

    /// Snapshot of the session, if it is still live.
    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn set_status(&self, id: Uuid, status: JobStatus) -> Result<(), SessionError> {
        self.update(id, |s| s.status = status)
    }

    /// Enters phase 0 for the given batch.
    pub fn start_batch(&self, id: Uuid, batch: usize, total_batches: usize) -> Result<(), SessionError> {
        self.update(id, |s| {
            s.status = JobStatus::Extracting;
            s.progress = Some(BatchProgress {
                batch,
                total_batches,
            });
        })
    }

    pub fn set_result(&self, id: Uuid, result: JobResult) -> Result<(), SessionError> {
        self.update(id, |s| s.result = Some(result))
    }

    pub fn touch(&self, id: Uuid) -> Result<(), SessionError> {
        self.update(id, |s| s.timestamp = Utc::now())
    }

    /// Removes every session last touched more than `expiry` before `now`.
    /// Returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>, expiry: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| {
            let expired = (now - session.timestamp)
                .to_std()
                .map(|age| age > expiry)
                .unwrap_or(false);
            !expired
        });
        before.saturating_sub(self.sessions.len())
    }

    pub fn live_count(&self) -> usize {
        self.sessions.len()
    }

    fn update(&self, id: Uuid, apply: impl FnOnce(&mut Session)) -> Result<(), SessionError> {
        let mut session = self.sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        apply(session.value_mut());
        Ok(())
    }

    #[cfg(test)]
    pub fn backdate(&self, id: Uuid, by: chrono::Duration) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.timestamp -= by;
        }
    }
}

/// Sweeps expired sessions every `interval` until the returned task is aborted.
pub fn spawn_sweeper(table: SessionTable, interval: Duration, expiry: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = table.sweep(Utc::now(), expiry);
            if removed > 0 {
                info!(removed, live = table.live_count(), "Swept expired sessions");
            } else {
                debug!(live = table.live_count(), "Session sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_status_wire_values() {
        let values: Vec<_> = [
            JobStatus::Starting,
            JobStatus::Extracting,
            JobStatus::Ranking,
            JobStatus::Persisting,
            JobStatus::Completed,
            JobStatus::Error,
        ]
        .iter()
        .map(|s| serde_json::to_value(s).unwrap())
        .collect();
        assert_eq!(
            values,
            vec![json!("Starting"), json!(0), json!(1), json!(2), json!(3), json!("Error")]
        );
    }

    #[test]
    fn test_result_wire_shapes() {
        let done = JobResult::Completed(JobSummary {
            summary: "Resume analysis complete".to_string(),
            query_used: "Rust".to_string(),
            num_files: 2,
        });
        assert_eq!(
            serde_json::to_value(done).unwrap(),
            json!({"summary": "Resume analysis complete", "query_used": "Rust", "num_files": 2})
        );
        let failed = JobResult::Failed {
            error: "boom".to_string(),
        };
        assert_eq!(serde_json::to_value(failed).unwrap(), json!({"error": "boom"}));
    }

    #[test]
    fn test_create_starts_pollable() {
        let table = SessionTable::new();
        let id = table.create("Senior backend engineer");

        let session = table.get(&id).unwrap();
        assert_eq!(session.status, JobStatus::Starting);
        assert_eq!(session.query, "Senior backend engineer");
        assert!(session.result.is_none());
        assert!(session.progress.is_none());
    }

    #[test]
    fn test_create_yields_distinct_ids() {
        let table = SessionTable::new();
        let ids: std::collections::HashSet<_> = (0..100).map(|_| table.create("q")).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(table.live_count(), 100);
    }

    #[test]
    fn test_mutators_on_unknown_session() {
        let table = SessionTable::new();
        let id = Uuid::new_v4();
        assert_eq!(
            table.set_status(id, JobStatus::Ranking),
            Err(SessionError::NotFound(id))
        );
        assert!(table.touch(id).is_err());
        assert!(table.start_batch(id, 1, 1).is_err());
        assert!(table.get(&id).is_none());
    }

    #[test]
    fn test_start_batch_records_progress() {
        let table = SessionTable::new();
        let id = table.create("q");
        table.start_batch(id, 2, 3).unwrap();

        let session = table.get(&id).unwrap();
        assert_eq!(session.status, JobStatus::Extracting);
        assert_eq!(
            session.progress,
            Some(BatchProgress {
                batch: 2,
                total_batches: 3
            })
        );
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let table = SessionTable::new();
        let old = table.create("old");
        let fresh = table.create("fresh");
        table.backdate(old, chrono::Duration::minutes(61));
        table.backdate(fresh, chrono::Duration::minutes(59));

        assert_eq!(table.sweep(Utc::now(), HOUR), 1);
        assert!(table.get(&old).is_none());
        assert!(table.get(&fresh).is_some());
    }

    #[test]
    fn test_touch_rescues_from_sweep() {
        let table = SessionTable::new();
        let id = table.create("q");
        table.backdate(id, chrono::Duration::hours(2));
        table.touch(id).unwrap();

        assert_eq!(table.sweep(Utc::now(), HOUR), 0);
        assert!(table.get(&id).is_some());
    }

    #[test]
    fn test_writes_after_sweep_are_dropped() {
        let table = SessionTable::new();
        let id = table.create("q");
        table.backdate(id, chrono::Duration::hours(2));
        table.sweep(Utc::now(), HOUR);

        assert!(table.set_status(id, JobStatus::Completed).is_err());
        assert!(table.get(&id).is_none(), "a late write must not resurrect the session");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_removes_expired_sessions() {
        let table = SessionTable::new();
        let id = table.create("q");
        table.backdate(id, chrono::Duration::hours(2));

        let sweeper = spawn_sweeper(table.clone(), Duration::from_secs(60), HOUR);
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(table.get(&id).is_none());
        sweeper.abort();
    }
}
