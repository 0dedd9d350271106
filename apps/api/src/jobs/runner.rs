//! Job Runner: drives one session through extract → rank → persist, batch by
//! batch, and always removes the job's workspace before reporting a terminal
//! status.
//!
//! Jobs run as spawned tasks gated by a semaphore, so at most
//! `max_concurrent_jobs` pipelines make progress at once. A job waiting for a
//! permit stays in `Starting`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::candidates::models::{CandidateProfile, CandidateRecord};
use crate::candidates::store::{CandidateStore, StoreError};
use crate::extract::{ExtractError, TextExtractor};
use crate::jobs::ranking::rank_candidates;
use crate::jobs::session::{JobResult, JobStatus, JobSummary, SessionError, SessionTable};
use crate::jobs::workspace::JobWorkspace;
use crate::llm_client::prompts::extraction_prompt;
use crate::llm_client::{LlmError, RankingOracle};

/// Files processed together through one extract → rank → persist cycle.
pub const BATCH_SIZE: usize = 5;

const COMPLETION_NOTE: &str = "Resume analysis complete";

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("ranking oracle call failed")]
    Oracle(#[from] LlmError),

    #[error("failed to store candidate")]
    Store(#[from] StoreError),

    #[error("extraction task failed")]
    Task(#[from] tokio::task::JoinError),
}

/// A session whose archive has been unpacked and is ready to run.
pub struct Job {
    pub session_id: Uuid,
    pub workspace: JobWorkspace,
}

#[derive(Clone)]
pub struct JobRunner {
    sessions: SessionTable,
    extractor: Arc<dyn TextExtractor>,
    oracle: Arc<dyn RankingOracle>,
    store: Arc<dyn CandidateStore>,
    permits: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(
        sessions: SessionTable,
        extractor: Arc<dyn TextExtractor>,
        oracle: Arc<dyn RankingOracle>,
        store: Arc<dyn CandidateStore>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            sessions,
            extractor,
            oracle,
            store,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Starts the job in the background and returns immediately.
    pub fn submit(&self, job: Job) -> JoinHandle<()> {
        let runner = self.clone();
        let span = info_span!("resume_job", session_id = %job.session_id);
        tokio::spawn(async move { runner.run(job).await }.instrument(span))
    }

    async fn run(self, job: Job) {
        let Job {
            session_id,
            workspace,
        } = job;

        // Only fails once the semaphore is closed, which never happens.
        let _permit = self.permits.acquire().await.ok();

        let Some(query) = self.sessions.get(&session_id).map(|s| s.query) else {
            warn!("Session expired before its job started");
            workspace.cleanup();
            return;
        };

        let num_files = workspace.files().len();
        info!(files = num_files, "Resume job started");

        let outcome = self
            .process(session_id, &query, workspace.path(), workspace.files())
            .await;
        workspace.cleanup();

        match outcome {
            Ok(()) => {
                info!(files = num_files, "Resume job completed");
                let summary = JobSummary {
                    summary: COMPLETION_NOTE.to_string(),
                    query_used: query,
                    num_files,
                };
                // Result before status: a reader seeing 3 always finds the summary.
                self.record(self.sessions.set_result(session_id, JobResult::Completed(summary)));
                self.record(self.sessions.set_status(session_id, JobStatus::Completed));
            }
            Err(e) => {
                let e = anyhow::Error::from(e);
                error!("Resume job failed: {e:#}");
                let failure = JobResult::Failed {
                    error: format!("{e:#}"),
                };
                self.record(self.sessions.set_result(session_id, failure));
                self.record(self.sessions.set_status(session_id, JobStatus::Error));
            }
        }
        self.record(self.sessions.touch(session_id));
    }

    async fn process(
        &self,
        session_id: Uuid,
        query: &str,
        root: &Path,
        files: &[PathBuf],
    ) -> Result<(), JobError> {
        let total_batches = files.len().div_ceil(BATCH_SIZE);

        for (index, batch) in files.chunks(BATCH_SIZE).enumerate() {
            let batch_no = index + 1;
            info!(batch = batch_no, total_batches, files = batch.len(), "Processing batch");

            self.record(self.sessions.start_batch(session_id, batch_no, total_batches));
            let profiles = self.extract_profiles(root, batch).await?;

            self.record(self.sessions.set_status(session_id, JobStatus::Ranking));
            let ranking_text = rank_candidates(self.oracle.as_ref(), &profiles, query).await?;

            self.record(self.sessions.set_status(session_id, JobStatus::Persisting));
            for profile in &profiles {
                let record = CandidateRecord::from_profile(session_id, profile, &ranking_text);
                debug!(file = %record.file_name, score = record.score, "Storing candidate");
                self.store.insert(&record).await?;
            }
            // `profiles` and `ranking_text` are released here, before the next batch.
        }

        Ok(())
    }

    async fn extract_profiles(
        &self,
        root: &Path,
        batch: &[PathBuf],
    ) -> Result<Vec<CandidateProfile>, JobError> {
        let mut profiles = Vec::with_capacity(batch.len());
        for path in batch {
            let extractor = Arc::clone(&self.extractor);
            let owned = path.clone();
            let text = tokio::task::spawn_blocking(move || extractor.extract(&owned)).await??;

            let info = self.oracle.complete(&extraction_prompt(&text)).await?;
            profiles.push(CandidateProfile {
                file_name: file_name_of(root, path),
                info,
            });
        }
        Ok(profiles)
    }

    /// Session writes fail only when the sweep already dropped the session;
    /// the job keeps going and the write is lost.
    fn record(&self, update: Result<(), SessionError>) {
        if let Err(e) = update {
            debug!("Dropping session update: {e}");
        }
    }
}

/// Archive member name of `path`, relative to the workspace root and joined
/// with `/`, so `a/cv.pdf` and `b/cv.pdf` stay distinct.
fn file_name_of(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
