//! Shared fixtures for unit and router tests.

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use tokio::sync::Semaphore;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::candidates::store::MemoryCandidateStore;
use crate::config::Config;
use crate::extract::DocumentExtractor;
use crate::jobs::runner::JobRunner;
use crate::jobs::session::SessionTable;
use crate::llm_client::{LlmError, RankingOracle};
use crate::state::AppState;

const BOUNDARY: &str = "ranker-test-boundary";

/// Oracle that echoes résumé text back as the profile and scores every
/// candidate by name length.
#[derive(Default)]
pub struct ScriptedOracle {
    prompts: Mutex<Vec<String>>,
    fail_ranking: bool,
    /// Each call waits for a permit before answering.
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedOracle {
    pub fn failing_ranking() -> Self {
        Self {
            fail_ranking: true,
            ..Default::default()
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn score_of(name: &str) -> i32 {
        50 + name.len() as i32
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Number of candidates in each ranking prompt, in call order.
    pub fn ranking_calls(&self) -> Vec<usize> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| ranking_section(p))
            .map(|candidates| candidate_names(candidates).count())
            .collect()
    }
}

fn ranking_section(prompt: &str) -> Option<&str> {
    prompt.split_once("Candidates:\n").map(|(_, rest)| rest)
}

fn candidate_names(section: &str) -> impl Iterator<Item = &str> {
    section
        .lines()
        .filter_map(|l| l.strip_prefix("Name:"))
        .map(str::trim)
}

#[async_trait]
impl RankingOracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if let Some(gate) = &self.gate {
            let _ = gate.acquire().await;
        }
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(candidates) = ranking_section(prompt) {
            if self.fail_ranking {
                return Err(LlmError::Api {
                    status: 529,
                    message: "overloaded".to_string(),
                });
            }
            let blocks: Vec<_> = candidate_names(candidates)
                .map(|name| {
                    format!(
                        "Name: {name}\nScore: {}\nReason: scripted",
                        Self::score_of(name)
                    )
                })
                .collect();
            return Ok(blocks.join("\n\n"));
        }

        let resume = prompt
            .rsplit_once("Resume:\n")
            .map(|(_, text)| text.trim())
            .unwrap_or_default();
        Ok(resume.to_string())
    }
}

/// A plain-text résumé already laid out the way the profile parser reads it.
pub fn resume(name: &str) -> String {
    let slug = name.to_lowercase().replace(' ', ".");
    format!(
        "Name: {name}\n\
         Mail: {slug}@example.com\n\
         Linkedin ID: linkedin.com/in/{slug}\n\
         Education: BSc Computer Science\n\
         Work Experience: Backend engineer, 4 years\n\
         Skills: Rust, Postgres"
    )
}

pub fn zip_archive<N: AsRef<str>, C: AsRef<[u8]>>(entries: &[(N, C)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(name.as_ref(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_ref()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// POST /analyze_resumes with whichever of the two fields are given.
pub fn multipart_request(archive: Option<&[u8]>, query: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(archive) = archive {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"resumes_zip\"; filename=\"resumes.zip\"\r\n\
                 Content-Type: application/zip\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(archive);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(query) = query {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"query\"\r\n\r\n\
                 {query}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/analyze_resumes")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn test_config(scratch_dir: &Path) -> Config {
    Config {
        database_url: None,
        anthropic_api_key: "test-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        max_concurrent_jobs: 4,
        session_expiry: Duration::from_secs(3600),
        sweep_interval: None,
        max_upload_bytes: 10 * 1024 * 1024,
        max_unpacked_bytes: 40 * 1024 * 1024,
        scratch_dir: scratch_dir.to_path_buf(),
    }
}

/// App state over in-memory collaborators and `.txt` résumés.
pub fn test_state(oracle: Arc<dyn RankingOracle>, scratch_dir: &Path) -> AppState {
    let config = test_config(scratch_dir);
    let sessions = SessionTable::new();
    let store = Arc::new(MemoryCandidateStore::default());
    let runner = JobRunner::new(
        sessions.clone(),
        Arc::new(DocumentExtractor),
        oracle,
        store.clone(),
        config.max_concurrent_jobs,
    );
    AppState {
        sessions,
        runner,
        store,
        config,
    }
}
