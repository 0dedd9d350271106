use std::sync::Arc;

use crate::candidates::store::CandidateStore;
use crate::config::Config;
use crate::jobs::runner::JobRunner;
use crate::jobs::session::SessionTable;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Live résumé jobs. The runner holds a handle to the same table.
    pub sessions: SessionTable,
    pub runner: JobRunner,
    pub store: Arc<dyn CandidateStore>,
    pub config: Config,
}
