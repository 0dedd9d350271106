use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::candidates::store::{CandidateStore, MemoryCandidateStore, PgCandidateStore};

const MAX_DB_CONNECTIONS: u32 = 10;

/// Opens the candidate store: PostgreSQL when a database URL is configured,
/// otherwise an in-process store.
pub async fn open_candidate_store(database_url: Option<&str>) -> Result<Arc<dyn CandidateStore>> {
    let Some(database_url) = database_url else {
        warn!("DATABASE_URL not set; candidates are kept in memory and lost on restart");
        return Ok(Arc::new(MemoryCandidateStore::default()));
    };

    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("PostgreSQL connection pool established");

    let store = PgCandidateStore::new(pool);
    store
        .ensure_schema()
        .await
        .context("failed to prepare the candidates table")?;
    Ok(Arc::new(store))
}
