//! Candidate Store: where the job pipeline persists structured candidates.
//!
//! `PgCandidateStore` is used when `DATABASE_URL` is set; otherwise the
//! service falls back to `MemoryCandidateStore`, which the tests use too.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::candidates::models::CandidateRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn insert(&self, record: &CandidateRecord) -> Result<(), StoreError>;

    /// Every stored candidate, highest score first.
    async fn find_all(&self) -> Result<Vec<CandidateRecord>, StoreError>;

    async fn find_by_filename(&self, file_name: &str)
        -> Result<Option<CandidateRecord>, StoreError>;
}

pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `candidates` table and its index if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candidates (
                id              UUID PRIMARY KEY,
                session_id      UUID NOT NULL,
                file_name       TEXT NOT NULL,
                name            TEXT NOT NULL,
                mail            TEXT NOT NULL,
                linkedin        TEXT NOT NULL,
                education       TEXT NOT NULL,
                work_experience TEXT NOT NULL,
                skills          TEXT[] NOT NULL,
                rank            INTEGER NOT NULL,
                score           INTEGER NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS candidates_file_name_idx ON candidates (file_name)",
        )
        .execute(&self.pool)
        .await?;

        info!("Candidate schema ready");
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn insert(&self, record: &CandidateRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO candidates
                (id, session_id, file_name, name, mail, linkedin, education,
                 work_experience, skills, rank, score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(record.session_id)
        .bind(&record.file_name)
        .bind(&record.name)
        .bind(&record.mail)
        .bind(&record.linkedin)
        .bind(&record.education)
        .bind(&record.work_experience)
        .bind(&record.skills)
        .bind(record.rank)
        .bind(record.score)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let rows = sqlx::query_as::<_, CandidateRecord>(
            "SELECT * FROM candidates ORDER BY score DESC, created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_filename(
        &self,
        file_name: &str,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        let row = sqlx::query_as::<_, CandidateRecord>(
            "SELECT * FROM candidates WHERE file_name = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(file_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryCandidateStore {
    records: RwLock<Vec<CandidateRecord>>,
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn insert(&self, record: &CandidateRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<CandidateRecord>, StoreError> {
        let mut records = self.records.read().await.clone();
        records.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(records)
    }

    async fn find_by_filename(
        &self,
        file_name: &str,
    ) -> Result<Option<CandidateRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .rev()
            .find(|r| r.file_name == file_name)
            .cloned())
    }
}
