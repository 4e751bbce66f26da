//! Storage gateway for finished intakes
//!
//! Rows are appended: persisting the same call twice leaves two rows and `retrieve`
//! returns the first. Exactly-once writes are the session's job, not the store's.

use async_trait::async_trait;
use db::{
    models::collected_information::{
        CollectedInformation, CollectedInformationError, CreateCollectedInformation,
    },
    DBService,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<CollectedInformationError> for StorageError {
    fn from(err: CollectedInformationError) -> Self {
        match err {
            CollectedInformationError::Database(e) => StorageError::Database(e),
        }
    }
}

/// What is read back for the confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredIntake {
    pub call_id: String,
    pub name: String,
    pub choice_value: String,
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn persist(&self, call_id: &str, name: &str, choice_value: &str)
        -> Result<(), StorageError>;

    async fn retrieve(&self, call_id: &str) -> Result<Option<StoredIntake>, StorageError>;
}

/// SQLite-backed gateway. Each operation checks a connection out of the pool and
/// returns it when done.
#[derive(Clone)]
pub struct SqliteStorage {
    db: DBService,
}

impl SqliteStorage {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: Option<&str>) -> Result<Self, StorageError> {
        let db = match database_url {
            Some(url) => DBService::new_with_url(url).await?,
            None => DBService::new().await?,
        };
        Ok(Self::new(db))
    }
}

#[async_trait]
impl StorageGateway for SqliteStorage {
    async fn persist(
        &self,
        call_id: &str,
        name: &str,
        choice_value: &str,
    ) -> Result<(), StorageError> {
        let mut conn = self.db.pool.acquire().await?;
        let row = CreateCollectedInformation {
            call_id: call_id.to_string(),
            name: name.to_string(),
            choice_value: choice_value.to_string(),
        };
        CollectedInformation::create(&mut *conn, &row).await?;
        tracing::debug!("Persisted intake for call {}", call_id);
        Ok(())
    }

    async fn retrieve(&self, call_id: &str) -> Result<Option<StoredIntake>, StorageError> {
        let mut conn = self.db.pool.acquire().await?;
        let row = CollectedInformation::find_by_call_id(&mut *conn, call_id).await?;
        Ok(row.map(|row| StoredIntake {
            call_id: row.call_id,
            name: row.name.unwrap_or_default(),
            choice_value: row.choice_value.unwrap_or_default(),
        }))
    }
}

/// Process-local gateway for dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    rows: RwLock<Vec<StoredIntake>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, call_id: &str) -> usize {
        self.rows
            .read()
            .await
            .iter()
            .filter(|row| row.call_id == call_id)
            .count()
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn persist(
        &self,
        call_id: &str,
        name: &str,
        choice_value: &str,
    ) -> Result<(), StorageError> {
        self.rows.write().await.push(StoredIntake {
            call_id: call_id.to_string(),
            name: name.to_string(),
            choice_value: choice_value.to_string(),
        });
        Ok(())
    }

    async fn retrieve(&self, call_id: &str) -> Result<Option<StoredIntake>, StorageError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|row| row.call_id == call_id)
            .cloned())
    }
}
