use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectedInformationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// One finished intake, as written at the end of a call.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectedInformation {
    pub call_id: String,
    pub name: Option<String>,
    pub choice_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollectedInformation {
    pub call_id: String,
    pub name: String,
    pub choice_value: String,
}

impl CollectedInformation {
    /// Appends a row. No uniqueness is enforced on `call_id`, so writing the same call
    /// twice leaves two rows behind.
    pub async fn create<'e, E>(
        executor: E,
        data: &CreateCollectedInformation,
    ) -> Result<(), CollectedInformationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO collected_information (call_id, name, choice_value)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&data.call_id)
        .bind(&data.name)
        .bind(&data.choice_value)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// First row written for `call_id`, if any.
    pub async fn find_by_call_id<'e, E>(
        executor: E,
        call_id: &str,
    ) -> Result<Option<Self>, CollectedInformationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query_as::<_, CollectedInformation>(
            r#"
            SELECT call_id, name, choice_value FROM collected_information
            WHERE call_id = ?1
            ORDER BY rowid ASC
            LIMIT 1
            "#,
        )
        .bind(call_id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    pub async fn count_by_call_id<'e, E>(
        executor: E,
        call_id: &str,
    ) -> Result<i64, CollectedInformationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM collected_information WHERE call_id = ?1"#,
        )
        .bind(call_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
