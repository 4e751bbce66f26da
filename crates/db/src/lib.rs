use std::str::FromStr;

use sqlx::{
    Error, Pool, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use utils::assets::database_url;

pub mod models;

const COLLECTED_INFORMATION_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collected_information (
        call_id TEXT NOT NULL,
        name TEXT,
        choice_value TEXT
    );
"#;

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (or create) the database under the asset directory.
    pub async fn new() -> Result<DBService, Error> {
        Self::new_with_url(&database_url()).await
    }

    /// Open (or create) the database at `database_url`.
    pub async fn new_with_url(database_url: &str) -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        ensure_schema(&pool).await?;
        tracing::debug!("Connected to intake database at {}", database_url);
        Ok(DBService { pool })
    }

    /// Private in-memory database, used for dry runs.
    pub async fn in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // every connection to :memory: is a separate database, so pin the pool to one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        ensure_schema(&pool).await?;
        Ok(DBService { pool })
    }
}

/// The table is created in place; there is no migration history to replay.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), Error> {
    sqlx::query(COLLECTED_INFORMATION_SCHEMA)
        .execute(pool)
        .await?;
    Ok(())
}
