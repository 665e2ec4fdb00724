//! Database repository for CRUD operations

use super::migrations::INIT_SCHEMA;
use super::models::{
    format_timestamp, ClusterRecord, TrendVector, TrendVectorRow, TrendingCluster,
};
use super::store::TrendStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Query error: {0}")]
    QueryError(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),
}

/// Database connection and operations
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // A single connection that never expires, otherwise the memory DB vanishes
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::raw_sql(INIT_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        Ok(())
    }

    /// Get a cluster by ID
    pub async fn get_cluster(&self, id: &str) -> Result<ClusterRecord, DatabaseError> {
        sqlx::query_as::<_, ClusterRecord>("SELECT * FROM trend_clusters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Cluster not found: {}", id)))
    }

    /// Count vectors stored for a cluster
    pub async fn count_cluster_vectors(&self, cluster_id: &str) -> Result<i64, DatabaseError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trend_vectors WHERE cluster_id = ?")
                .bind(cluster_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn insert_vector_row(
        conn: &mut SqliteConnection,
        row: &TrendVectorRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO trend_vectors (id, cluster_id, embedding, dimension, text, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.cluster_id)
        .bind(&row.embedding)
        .bind(row.dimension)
        .bind(&row.text)
        .bind(&row.metadata)
        .bind(&row.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    fn rows_to_vectors(rows: Vec<TrendVectorRow>) -> Result<Vec<TrendVector>, DatabaseError> {
        rows.into_iter().map(TrendVector::try_from).collect()
    }
}

#[async_trait]
impl TrendStore for Database {
    async fn insert_cluster_with_vector(
        &self,
        cluster: &ClusterRecord,
        vector: &TrendVector,
    ) -> Result<(), DatabaseError> {
        let row = vector.to_row()?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO trend_clusters (id, label, created_at, updated_at, metadata)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cluster.id)
        .bind(&cluster.label)
        .bind(&cluster.created_at)
        .bind(&cluster.updated_at)
        .bind(&cluster.metadata)
        .execute(&mut *tx)
        .await?;

        Self::insert_vector_row(&mut *tx, &row).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_trend_vector(&self, vector: &TrendVector) -> Result<(), DatabaseError> {
        let row = vector.to_row()?;
        let mut conn = self.pool.acquire().await?;
        Self::insert_vector_row(&mut conn, &row).await
    }

    async fn list_clusters(&self) -> Result<Vec<ClusterRecord>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, ClusterRecord>("SELECT * FROM trend_clusters ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_trend_vectors(&self) -> Result<Vec<TrendVector>, DatabaseError> {
        let rows = sqlx::query_as::<_, TrendVectorRow>(
            "SELECT * FROM trend_vectors ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_vectors(rows)
    }

    async fn cluster_trends(
        &self,
        cluster_id: &str,
        limit: usize,
    ) -> Result<Vec<TrendVector>, DatabaseError> {
        let rows = sqlx::query_as::<_, TrendVectorRow>(
            r#"
            SELECT * FROM trend_vectors
            WHERE cluster_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(cluster_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Self::rows_to_vectors(rows)
    }

    async fn update_cluster_label(
        &self,
        cluster_id: &str,
        label: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE trend_clusters SET label = ?, updated_at = ? WHERE id = ?")
            .bind(label)
            .bind(format_timestamp(&Utc::now()))
            .bind(cluster_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn trending_clusters(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TrendingCluster>, DatabaseError> {
        Ok(sqlx::query_as::<_, TrendingCluster>(
            r#"
            SELECT
                c.id AS cluster_id,
                c.label AS label,
                COALESCE(SUM(CASE WHEN v.created_at >= ? THEN 1 ELSE 0 END), 0) AS recent_count,
                COUNT(v.id) AS total_count,
                MAX(v.created_at) AS last_activity
            FROM trend_clusters c
            LEFT JOIN trend_vectors v ON v.cluster_id = c.id
            GROUP BY c.id, c.label
            HAVING recent_count > 0
            ORDER BY recent_count DESC, last_activity DESC, c.id ASC
            LIMIT ?
            "#,
        )
        .bind(format_timestamp(&since))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }
}
