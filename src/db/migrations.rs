//! Database migrations

/// SQL for creating the database schema
pub const INIT_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Trend clusters
CREATE TABLE IF NOT EXISTS trend_clusters (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL DEFAULT 'Pending Label',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);

-- One row per submitted trend; immutable once written
CREATE TABLE IF NOT EXISTS trend_vectors (
    id TEXT PRIMARY KEY,
    cluster_id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,

    FOREIGN KEY (cluster_id) REFERENCES trend_clusters(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_trend_vectors_cluster ON trend_vectors(cluster_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_trend_vectors_created ON trend_vectors(created_at);
"#;
