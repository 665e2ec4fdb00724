//! Database models

use super::repository::DatabaseError;
use crate::embedding::{blob_to_embedding, embedding_to_blob};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label given to clusters until someone names them
pub const DEFAULT_CLUSTER_LABEL: &str = "Pending Label";

/// Label reported for the submission that founds a cluster
pub const NEW_CLUSTER_LABEL: &str = "New Cluster";

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryError(format!("Invalid timestamp {:?}: {}", raw, e)))
}

/// Metadata attached to a trend submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Anything else the caller wants kept alongside the submission
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl SubmissionMetadata {
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_submitted_at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(submitted_at);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.platform.is_none()
            && self.category.is_none()
            && self.user_id.is_none()
            && self.submitted_at.is_none()
            && self.extra.is_empty()
    }
}

/// Cluster record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClusterRecord {
    pub id: String,
    pub label: String,
    pub created_at: String,
    pub updated_at: String,
    /// JSON-encoded metadata of the founding submission
    pub metadata: String,
}

impl ClusterRecord {
    pub fn new(id: impl Into<String>, metadata: Option<&SubmissionMetadata>) -> Self {
        let now = format_timestamp(&Utc::now());
        let metadata = metadata
            .and_then(|m| serde_json::to_string(m).ok())
            .unwrap_or_else(|| "{}".to_string());
        Self {
            id: id.into(),
            label: DEFAULT_CLUSTER_LABEL.to_string(),
            created_at: now.clone(),
            updated_at: now,
            metadata,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn created_at(&self) -> Result<DateTime<Utc>, DatabaseError> {
        parse_timestamp(&self.created_at)
    }

    pub fn metadata(&self) -> Result<SubmissionMetadata, DatabaseError> {
        Ok(serde_json::from_str(&self.metadata)?)
    }
}

/// Raw trend vector row as stored in SQLite
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendVectorRow {
    pub id: String,
    pub cluster_id: String,
    pub embedding: Vec<u8>,
    pub dimension: i64,
    pub text: String,
    pub metadata: String,
    pub created_at: String,
}

/// One submitted trend with its embedding and assigned cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendVector {
    pub id: String,
    pub cluster_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: SubmissionMetadata,
    pub created_at: DateTime<Utc>,
}

impl TrendVector {
    pub fn new(
        cluster_id: impl Into<String>,
        embedding: Vec<f32>,
        text: impl Into<String>,
        metadata: Option<SubmissionMetadata>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cluster_id: cluster_id.into(),
            embedding,
            text: text.into(),
            metadata: metadata.unwrap_or_default(),
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at.trunc_subsecs(6);
        self
    }

    /// Drop the embedding, e.g. before printing a listing
    pub fn without_embedding(mut self) -> Self {
        self.embedding = Vec::new();
        self
    }

    pub fn to_row(&self) -> Result<TrendVectorRow, DatabaseError> {
        Ok(TrendVectorRow {
            id: self.id.clone(),
            cluster_id: self.cluster_id.clone(),
            embedding: embedding_to_blob(&self.embedding),
            dimension: self.embedding.len() as i64,
            text: self.text.clone(),
            metadata: serde_json::to_string(&self.metadata)?,
            created_at: format_timestamp(&self.created_at),
        })
    }
}

impl TryFrom<TrendVectorRow> for TrendVector {
    type Error = DatabaseError;

    fn try_from(row: TrendVectorRow) -> Result<Self, Self::Error> {
        let embedding = blob_to_embedding(&row.embedding)
            .map_err(|e| DatabaseError::InvalidEmbedding(format!("{}: {}", row.id, e)))?;
        if embedding.len() as i64 != row.dimension {
            return Err(DatabaseError::InvalidEmbedding(format!(
                "{}: expected {} values, found {}",
                row.id,
                row.dimension,
                embedding.len()
            )));
        }

        Ok(Self {
            embedding,
            metadata: serde_json::from_str(&row.metadata)?,
            created_at: parse_timestamp(&row.created_at)?,
            id: row.id,
            cluster_id: row.cluster_id,
            text: row.text,
        })
    }
}

/// Cluster ranked by recent submission volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrendingCluster {
    pub cluster_id: String,
    pub label: String,
    pub recent_count: i64,
    pub total_count: i64,
    pub last_activity: Option<String>,
}
