//! Result types returned by the similarity engine

use crate::db::SubmissionMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score of a submission against one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterScore {
    /// Mean similarity to every member; drives assignment
    pub avg_score: f32,
    /// Best single-member similarity; reported only
    pub max_score: f32,
    pub label: String,
}

/// Outcome of processing one trend submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub assigned_cluster: String,
    pub score: f32,
    pub label: String,
    pub new_cluster: bool,
    pub all_scores: BTreeMap<String, ClusterScore>,
    pub metadata: Option<SubmissionMetadata>,
}

/// Dry-run scoring of a text, nothing persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPreview {
    pub best_cluster: Option<String>,
    pub score: f32,
    pub would_create_cluster: bool,
    pub all_scores: BTreeMap<String, ClusterScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatistics {
    pub cluster_id: String,
    pub label: String,
    pub size: usize,
    pub avg_intra_similarity: f32,
    pub centroid_norm: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: String,
    pub label: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
}
