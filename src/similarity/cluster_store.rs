//! In-memory cluster cache.
//!
//! Holds every cluster's member vectors and label for the lifetime of an
//! engine. The persistent store is authoritative; this is rebuilt from it on
//! startup and on reindex.

use super::types::ClusterSummary;
use crate::db::{ClusterRecord, DatabaseError, SubmissionMetadata, TrendStore, TrendVector};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One cluster as held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEntry {
    pub label: String,
    pub vectors: Vec<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub metadata: SubmissionMetadata,
}

/// Cluster id -> entry. Ordered so that scans visit ids ascending.
#[derive(Debug, Clone, Default)]
pub struct ClusterStore {
    clusters: BTreeMap<String, ClusterEntry>,
}

impl ClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persistent records.
    ///
    /// Clusters without vectors and vectors of unknown clusters are skipped:
    /// a cluster in memory always has at least one member.
    pub fn from_records(
        clusters: Vec<ClusterRecord>,
        vectors: Vec<TrendVector>,
    ) -> Result<Self, DatabaseError> {
        let mut pending: BTreeMap<String, ClusterEntry> = BTreeMap::new();
        for record in clusters {
            let metadata = record.metadata().unwrap_or_else(|e| {
                tracing::warn!("Cluster {} has unreadable metadata: {}", record.id, e);
                SubmissionMetadata::default()
            });
            pending.insert(
                record.id.clone(),
                ClusterEntry {
                    created_at: record.created_at()?,
                    label: record.label,
                    vectors: Vec::new(),
                    metadata,
                },
            );
        }

        for vector in vectors {
            match pending.get_mut(&vector.cluster_id) {
                Some(entry) => entry.vectors.push(vector.embedding),
                None => tracing::warn!(
                    "Skipping vector {} of unknown cluster {}",
                    vector.id,
                    vector.cluster_id
                ),
            }
        }

        pending.retain(|id, entry| {
            if entry.vectors.is_empty() {
                tracing::warn!("Skipping cluster {} with no vectors", id);
                false
            } else {
                true
            }
        });

        Ok(Self { clusters: pending })
    }

    /// Full reload from the persistent store.
    ///
    /// Prior state is discarded first; on error the store is left empty.
    pub async fn load(&mut self, store: &dyn TrendStore) -> Result<(), DatabaseError> {
        self.clear();

        let clusters = store.list_clusters().await?;
        let vectors = store.list_trend_vectors().await?;
        *self = Self::from_records(clusters, vectors)?;

        tracing::info!(
            "Loaded {} clusters ({} vectors)",
            self.len(),
            self.vector_count()
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
    }

    /// Add a new cluster. Returns false if the id is already taken.
    pub fn create(
        &mut self,
        cluster_id: impl Into<String>,
        first_vector: Vec<f32>,
        label: impl Into<String>,
        created_at: DateTime<Utc>,
        metadata: SubmissionMetadata,
    ) -> bool {
        let cluster_id = cluster_id.into();
        if self.clusters.contains_key(&cluster_id) {
            return false;
        }
        self.clusters.insert(
            cluster_id,
            ClusterEntry {
                label: label.into(),
                vectors: vec![first_vector],
                created_at,
                metadata,
            },
        );
        true
    }

    /// Add a vector to an existing cluster. Returns false for unknown ids.
    pub fn append(&mut self, cluster_id: &str, vector: Vec<f32>) -> bool {
        match self.clusters.get_mut(cluster_id) {
            Some(entry) => {
                entry.vectors.push(vector);
                true
            }
            None => false,
        }
    }

    /// Returns false for unknown ids
    pub fn rename(&mut self, cluster_id: &str, label: impl Into<String>) -> bool {
        match self.clusters.get_mut(cluster_id) {
            Some(entry) => {
                entry.label = label.into();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, cluster_id: &str) -> Option<&ClusterEntry> {
        self.clusters.get(cluster_id)
    }

    pub fn label(&self, cluster_id: &str) -> Option<&str> {
        self.clusters.get(cluster_id).map(|e| e.label.as_str())
    }

    pub fn vectors(&self, cluster_id: &str) -> Option<&[Vec<f32>]> {
        self.clusters.get(cluster_id).map(|e| e.vectors.as_slice())
    }

    pub fn contains(&self, cluster_id: &str) -> bool {
        self.clusters.contains_key(cluster_id)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn vector_count(&self) -> usize {
        self.clusters.values().map(|e| e.vectors.len()).sum()
    }

    /// Clusters in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClusterEntry)> {
        self.clusters.iter()
    }

    /// Dimension of stored vectors, if any are stored
    pub fn dimension(&self) -> Option<usize> {
        self.clusters
            .values()
            .find_map(|e| e.vectors.first())
            .map(|v| v.len())
    }

    pub fn summaries(&self) -> Vec<ClusterSummary> {
        self.clusters
            .iter()
            .map(|(id, entry)| ClusterSummary {
                cluster_id: id.clone(),
                label: entry.label.clone(),
                size: entry.vectors.len(),
                created_at: entry.created_at,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DEFAULT_CLUSTER_LABEL;

    fn store_with(id: &str) -> ClusterStore {
        let mut store = ClusterStore::new();
        assert!(store.create(
            id,
            vec![1.0, 0.0],
            DEFAULT_CLUSTER_LABEL,
            Utc::now(),
            SubmissionMetadata::default()
        ));
        store
    }

    #[test]
    fn test_create_append_rename() {
        let mut store = store_with("cluster_a");
        assert!(store.append("cluster_a", vec![0.0, 1.0]));
        assert_eq!(store.vectors("cluster_a").unwrap().len(), 2);

        assert!(store.rename("cluster_a", "Mob Wife"));
        assert_eq!(store.label("cluster_a"), Some("Mob Wife"));

        assert!(!store.append("cluster_missing", vec![1.0, 1.0]));
        assert!(!store.rename("cluster_missing", "X"));
        assert!(!store.contains("cluster_missing"));
        assert_eq!(store.vector_count(), 2);
        assert_eq!(store.dimension(), Some(2));
    }

    #[test]
    fn test_create_refuses_duplicate_id() {
        let mut store = store_with("cluster_a");
        assert!(!store.create(
            "cluster_a",
            vec![0.0, 1.0],
            "Other",
            Utc::now(),
            SubmissionMetadata::default()
        ));
        assert_eq!(store.vectors("cluster_a").unwrap().len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered_by_id() {
        let mut store = store_with("cluster_c");
        for id in ["cluster_a", "cluster_b"] {
            store.create(id, vec![1.0], "L", Utc::now(), SubmissionMetadata::default());
        }
        let ids: Vec<&str> = store.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["cluster_a", "cluster_b", "cluster_c"]);
    }

    #[test]
    fn test_from_records_skips_empty_and_orphans() {
        let clusters = vec![
            ClusterRecord::new("cluster_full", None).with_label("Full"),
            ClusterRecord::new("cluster_empty", None),
        ];
        let vectors = vec![
            TrendVector::new("cluster_full", vec![1.0, 0.0], "one", None),
            TrendVector::new("cluster_full", vec![0.0, 1.0], "two", None),
            TrendVector::new("cluster_ghost", vec![1.0, 1.0], "orphan", None),
        ];

        let store = ClusterStore::from_records(clusters, vectors).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.label("cluster_full"), Some("Full"));
        assert_eq!(store.vectors("cluster_full").unwrap().len(), 2);
        assert!(!store.contains("cluster_empty"));

        let summaries = store.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].size, 2);
    }
}
