//! Read-side graph traversal.
//!
//! All three queries return a [`GraphSlice`] of deduplicated nodes plus the
//! edges among them, so the caller can render any of them the same way.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::error::{AppResult, StorageError, ThoughtError};
use crate::storage::{Branch, GraphSlice, Storage, Thought};

/// Upper bound on seeds per batch request.
pub const MAX_BATCH_IDS: usize = 100;

/// Neighbourhood and subgraph queries over the store.
#[derive(Clone)]
pub struct RetrievalEngine {
    storage: Arc<dyn Storage>,
}

impl RetrievalEngine {
    /// Create a new retrieval engine
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Get a single thought without neighbours.
    pub async fn get(&self, id: &str) -> AppResult<Thought> {
        self.storage
            .get_thought(id)
            .await?
            .ok_or_else(|| thought_not_found(id).into())
    }

    /// Branches leaving a thought, oldest first.
    pub async fn outgoing_branches(&self, id: &str) -> AppResult<Vec<Branch>> {
        // Distinguish "no branches" from "no such thought".
        self.get(id).await?;
        Ok(self.storage.get_outgoing_branches(id).await?)
    }

    /// A thought, its children, its parent, and the edges connecting them.
    pub async fn get_with_neighbors(&self, id: &str) -> AppResult<GraphSlice> {
        let slice = self.storage.neighborhood(&[id.to_string()]).await?;
        if !slice.nodes.iter().any(|n| n.id == id) {
            return Err(thought_not_found(id).into());
        }

        check_single_parent(&slice.edges)?;
        Ok(dedup(slice))
    }

    /// Union of [`get_with_neighbors`](Self::get_with_neighbors) over `ids`,
    /// fetched in one round trip. Unknown ids contribute nothing.
    pub async fn get_batch_with_neighbors(&self, ids: &[String]) -> AppResult<GraphSlice> {
        let mut seen = HashSet::new();
        let seeds: Vec<String> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .map(str::to_string)
            .collect();

        if seeds.len() > MAX_BATCH_IDS {
            return Err(ThoughtError::validation(
                "ids",
                format!("At most {} ids per batch, got {}", MAX_BATCH_IDS, seeds.len()),
            )
            .into());
        }
        if seeds.is_empty() {
            return Ok(GraphSlice::default());
        }

        let slice = self.storage.neighborhood(&seeds).await?;
        check_single_parent(&slice.edges)?;

        debug!(
            seeds = seeds.len(),
            nodes = slice.nodes.len(),
            edges = slice.edges.len(),
            "Batch neighbourhood fetched"
        );
        Ok(dedup(slice))
    }

    /// Everything reachable forward from `root_id`, at any depth.
    pub async fn get_subgraph(&self, root_id: &str) -> AppResult<GraphSlice> {
        let slice = self
            .storage
            .subgraph(root_id)
            .await?
            .ok_or_else(|| thought_not_found(root_id))?;

        debug!(
            root_id = %root_id,
            nodes = slice.nodes.len(),
            edges = slice.edges.len(),
            "Subgraph fetched"
        );
        Ok(dedup(slice))
    }
}

fn thought_not_found(id: &str) -> ThoughtError {
    ThoughtError::NotFound {
        resource: "thought",
        id: id.to_string(),
    }
}

/// Fail if any thought in `edges` has more than one incoming edge.
fn check_single_parent(edges: &[Branch]) -> Result<(), StorageError> {
    let mut parents: HashMap<&str, &str> = HashMap::new();
    for edge in edges {
        if let Some(existing) = parents.insert(&edge.child_id, &edge.parent_id) {
            if existing != edge.parent_id {
                return Err(StorageError::Integrity {
                    message: format!(
                        "Thought {} has more than one parent ({}, {})",
                        edge.child_id, existing, edge.parent_id
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Drop repeated nodes and edges, keeping first occurrence order.
fn dedup(slice: GraphSlice) -> GraphSlice {
    let mut seen_nodes = HashSet::new();
    let mut seen_edges = HashSet::new();

    let nodes = slice
        .nodes
        .into_iter()
        .filter(|n| seen_nodes.insert(n.id.clone()))
        .collect();
    let edges = slice
        .edges
        .into_iter()
        .filter(|e| seen_edges.insert(e.id.clone()))
        .collect();

    GraphSlice { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::{BranchProperties, NewThought, SqliteStorage};
    use chrono::Utc;

    fn edge(id: &str, parent: &str, child: &str) -> Branch {
        Branch {
            id: id.to_string(),
            parent_id: parent.to_string(),
            child_id: child.to_string(),
            perspective: None,
            strength_score: None,
            strength_analysis: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_single_parent() {
        let ok = vec![edge("e1", "a", "b"), edge("e2", "a", "c"), edge("e1", "a", "b")];
        assert!(check_single_parent(&ok).is_ok());

        let bad = vec![edge("e1", "a", "c"), edge("e2", "b", "c")];
        assert!(matches!(
            check_single_parent(&bad),
            Err(StorageError::Integrity { .. })
        ));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let slice = GraphSlice {
            nodes: vec![],
            edges: vec![edge("e1", "a", "b"), edge("e2", "a", "c"), edge("e1", "a", "b")],
        };
        let ids: Vec<String> = dedup(slice).edges.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
    }

    #[tokio::test]
    async fn test_get_with_neighbors_missing() {
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let engine = RetrievalEngine::new(storage);

        let err = engine.get_with_neighbors("ghost").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected(ThoughtError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_with_neighbors_includes_parent_and_children() {
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let root = storage
            .create_thought(&NewThought::root("root", vec![1.0, 0.0]))
            .await
            .unwrap();
        let (mid, _) = storage
            .create_branch(&root.id, &NewThought::branch("mid", vec![0.0, 1.0]), &BranchProperties::default())
            .await
            .unwrap()
            .unwrap();
        let (leaf, _) = storage
            .create_branch(&mid.id, &NewThought::branch("leaf", vec![1.0, 1.0]), &BranchProperties::default())
            .await
            .unwrap()
            .unwrap();

        let engine = RetrievalEngine::new(storage);
        let slice = engine.get_with_neighbors(&mid.id).await.unwrap();

        let mut ids: Vec<&str> = slice.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort();
        let mut expected = vec![root.id.as_str(), mid.id.as_str(), leaf.id.as_str()];
        expected.sort();
        assert_eq!(ids, expected);
        assert_eq!(slice.edges.len(), 2);
    }

    #[tokio::test]
    async fn test_outgoing_branches_of_missing_thought() {
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let engine = RetrievalEngine::new(storage);

        assert!(engine.outgoing_branches("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_batch_rejects_too_many_ids() {
        let storage = Arc::new(SqliteStorage::new_in_memory().await.unwrap());
        let engine = RetrievalEngine::new(storage);
        let ids: Vec<String> = (0..=MAX_BATCH_IDS).map(|i| format!("id-{i}")).collect();

        let err = engine.get_batch_with_neighbors(&ids).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected(ThoughtError::Validation { .. })
        ));
    }
}
