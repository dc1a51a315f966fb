//! Graph store for thoughts and the branches between them.
//!
//! Thoughts are nodes; branches are directed `parent -> child` edges carrying
//! an optional perspective and strength score. The [`Storage`] trait is the
//! query surface the pipeline and the engines use. [`SqliteStorage`] backs it
//! with SQLite: foreign keys cascade edge removal, a unique index on the child
//! column holds the single-parent rule, and recursive CTEs do the traversal.

mod sqlite;

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// Upper bound on thought text, in characters.
pub const MAX_TEXT_CHARS: usize = 5000;
/// Upper bound on a branch perspective, in characters.
pub const MAX_PERSPECTIVE_CHARS: usize = 500;
/// Strength scores live in this closed range.
pub const STRENGTH_RANGE: (i32, i32) = (-100, 100);

/// A node in the thought graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    /// Store-assigned identifier.
    pub id: String,
    /// The thought itself.
    pub text: String,
    /// Top-level thoughts are listed and searchable; branch-only ones are not.
    pub is_root: bool,
    /// When the thought was created.
    pub created_at: DateTime<Utc>,
}

/// A directed `parent -> child` edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Store-assigned identifier.
    pub id: String,
    /// Source thought.
    pub parent_id: String,
    /// Target thought.
    pub child_id: String,
    /// Viewpoint under which the branch was created.
    pub perspective: Option<String>,
    /// Logical coherence of child relative to parent, in [-100, 100].
    pub strength_score: Option<i32>,
    /// Rationale accompanying the score.
    pub strength_analysis: Option<String>,
    /// When the branch was created.
    pub created_at: DateTime<Utc>,
}

/// A thought about to be written, with its embedding.
#[derive(Debug, Clone)]
pub struct NewThought {
    pub text: String,
    pub embedding: Vec<f32>,
    pub is_root: bool,
}

impl NewThought {
    /// A thought that will sit at the top of a tree.
    pub fn root(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
            is_root: true,
        }
    }

    /// A thought that only exists as a branch target.
    pub fn branch(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            embedding,
            is_root: false,
        }
    }
}

/// Properties written onto a new edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchProperties {
    pub perspective: Option<String>,
    pub strength_score: Option<i32>,
    pub strength_analysis: Option<String>,
}

impl BranchProperties {
    /// Edge with a perspective and no score yet.
    pub fn with_perspective(perspective: Option<String>) -> Self {
        Self {
            perspective,
            ..Default::default()
        }
    }

    /// Attach a strength score, clamped into range.
    pub fn scored(mut self, score: i32, analysis: Option<String>) -> Self {
        self.strength_score = Some(score.clamp(STRENGTH_RANGE.0, STRENGTH_RANGE.1));
        self.strength_analysis = analysis;
        self
    }
}

/// A stored thought matched against a candidate embedding.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarThought {
    pub thought: Thought,
    pub similarity: f64,
}

/// The parent of a candidate branch and its existing children, each scored
/// against the candidate embedding.
#[derive(Debug, Clone)]
pub struct ParentContext {
    pub parent: Thought,
    /// Similarity between candidate and parent; 0.0 if the parent has no embedding.
    pub similarity: f64,
    /// Existing children, most similar first.
    pub siblings: Vec<SimilarThought>,
}

/// A root thought considered for search ranking.
#[derive(Debug, Clone)]
pub struct RankCandidate {
    pub thought: Thought,
    pub embedding: Option<Vec<f32>>,
}

/// Nodes plus the edges among them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSlice {
    pub nodes: Vec<Thought>,
    pub edges: Vec<Branch>,
}

/// One page of root thoughts and the total root count.
#[derive(Debug, Clone)]
pub struct RootPage {
    pub nodes: Vec<Thought>,
    pub total: u64,
}

/// Result of linking two existing thoughts.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    Created(Branch),
    ParentMissing,
    ChildMissing,
    SelfLoop,
    ChildIsRoot,
    ChildHasParent,
    WouldCycle,
}

/// Graph store operations.
#[async_trait]
pub trait Storage: Send + Sync {
    // Writes

    /// Create a thought with no parent.
    async fn create_thought(&self, thought: &NewThought) -> StorageResult<Thought>;
    /// Create a child thought and its incoming edge in one transaction.
    ///
    /// Returns `None`, with nothing written, when the parent does not exist.
    async fn create_branch(
        &self,
        parent_id: &str,
        child: &NewThought,
        properties: &BranchProperties,
    ) -> StorageResult<Option<(Thought, Branch)>>;
    /// First reason `parent_id -> child_id` cannot be linked, or `None` if it can.
    ///
    /// Read-only; [`link_thoughts`](Self::link_thoughts) repeats the checks
    /// under the write lock.
    async fn check_link(&self, parent_id: &str, child_id: &str) -> StorageResult<Option<LinkOutcome>>;
    /// Add an edge between two existing thoughts.
    async fn link_thoughts(
        &self,
        parent_id: &str,
        child_id: &str,
        properties: &BranchProperties,
    ) -> StorageResult<LinkOutcome>;
    /// Remove a thought and every edge touching it. Returns thoughts removed.
    async fn delete_thought(&self, id: &str) -> StorageResult<u64>;
    /// Remove a single edge. Returns edges removed.
    async fn delete_branch(&self, id: &str) -> StorageResult<u64>;

    // Lookups

    /// Get a thought by ID.
    async fn get_thought(&self, id: &str) -> StorageResult<Option<Thought>>;
    /// Edges leaving a thought, oldest first.
    async fn get_outgoing_branches(&self, id: &str) -> StorageResult<Vec<Branch>>;

    // Similarity

    /// Root thoughts ranked by similarity to `embedding`, most similar first.
    async fn find_similar_roots(&self, embedding: &[f32]) -> StorageResult<Vec<SimilarThought>>;
    /// Parent plus its children, scored against `embedding`, in one read.
    ///
    /// Returns `None` when the parent does not exist.
    async fn find_similar_among(
        &self,
        parent_id: &str,
        embedding: &[f32],
    ) -> StorageResult<Option<ParentContext>>;

    // Traversal

    /// Seeds, their children and parents, and the edges connecting them.
    async fn neighborhood(&self, ids: &[String]) -> StorageResult<GraphSlice>;
    /// Everything reachable forward from `root_id`. `None` if the root is missing.
    async fn subgraph(&self, root_id: &str) -> StorageResult<Option<GraphSlice>>;

    // Listing and ranking

    /// Root thoughts, newest first.
    async fn list_roots(&self, skip: u32, limit: u32) -> StorageResult<RootPage>;
    /// Every root thought with its embedding.
    async fn rank_candidates(&self) -> StorageResult<Vec<RankCandidate>>;
}
