//! Thought creation pipeline.
//!
//! A candidate moves through validation, embedding, originality, moderation
//! and (with a parent) strength scoring before anything is written. The write
//! itself is a single transaction, so a rejection or a hard failure at any
//! stage leaves the graph untouched.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::error::{AppResult, ThoughtError};
use crate::gate::{validate_candidate, validate_perspective, Originality, QualityGate};
use crate::storage::{Branch, BranchProperties, LinkOutcome, NewThought, Storage, Thought};

/// Input for creating a thought.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThoughtRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    /// Parentless thoughts are roots unless this is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_root: Option<bool>,
}

impl CreateThoughtRequest {
    /// A parentless thought.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Branch the thought from `parent_id`.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Label the branch with a perspective.
    pub fn with_perspective(mut self, perspective: impl Into<String>) -> Self {
        self.perspective = Some(perspective.into());
        self
    }

    /// Override the root flag of a parentless thought.
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = Some(is_root);
        self
    }
}

/// Input for linking two existing thoughts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkRequest {
    pub parent_id: String,
    pub child_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
}

/// A stored thought and, when it has a parent, its incoming branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedThought {
    pub thought: Thought,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
}

/// Orchestrates the creation, link and delete operations.
#[derive(Clone)]
pub struct ThoughtPipeline {
    storage: Arc<dyn Storage>,
    embedder: Arc<dyn Embedder>,
    gate: QualityGate,
}

impl ThoughtPipeline {
    /// Create a new pipeline
    pub fn new(storage: Arc<dyn Storage>, embedder: Arc<dyn Embedder>, gate: QualityGate) -> Self {
        Self {
            storage,
            embedder,
            gate,
        }
    }

    /// Run a candidate through the gate and store it.
    pub async fn create(&self, request: CreateThoughtRequest) -> AppResult<CreatedThought> {
        let start = Instant::now();

        let candidate = validate_candidate(
            &request.text,
            request.parent_id.as_deref(),
            request.perspective.as_deref(),
            request.is_root,
        )?;

        debug!(
            parent_id = ?candidate.parent_id,
            chars = candidate.text.chars().count(),
            "Processing thought candidate"
        );

        let embedding = self.embedder.embed(&candidate.text).await?;

        let originality = self.gate.check_originality(&candidate, &embedding).await?;

        self.gate.moderate(&candidate.text).await?;

        let created = match originality {
            Originality::Parentless => {
                let thought = self
                    .storage
                    .create_thought(&NewThought {
                        text: candidate.text,
                        embedding,
                        is_root: candidate.is_root,
                    })
                    .await?;
                CreatedThought {
                    thought,
                    branch: None,
                }
            }
            Originality::Branch { parent } => {
                let verdict = self.gate.score(&parent.text, &candidate.text).await;
                let properties = BranchProperties::with_perspective(candidate.perspective)
                    .scored(verdict.score, Some(verdict.analysis));

                let (thought, branch) = self
                    .storage
                    .create_branch(
                        &parent.id,
                        &NewThought::branch(candidate.text, embedding),
                        &properties,
                    )
                    .await?
                    // The parent was deleted after the originality read.
                    .ok_or_else(|| ThoughtError::ParentNotFound {
                        parent_id: parent.id.clone(),
                    })?;

                CreatedThought {
                    thought,
                    branch: Some(branch),
                }
            }
        };

        info!(
            thought_id = %created.thought.id,
            is_root = created.thought.is_root,
            branch_id = ?created.branch.as_ref().map(|b| &b.id),
            strength_score = ?created.branch.as_ref().and_then(|b| b.strength_score),
            latency_ms = start.elapsed().as_millis(),
            "Thought created"
        );

        Ok(created)
    }

    /// Attach an existing parentless thought under another thought.
    ///
    /// The edge is scored like a created branch. Structural problems (second
    /// parent, self-loop, cycle, root target) are `branch_conflict` rejections.
    pub async fn link(&self, request: LinkRequest) -> AppResult<Branch> {
        let parent_id = require_id("parent_id", &request.parent_id)?;
        let child_id = require_id("child_id", &request.child_id)?;
        let perspective = validate_perspective(request.perspective.as_deref())?;

        // Structural checks are cheap; settle them before paying for a score.
        if let Some(outcome) = self.storage.check_link(parent_id, child_id).await? {
            return Err(link_rejection(outcome, parent_id, child_id).into());
        }

        let parent = self
            .storage
            .get_thought(parent_id)
            .await?
            .ok_or_else(|| not_found("thought", parent_id))?;
        let child = self
            .storage
            .get_thought(child_id)
            .await?
            .ok_or_else(|| not_found("thought", child_id))?;

        let verdict = self.gate.score(&parent.text, &child.text).await;
        let properties =
            BranchProperties::with_perspective(perspective).scored(verdict.score, Some(verdict.analysis));

        let branch = match self
            .storage
            .link_thoughts(parent_id, child_id, &properties)
            .await?
        {
            LinkOutcome::Created(branch) => branch,
            outcome => return Err(link_rejection(outcome, parent_id, child_id).into()),
        };

        info!(
            branch_id = %branch.id,
            parent_id = %parent_id,
            child_id = %child_id,
            strength_score = ?branch.strength_score,
            "Branch linked"
        );
        Ok(branch)
    }

    /// Delete a thought and every branch touching it. Returns thoughts removed.
    pub async fn delete_thought(&self, id: &str) -> AppResult<u64> {
        let removed = self.storage.delete_thought(id).await?;
        if removed == 0 {
            debug!(thought_id = %id, "Thought already absent");
        } else {
            info!(thought_id = %id, "Thought deleted");
        }
        Ok(removed)
    }

    /// Delete one branch. Returns branches removed.
    pub async fn delete_branch(&self, id: &str) -> AppResult<u64> {
        let removed = self.storage.delete_branch(id).await?;
        debug!(branch_id = %id, removed, "Branch delete processed");
        Ok(removed)
    }
}

fn require_id<'a>(field: &str, id: &'a str) -> Result<&'a str, ThoughtError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ThoughtError::validation(field, "ID cannot be empty"));
    }
    Ok(id)
}

fn not_found(resource: &'static str, id: &str) -> ThoughtError {
    ThoughtError::NotFound {
        resource,
        id: id.to_string(),
    }
}

/// Caller-visible rejection for a link the store refused.
fn link_rejection(outcome: LinkOutcome, parent_id: &str, child_id: &str) -> ThoughtError {
    match outcome {
        LinkOutcome::ParentMissing => not_found("thought", parent_id),
        LinkOutcome::ChildMissing => not_found("thought", child_id),
        LinkOutcome::SelfLoop => conflict("A thought cannot branch to itself"),
        LinkOutcome::ChildIsRoot => conflict("A root thought cannot become a branch"),
        LinkOutcome::ChildHasParent => conflict("The child thought already has a parent"),
        LinkOutcome::WouldCycle => conflict("The branch would create a cycle"),
        LinkOutcome::Created(branch) => conflict(&format!("Branch {} already created", branch.id)),
    }
}

fn conflict(reason: &str) -> ThoughtError {
    ThoughtError::BranchConflict {
        reason: reason.to_string(),
    }
}
