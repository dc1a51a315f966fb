use tracing::{debug, info};

use super::{Candidate, QualityGate};
use crate::error::{AppResult, ThoughtError};
use crate::storage::Thought;

/// What the originality check found out about a candidate's place in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Originality {
    /// No parent; the candidate is unlike every root.
    Parentless,
    /// The parent exists and the candidate is unlike it and its children.
    Branch { parent: Thought },
}

impl QualityGate {
    /// Compare a candidate embedding against the graph.
    ///
    /// Without a parent, every root is a competitor. With a parent, the parent
    /// and its existing children are fetched in one read, which is also where a
    /// missing parent is detected.
    pub async fn check_originality(
        &self,
        candidate: &Candidate,
        embedding: &[f32],
    ) -> AppResult<Originality> {
        let threshold = self.threshold();

        let Some(parent_id) = candidate.parent_id.as_deref() else {
            let roots = self.storage.find_similar_roots(embedding).await?;
            if let Some(closest) = roots.first() {
                debug!(
                    existing_id = %closest.thought.id,
                    similarity = closest.similarity,
                    "Closest root thought"
                );
                if closest.similarity > threshold {
                    info!(
                        existing_id = %closest.thought.id,
                        similarity = closest.similarity,
                        "Duplicate thought rejected"
                    );
                    return Err(ThoughtError::DuplicateThought {
                        similarity: closest.similarity,
                        existing_id: closest.thought.id.clone(),
                    }
                    .into());
                }
            }
            return Ok(Originality::Parentless);
        };

        let context = self
            .storage
            .find_similar_among(parent_id, embedding)
            .await?
            .ok_or_else(|| ThoughtError::ParentNotFound {
                parent_id: parent_id.to_string(),
            })?;

        if context.similarity > threshold {
            info!(
                parent_id = %parent_id,
                similarity = context.similarity,
                "Thought too similar to parent"
            );
            return Err(ThoughtError::SimilarToParent {
                similarity: context.similarity,
            }
            .into());
        }

        if let Some(sibling) = context.siblings.first() {
            if sibling.similarity > threshold {
                info!(
                    parent_id = %parent_id,
                    existing_id = %sibling.thought.id,
                    similarity = sibling.similarity,
                    "Duplicate branch rejected"
                );
                return Err(ThoughtError::DuplicateBranch {
                    similarity: sibling.similarity,
                    existing_id: sibling.thought.id.clone(),
                }
                .into());
            }
        }

        Ok(Originality::Branch {
            parent: context.parent,
        })
    }
}
