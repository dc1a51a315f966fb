//! Quality gate for candidate thoughts.
//!
//! Decides whether a candidate may become a stored thought and, when it has a
//! parent, what strength score its branch carries. The checks are split so the
//! creation pipeline can run them in order and stop at the first rejection:
//!
//! 1. [`validate_candidate`] runs before any external call.
//! 2. [`QualityGate::check_originality`] compares the embedding against the
//!    graph (fail-closed).
//! 3. [`QualityGate::moderate`] asks the classifier (fail-open by default).
//! 4. [`QualityGate::score`] asks the scorer and never rejects.

mod judge;
mod originality;

pub use judge::LangbaseJudge;
pub use originality::Originality;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GateConfig;
use crate::error::{AppResult, LangbaseResult, ThoughtError};
use crate::storage::{Storage, MAX_PERSPECTIVE_CHARS, MAX_TEXT_CHARS, STRENGTH_RANGE};

/// Analysis recorded when the scorer cannot produce one.
pub const NEUTRAL_ANALYSIS: &str = "Analysis failed - assigned neutral score";

/// Classifier verdict on a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationVerdict {
    pub valid: bool,
    pub reason: Option<String>,
}

/// Logical strength of a child thought relative to its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct StrengthVerdict {
    /// Clamped to [-100, 100].
    pub score: i32,
    pub analysis: String,
}

/// Content classifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Moderator: Send + Sync {
    /// Classify `text`. An `Err` means the classifier itself failed.
    async fn moderate(&self, text: &str) -> LangbaseResult<ModerationVerdict>;
}

/// Argument-strength scorer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StrengthScorer: Send + Sync {
    /// Score how well `child_text` follows from `parent_text`.
    async fn score(&self, parent_text: &str, child_text: &str) -> LangbaseResult<StrengthVerdict>;
}

/// A candidate that passed input validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Trimmed text.
    pub text: String,
    pub parent_id: Option<String>,
    pub perspective: Option<String>,
    /// Only meaningful without a parent.
    pub is_root: bool,
}

/// Check a raw candidate before anything leaves the process.
///
/// Text is trimmed and measured in characters. A perspective is only accepted
/// together with a parent, and an empty perspective counts as none.
pub fn validate_candidate(
    text: &str,
    parent_id: Option<&str>,
    perspective: Option<&str>,
    is_root: Option<bool>,
) -> Result<Candidate, ThoughtError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ThoughtError::validation("text", "Text cannot be empty"));
    }
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(ThoughtError::validation(
            "text",
            format!("Text must be at most {} characters, got {}", MAX_TEXT_CHARS, chars),
        ));
    }

    let parent_id = match parent_id.map(str::trim) {
        Some("") => {
            return Err(ThoughtError::validation(
                "parent_id",
                "Parent ID cannot be empty",
            ))
        }
        other => other.map(str::to_string),
    };

    let perspective = validate_perspective(perspective)?;
    if perspective.is_some() && parent_id.is_none() {
        return Err(ThoughtError::validation(
            "perspective",
            "A perspective requires a parent thought",
        ));
    }

    let is_root = match (parent_id.is_some(), is_root) {
        (true, Some(true)) => {
            return Err(ThoughtError::validation(
                "is_root",
                "A thought with a parent cannot be a root",
            ))
        }
        (true, _) => false,
        (false, flag) => flag.unwrap_or(true),
    };

    Ok(Candidate {
        text: text.to_string(),
        parent_id,
        perspective,
        is_root,
    })
}

/// Trim a perspective and check its length. Blank means absent.
pub fn validate_perspective(perspective: Option<&str>) -> Result<Option<String>, ThoughtError> {
    let Some(perspective) = perspective.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let chars = perspective.chars().count();
    if chars > MAX_PERSPECTIVE_CHARS {
        return Err(ThoughtError::validation(
            "perspective",
            format!(
                "Perspective must be at most {} characters, got {}",
                MAX_PERSPECTIVE_CHARS, chars
            ),
        ));
    }
    Ok(Some(perspective.to_string()))
}

/// Clamp a raw model score into the strength range.
///
/// Missing or non-finite scores become 0.
pub fn clamp_score(raw: Option<f64>) -> i32 {
    match raw {
        Some(score) if score.is_finite() => {
            // Clamping first keeps the cast in range.
            score
                .round()
                .clamp(f64::from(STRENGTH_RANGE.0), f64::from(STRENGTH_RANGE.1)) as i32
        }
        _ => 0,
    }
}

/// Runs the originality, moderation and scoring checks.
#[derive(Clone)]
pub struct QualityGate {
    storage: Arc<dyn Storage>,
    moderator: Arc<dyn Moderator>,
    scorer: Arc<dyn StrengthScorer>,
    config: GateConfig,
}

impl QualityGate {
    /// Create a new quality gate
    pub fn new(
        storage: Arc<dyn Storage>,
        moderator: Arc<dyn Moderator>,
        scorer: Arc<dyn StrengthScorer>,
        config: GateConfig,
    ) -> Self {
        Self {
            storage,
            moderator,
            scorer,
            config,
        }
    }

    /// Similarity strictly above this is a duplicate.
    pub fn threshold(&self) -> f64 {
        self.config.similarity_threshold
    }

    /// Ask the classifier about `text`.
    ///
    /// An invalid verdict is a `moderation_failed` rejection. A classifier
    /// failure is accepted when the gate fails open and is an infrastructure
    /// error otherwise.
    pub async fn moderate(&self, text: &str) -> AppResult<()> {
        match self.moderator.moderate(text).await {
            Ok(verdict) if verdict.valid => Ok(()),
            Ok(verdict) => {
                let reason = verdict
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| "Content did not pass moderation".to_string());
                info!(reason = %reason, "Thought rejected by moderation");
                Err(ThoughtError::ModerationFailed { reason }.into())
            }
            Err(e) if self.config.moderation_fail_open => {
                warn!(error = %e, "Moderation unavailable, accepting content");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Score a branch. Never fails: scorer errors give a neutral score.
    pub async fn score(&self, parent_text: &str, child_text: &str) -> StrengthVerdict {
        match self.scorer.score(parent_text, child_text).await {
            Ok(verdict) => StrengthVerdict {
                score: verdict.score.clamp(STRENGTH_RANGE.0, STRENGTH_RANGE.1),
                analysis: verdict.analysis,
            },
            Err(e) => {
                warn!(error = %e, "Strength scoring failed, assigning neutral score");
                StrengthVerdict {
                    score: 0,
                    analysis: NEUTRAL_ANALYSIS.to_string(),
                }
            }
        }
    }
}
