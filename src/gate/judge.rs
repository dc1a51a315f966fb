use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, warn};

use super::{clamp_score, ModerationVerdict, Moderator, StrengthScorer, StrengthVerdict};
use crate::config::PipeConfig;
use crate::error::{LangbaseError, LangbaseResult};
use crate::langbase::{
    extract_json_from_completion, LangbaseClient, Message, ModerationResponse, PipeRequest,
    StrengthResponse,
};
use crate::prompts::{
    argument_strength_message, moderation_message, ARGUMENT_STRENGTH_PROMPT, MODERATION_PROMPT,
};

/// Moderation and strength scoring backed by Langbase pipes.
#[derive(Clone)]
pub struct LangbaseJudge {
    langbase: LangbaseClient,
    moderation_pipe: String,
    strength_pipe: String,
}

impl LangbaseJudge {
    /// Create a judge using the configured pipe names
    pub fn new(langbase: LangbaseClient, pipes: &PipeConfig) -> Self {
        Self {
            langbase,
            moderation_pipe: pipes.moderation.clone(),
            strength_pipe: pipes.argument_strength.clone(),
        }
    }
}

/// Parse a moderation completion. Only a literal `"valid": true` accepts.
pub(crate) fn parse_moderation(completion: &str) -> LangbaseResult<ModerationVerdict> {
    let json = extract_json_from_completion(completion)
        .map_err(|message| LangbaseError::InvalidResponse { message })?;
    let response: ModerationResponse =
        serde_json::from_str(json).map_err(|e| LangbaseError::InvalidResponse {
            message: format!("Failed to parse moderation verdict: {}", e),
        })?;

    Ok(ModerationVerdict {
        valid: response.accepts(),
        reason: response.reason,
    })
}

/// Parse a strength completion, clamping the score.
pub(crate) fn parse_strength(completion: &str) -> LangbaseResult<StrengthVerdict> {
    let json = extract_json_from_completion(completion)
        .map_err(|message| LangbaseError::InvalidResponse { message })?;
    let response: StrengthResponse =
        serde_json::from_str(json).map_err(|e| LangbaseError::InvalidResponse {
            message: format!("Failed to parse strength analysis: {}", e),
        })?;

    Ok(StrengthVerdict {
        score: clamp_score(response.score),
        analysis: response
            .analysis
            .unwrap_or_else(|| "No analysis provided".to_string()),
    })
}

#[async_trait]
impl Moderator for LangbaseJudge {
    async fn moderate(&self, text: &str) -> LangbaseResult<ModerationVerdict> {
        let start = Instant::now();
        let messages = vec![
            Message::system(MODERATION_PROMPT),
            Message::user(moderation_message(text)),
        ];

        let response = self
            .langbase
            .call_pipe(PipeRequest::new(&self.moderation_pipe, messages))
            .await?;

        let verdict = parse_moderation(&response.completion).inspect_err(|e| {
            warn!(error = %e, pipe = %self.moderation_pipe, "Unreadable moderation response");
        })?;

        debug!(
            valid = verdict.valid,
            latency_ms = start.elapsed().as_millis(),
            "Moderation completed"
        );
        Ok(verdict)
    }
}

#[async_trait]
impl StrengthScorer for LangbaseJudge {
    async fn score(&self, parent_text: &str, child_text: &str) -> LangbaseResult<StrengthVerdict> {
        let start = Instant::now();
        let messages = vec![
            Message::system(ARGUMENT_STRENGTH_PROMPT),
            Message::user(argument_strength_message(parent_text, child_text)),
        ];

        let response = self
            .langbase
            .call_pipe(PipeRequest::new(&self.strength_pipe, messages))
            .await?;

        let verdict = parse_strength(&response.completion)?;

        debug!(
            score = verdict.score,
            latency_ms = start.elapsed().as_millis(),
            "Strength scoring completed"
        );
        Ok(verdict)
    }
}
