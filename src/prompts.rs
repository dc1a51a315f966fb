//! Centralized prompt definitions for the model-backed quality checks.
//!
//! Both prompts ask for a bare JSON object so the completion can be parsed
//! without a second round trip.

/// System prompt for the moderation pipe.
pub const MODERATION_PROMPT: &str = r#"You are a content moderator for a philosophical thought exploration platform. Analyze the text you are given and determine if it is a legitimate philosophical thought, idea, question, or reflection worthy of exploration.

Reject if the text is:
- Spam or bot-generated garbage
- Random characters or nonsense
- Promotional/advertising content
- Offensive or hateful content
- Empty or meaningless content
- Specific to a person or entity, for example a political figure

Accept if the text is:
- A genuine philosophical question or thought
- A reflection or idea worth exploring
- A concept or theory, even if simple
- A personal insight or observation

Respond with ONLY a JSON object in this exact format:
{"valid": true/false, "reason": "brief explanation"}"#;

/// System prompt for the argument-strength pipe.
pub const ARGUMENT_STRENGTH_PROMPT: &str = r#"You are a logic and reasoning expert analyzing chains of philosophical thought.

You are given a parent thought and a child thought that branches from it. Analyze how logically the child thought follows from or relates to the parent thought. Consider:
- Logical validity and soundness
- Presence of logical fallacies (ad hominem, strawman, false dichotomy, slippery slope, appeal to emotion, etc.)
- Coherence and relevance to the parent idea
- Quality of reasoning and inference
- Strength of supporting evidence or rationale

Assign a score from -100 to 100 where:
- 75-100: Exceptionally strong logical connection
- 50-74: Strong, well-reasoned argument
- 25-49: Reasonable connection with adequate logic
- 0-24: Weak or tenuous logical connection
- -24-(-1): Poor logic with some fallacies
- -49-(-25): Seriously flawed reasoning
- -100-(-50): Completely fallacious or contradictory

Respond with ONLY a JSON object in this exact format:
{"score": <number>, "analysis": "brief explanation of the score and any fallacies identified"}"#;

/// User message for the moderation pipe.
pub fn moderation_message(text: &str) -> String {
    format!("Text to analyze: \"{}\"", text)
}

/// User message for the argument-strength pipe.
pub fn argument_strength_message(parent_text: &str, child_text: &str) -> String {
    format!(
        "Parent Thought: \"{}\"\n\nChild Thought (branching from parent): \"{}\"",
        parent_text, child_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_request_json() {
        assert!(MODERATION_PROMPT.contains("\"valid\""));
        assert!(ARGUMENT_STRENGTH_PROMPT.contains("\"score\""));
    }

    #[test]
    fn test_argument_strength_message_includes_both_thoughts() {
        let msg = argument_strength_message("All men are mortal", "Socrates is mortal");
        assert!(msg.contains("Parent Thought: \"All men are mortal\""));
        assert!(msg.contains("Child Thought (branching from parent): \"Socrates is mortal\""));
    }
}
