//! Centralized prompt definitions
//!
//! This module contains the prompts used to generate reasoning steps.
//! Centralizing prompts makes them easier to maintain, test, and version.

/// System prompt for the step-generation pipe.
///
/// Used by the Langbase pipe definition; the per-step user message is built
/// by [`build_expansion_prompt`].
pub const REASONING_STEP_PROMPT: &str = r#"You are a careful tutor reasoning through a student's question one step at a time.

Your response MUST be valid JSON in this exact format:
{
  "step": "the single next reasoning step",
  "confidence": 0.8
}

Guidelines:
- Produce exactly ONE reasoning action per response
- Build on the previous steps; never repeat them
- Be specific and concrete
- confidence should be between 0.0 and 1.0 and reflect how sound the step is

Always respond with valid JSON only, no other text."#;

/// Placeholder used when a step has no predecessors.
pub const NO_PREVIOUS_STEPS: &str = "No previous steps";

/// Build the user message asking for the next step of a chain.
///
/// # Arguments
/// * `query` - The learner's original query
/// * `previous_steps` - Texts of the steps already on the path, in order
/// * `target_depth` - Planned chain length
pub fn build_expansion_prompt(query: &str, previous_steps: &[&str], target_depth: usize) -> String {
    let context = if previous_steps.is_empty() {
        NO_PREVIOUS_STEPS.to_string()
    } else {
        previous_steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("Step {}: {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Original query: {query}\n\n\
         Previous reasoning steps:\n{context}\n\n\
         Generate step {next} of about {target_depth}. Focus on ONE reasoning action:\n\
         - Break down the problem\n\
         - Identify key concepts\n\
         - Make a logical deduction\n\
         - Consider an example\n\
         - Draw a conclusion\n\n\
         Next step:",
        next = previous_steps.len() + 1,
    )
}
