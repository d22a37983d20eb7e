//! LLM generator adapters

pub mod openai;
pub mod stub;

pub use openai::OpenAiGenerator;
pub use stub::StubGenerator;

use serde::{Deserialize, Serialize};

/// Common generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Model name/ID
    pub model: String,
    /// Temperature (0.0-2.0); tweets want a high one
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
    /// System message framing the voice
    pub system_message: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.9,
            max_output_tokens: 120,
            timeout_secs: 45,
            retries: 2,
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
        }
    }
}

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You write short, punchy tweets in the voice shown by \
the examples. Output ONLY the tweet text, nothing else. No hashtags, no quotes around the text, \
no preamble.";

/// Build the user prompt for one generation request
pub fn build_tweet_prompt(context: &str, examples: &str) -> String {
    let mut prompt = String::new();

    if !examples.is_empty() {
        prompt.push_str("Here are examples of the style to match:\n\n");
        prompt.push_str(examples);
        prompt.push_str("\n\n");
    }

    prompt.push_str(&format!("Generate ONE tweet about {}.", context));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_examples_and_context() {
        let prompt = build_tweet_prompt("runes", "Example 1: gm frens");

        assert!(prompt.contains("Example 1: gm frens"));
        assert!(prompt.ends_with("Generate ONE tweet about runes."));
    }

    #[test]
    fn test_prompt_without_examples_skips_block() {
        let prompt = build_tweet_prompt("runes", "");
        assert_eq!(prompt, "Generate ONE tweet about runes.");
    }
}
