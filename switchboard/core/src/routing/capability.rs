//! Capability Registry
//!
//! Static per-identity capability flags consulted by the router before it
//! hands a request to a candidate. Currently the only flag is image
//! support.

use super::config::ModelId;

/// Whether an identity can accept image inputs.
///
/// One explicit arm per identity, no wildcard: family name alone does not
/// determine capability (`openai-gpt35` and `gemini-pro` lack vision while
/// their siblings carry it), so a new identity must be classified here
/// before it compiles.
#[must_use]
pub fn supports_images(model: ModelId) -> bool {
    match model {
        ModelId::OpenAiGpt4 => true,
        ModelId::OpenAiGpt35 => false,
        ModelId::GeminiPro => false,
        ModelId::GeminiProVision => true,
        ModelId::ClaudeOpus => true,
        ModelId::ClaudeSonnet => true,
        ModelId::ClaudeHaiku => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_set() {
        let vision: Vec<ModelId> = ModelId::ALL
            .into_iter()
            .filter(|m| supports_images(*m))
            .collect();
        assert_eq!(
            vision,
            vec![
                ModelId::OpenAiGpt4,
                ModelId::GeminiProVision,
                ModelId::ClaudeOpus,
                ModelId::ClaudeSonnet,
                ModelId::ClaudeHaiku,
            ]
        );
    }

    #[test]
    fn test_capability_is_not_family_wide() {
        // Same family, different answer
        assert!(supports_images(ModelId::OpenAiGpt4));
        assert!(!supports_images(ModelId::OpenAiGpt35));
        assert!(supports_images(ModelId::GeminiProVision));
        assert!(!supports_images(ModelId::GeminiPro));
    }
}
