//! Static model metadata: context windows and pricing per OpenRouter id.

use serde::Serialize;

use crate::llm::TokenUsage;

/// Metadata for a selectable model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelInfo {
    /// OpenRouter model identifier.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Upstream provider.
    pub provider: &'static str,
    /// Maximum context window in tokens.
    pub context_length: u64,
    /// Input cost per million tokens (USD).
    pub input_cost_per_m: f64,
    /// Output cost per million tokens (USD).
    pub output_cost_per_m: f64,
}

impl ModelInfo {
    /// Calculate the cost of a request in USD.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        let input = (usage.prompt_tokens as f64 / 1_000_000.0) * self.input_cost_per_m;
        let output = (usage.completion_tokens as f64 / 1_000_000.0) * self.output_cost_per_m;
        input + output
    }
}

const fn model(
    id: &'static str,
    name: &'static str,
    provider: &'static str,
    context_length: u64,
    input_cost_per_m: f64,
    output_cost_per_m: f64,
) -> ModelInfo {
    ModelInfo {
        id,
        name,
        provider,
        context_length,
        input_cost_per_m,
        output_cost_per_m,
    }
}

/// All selectable models.
pub const MODELS: &[ModelInfo] = &[
    model("google/gemini-2.0-flash-exp:free", "Gemini Flash 2.0 (free)", "Google", 1_050_000, 0.0, 0.0),
    model("google/gemini-2.0-flash-thinking-exp:free", "Gemini 2.0 Flash Thinking", "Google", 40_000, 0.0, 0.0),
    model("meta-llama/llama-3.3-70b-instruct", "Llama 3.3 70B", "Novita AI (Meta)", 131_000, 0.39, 0.39),
    model("meta-llama/llama-3.1-405b-instruct:free", "META 3.1 405B (free)", "Meta", 8_192, 0.0, 0.0),
    model("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet", "Anthropic", 200_000, 3.0, 15.0),
    model("deepseek/deepseek-chat", "DeepSeek V2.5", "DeepSeek AI", 65_536, 0.15, 0.30),
    model("google/gemini-exp-1114:free", "Gemini Experimental 1114", "Google", 8_192, 0.0, 0.0),
    model("openai/chatgpt-4o-latest", "GPT-4o", "OpenAI", 128_000, 2.5, 10.0),
    model("meta-llama/llama-3.1-70b-instruct:free", "META 3.1 70B (Free)", "Meta", 8_192, 0.0, 0.0),
    model("anthropic/claude-3.5-haiku", "Claude 3.5 Haiku", "Anthropic", 200_000, 1.0, 5.0),
    model("qwen/qwq-32b-preview", "Qwen 32B", "Qwen", 33_000, 1.2, 1.2),
    model("deepseek/deepseek-r1", "DeepSeek R1", "DeepSeek AI", 128_000, 0.20, 0.60),
    model("anthropic/claude-3.7-sonnet", "Claude 3.7 Sonnet", "Anthropic", 200_000, 3.0, 15.0),
    model("meta-llama/llama-3.3-70b-instruct:free", "Llama 3.3 70B Instruct (free)", "Meta", 131_000, 0.0, 0.0),
    model("google/gemini-2.0-pro-exp-02-05:free", "Gemini Pro 2.0 Experimental (free)", "Google", 2_000_000, 0.0, 0.0),
    model("deepseek/deepseek-r1:free", "DeepSeek R1 (free)", "DeepSeek AI", 164_000, 0.0, 0.0),
    model("deepseek/deepseek-r1-distill-llama-70b", "DeepSeek R1 Distill Llama 70B", "DeepSeek AI", 131_000, 0.25, 0.75),
    model("google/gemini-2.0-flash-001", "Gemini Flash 2.0 (pay)", "Google", 2_000_000, 0.35, 1.05),
    model("anthropic/claude-3.7-sonnet:thinking", "Claude 3.7 Sonnet (thinking)", "Anthropic", 200_000, 3.0, 15.0),
    model("google/gemini-2.0-flash-thinking-exp-1219:free", "Gemini 2.0 Flash Thinking Experimental (free)", "Google", 40_000, 0.0, 0.0),
    model("mistralai/mistral-small-24b-instruct-2501", "Mistral Small 3 (0.9$)", "Mistral AI", 33_000, 0.9, 0.9),
    model("deepseek/deepseek-chat-v3-0324:free", "DeepSeek V3 0324 (free)", "DeepSeek AI", 128_000, 0.0, 0.0),
    model("google/gemini-2.5-pro-exp-03-25:free", "Gemini Pro 2.5 Experimental (free)", "Google", 1_000_000, 0.0, 0.0),
    model("openai/gpt-4o-mini", "GPT-4o-mini(0.6$)", "OpenAI", 128_000, 0.15, 0.6),
    model("google/gemini-flash-1.5", "Gemini Flash 1.5 (0.3$)", "Google", 1_000_000, 0.1, 0.3),
    model("meta-llama/llama-3.1-8b-instruct", "Llama 3.1 8B Instruct (0.2$)", "Meta", 131_000, 0.2, 0.2),
];

/// Find a model by its OpenRouter id.
pub fn lookup(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_model() {
        let info = lookup("anthropic/claude-3.5-sonnet").unwrap();
        assert_eq!(info.context_length, 200_000);
        assert_eq!(info.provider, "Anthropic");
    }

    #[test]
    fn test_lookup_unknown_model() {
        assert!(lookup("nonexistent/model").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in MODELS.iter().enumerate() {
            for b in &MODELS[i + 1..] {
                assert_ne!(a.id, b.id, "duplicate model id {}", a.id);
            }
        }
    }

    #[test]
    fn test_cost() {
        let info = lookup("anthropic/claude-3.5-sonnet").unwrap();
        let usage = TokenUsage::new(1_000_000, 500_000);
        // 1M * $3/1M + 0.5M * $15/1M = $10.50
        assert!((info.cost(&usage) - 10.5).abs() < 0.01);
    }

    #[test]
    fn test_free_models_cost_nothing() {
        let info = lookup("deepseek/deepseek-r1:free").unwrap();
        assert_eq!(info.cost(&TokenUsage::new(50_000, 10_000)), 0.0);
    }
}
