//! Per-model output token caps.
//!
//! Providers reject or truncate requests whose `max_tokens` exceeds the
//! model's completion limit. The table maps model-name fragments to a cap;
//! the first fragment contained in the model id wins.

use serde::{Deserialize, Serialize};
use crate::ConfigError;

/// One `pattern → max_tokens` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokenLimit {
    /// Case-insensitive fragment of the model id (e.g. "gpt-4o")
    pub pattern: String,
    pub max_tokens: u32,
}

impl OutputTokenLimit {
    fn new(pattern: &str, max_tokens: u32) -> Self {
        Self {
            pattern: pattern.into(),
            max_tokens,
        }
    }
}

/// Ordered lookup table of output token caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTokenLimits {
    /// Cap for models no pattern matches
    #[serde(default = "default_max_tokens")]
    pub default: u32,

    /// Checked in order; put specific patterns before their prefixes
    #[serde(default = "builtin_limits")]
    pub limits: Vec<OutputTokenLimit>,
}

fn default_max_tokens() -> u32 {
    4096
}

fn builtin_limits() -> Vec<OutputTokenLimit> {
    vec![
        // OpenAI
        OutputTokenLimit::new("gpt-4o", 16384),
        OutputTokenLimit::new("gpt-4-turbo", 4096),
        OutputTokenLimit::new("gpt-4", 8192),
        OutputTokenLimit::new("gpt-3.5-turbo", 4096),
        // Anthropic
        OutputTokenLimit::new("claude-3.5-sonnet", 8192),
        OutputTokenLimit::new("claude-3-opus", 4096),
        OutputTokenLimit::new("claude-3-sonnet", 4096),
        OutputTokenLimit::new("claude-3-haiku", 4096),
        OutputTokenLimit::new("claude-2", 4096),
        // Google
        OutputTokenLimit::new("gemini-pro", 8192),
        OutputTokenLimit::new("gemini-1.5-pro", 8192),
        OutputTokenLimit::new("gemini-1.5-flash", 8192),
        // Meta
        OutputTokenLimit::new("llama-3.1-405b", 4096),
        OutputTokenLimit::new("llama-3.1-70b", 4096),
        OutputTokenLimit::new("llama-3.1-8b", 4096),
        OutputTokenLimit::new("llama-3-70b", 4096),
        OutputTokenLimit::new("llama-3-8b", 4096),
        // Mistral
        OutputTokenLimit::new("mistral-large", 4096),
        OutputTokenLimit::new("mistral-medium", 4096),
        OutputTokenLimit::new("mistral-small", 4096),
        OutputTokenLimit::new("mixtral-8x7b", 4096),
        OutputTokenLimit::new("mixtral-8x22b", 4096),
        // Cohere
        OutputTokenLimit::new("command-r-plus", 4096),
        OutputTokenLimit::new("command-r", 4096),
    ]
}

impl Default for OutputTokenLimits {
    fn default() -> Self {
        Self {
            default: default_max_tokens(),
            limits: builtin_limits(),
        }
    }
}

impl OutputTokenLimits {
    /// The cap for `model`.
    pub fn for_model(&self, model: &str) -> u32 {
        let model = model.to_lowercase();
        self.limits
            .iter()
            .find(|limit| model.contains(&limit.pattern.to_lowercase()))
            .map(|limit| limit.max_tokens)
            .unwrap_or_else(|| {
                tracing::debug!(model = %model, max_tokens = self.default, "No output token limit for model, using default");
                self.default
            })
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.default == 0 {
            return Err(ConfigError::ValidationError(
                "agent.output_tokens.default must be at least 1".into(),
            ));
        }
        if let Some(limit) = self.limits.iter().find(|l| l.pattern.trim().is_empty() || l.max_tokens == 0) {
            return Err(ConfigError::ValidationError(format!(
                "agent.output_tokens entry '{}' needs a non-empty pattern and max_tokens >= 1",
                limit.pattern
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_model_fragments() {
        let limits = OutputTokenLimits::default();
        assert_eq!(limits.for_model("openai/gpt-4o"), 16384);
        assert_eq!(limits.for_model("openai/gpt-4o-mini"), 16384);
        assert_eq!(limits.for_model("openai/gpt-4-turbo"), 4096);
        assert_eq!(limits.for_model("openai/gpt-4"), 8192);
        assert_eq!(limits.for_model("anthropic/claude-3.5-sonnet"), 8192);
        assert_eq!(limits.for_model("google/gemini-1.5-flash"), 8192);
    }

    #[test]
    fn matching_ignores_case() {
        let limits = OutputTokenLimits::default();
        assert_eq!(limits.for_model("OpenAI/GPT-4o"), 16384);
    }

    #[test]
    fn unknown_models_get_default() {
        let limits = OutputTokenLimits::default();
        assert_eq!(limits.for_model("deepseek/deepseek-r1"), 4096);
    }

    #[test]
    fn first_match_wins() {
        let limits = OutputTokenLimits {
            default: 1000,
            limits: vec![
                OutputTokenLimit::new("gpt", 2000),
                OutputTokenLimit::new("gpt-4o", 3000),
            ],
        };
        assert_eq!(limits.for_model("openai/gpt-4o"), 2000);
    }

    #[test]
    fn table_is_configurable_from_toml() {
        let limits: OutputTokenLimits = toml::from_str(
            r#"
default = 2048

[[limits]]
pattern = "qwen"
max_tokens = 32768
"#,
        )
        .unwrap();
        assert_eq!(limits.for_model("qwen/qwen-2.5-72b"), 32768);
        assert_eq!(limits.for_model("openai/gpt-4o"), 2048);
    }

    #[test]
    fn omitted_limits_keep_builtin_table() {
        let limits: OutputTokenLimits = toml::from_str("default = 1024").unwrap();
        assert_eq!(limits.for_model("openai/gpt-4o"), 16384);
        assert_eq!(limits.for_model("unknown"), 1024);
    }

    #[test]
    fn empty_pattern_rejected() {
        let limits = OutputTokenLimits {
            default: 4096,
            limits: vec![OutputTokenLimit::new("  ", 100)],
        };
        assert!(limits.validate().is_err());
    }
}
