//! Maps a [`TaskType`] to a concrete `(Provider, model)` pair so callers
//! never hard-code a model name.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    FastGeneration,
    ComplexReasoning,
    HighQuality,
    Analysis,
    Drafting,
    Refinement,
    Creative,
    StructuredOutput,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

/// A fixed routing table, overridable by config field `llm_default_provider`
/// for which provider family each task type resolves into.
#[derive(Clone, Debug)]
pub struct ModelRouter {
    default_provider: Provider,
}

impl ModelRouter {
    pub fn new(default_provider: &str) -> Self {
        let default_provider = match default_provider {
            "anthropic" => Provider::Anthropic,
            _ => Provider::OpenAi,
        };
        Self { default_provider }
    }

    /// Resolves a task type to `(provider, model)`. Model names are chosen
    /// per task so cheap/fast tasks never pay for a heavyweight model.
    pub fn resolve(&self, task: TaskType) -> (Provider, &'static str) {
        let model = match (&self.default_provider, task) {
            (Provider::OpenAi, TaskType::FastGeneration) => "gpt-4o-mini",
            (Provider::OpenAi, TaskType::ComplexReasoning) => "gpt-4o",
            (Provider::OpenAi, TaskType::HighQuality) => "gpt-4o",
            (Provider::OpenAi, TaskType::Analysis) => "gpt-4o",
            (Provider::OpenAi, TaskType::Drafting) => "gpt-4o",
            (Provider::OpenAi, TaskType::Refinement) => "gpt-4o-mini",
            (Provider::OpenAi, TaskType::Creative) => "gpt-4o",
            (Provider::OpenAi, TaskType::StructuredOutput) => "gpt-4o-mini",
            (Provider::Anthropic, TaskType::FastGeneration) => "claude-3-5-haiku-latest",
            (Provider::Anthropic, TaskType::ComplexReasoning) => "claude-3-5-sonnet-latest",
            (Provider::Anthropic, TaskType::HighQuality) => "claude-3-5-sonnet-latest",
            (Provider::Anthropic, TaskType::Analysis) => "claude-3-5-sonnet-latest",
            (Provider::Anthropic, TaskType::Drafting) => "claude-3-5-sonnet-latest",
            (Provider::Anthropic, TaskType::Refinement) => "claude-3-5-haiku-latest",
            (Provider::Anthropic, TaskType::Creative) => "claude-3-5-sonnet-latest",
            (Provider::Anthropic, TaskType::StructuredOutput) => "claude-3-5-haiku-latest",
        };
        (self.default_provider.clone(), model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_distinct_models_per_task() {
        let router = ModelRouter::new("openai");
        let (_, fast) = router.resolve(TaskType::FastGeneration);
        let (_, complex) = router.resolve(TaskType::ComplexReasoning);
        assert_ne!(fast, complex);
    }

    #[test]
    fn unknown_provider_falls_back_to_openai() {
        let router = ModelRouter::new("unknown-vendor");
        assert_eq!(router.default_provider, Provider::OpenAi);
    }
}
