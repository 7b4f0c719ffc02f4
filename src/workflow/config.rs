//! Orchestrator-wide configuration, resolved the way [`crate::runtimes::RuntimeConfig`]
//! and [`crate::runtimes::EventBusConfig`] are: an env-backed `Default` plus
//! fluent `with_*` builders.

use std::time::Duration;

/// Every tunable spec.md §6.4 names, plus the critic `score_threshold` (§9
/// open question 3: a config field, never a hard-coded constant).
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub use_vision_extraction: bool,
    pub max_refinement_iterations: u32,
    pub require_outline_approval: bool,
    pub use_long_context: bool,
    pub enable_competitor_analysis: bool,
    pub vector_backend: String,
    pub embedding_provider: String,
    pub cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub llm_default_provider: String,
    pub node_timeout_seconds: u64,
    pub llm_call_timeout_seconds: u64,
    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_recovery_seconds: u64,
    pub score_threshold: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();

        Self {
            use_vision_extraction: env_bool("RFPGRAPH_USE_VISION_EXTRACTION", false),
            max_refinement_iterations: env_u32("RFPGRAPH_MAX_REFINEMENT_ITERATIONS", 3),
            require_outline_approval: env_bool("RFPGRAPH_REQUIRE_OUTLINE_APPROVAL", true),
            use_long_context: env_bool("RFPGRAPH_USE_LONG_CONTEXT", false),
            enable_competitor_analysis: env_bool("RFPGRAPH_ENABLE_COMPETITOR_ANALYSIS", true),
            vector_backend: env_string("RFPGRAPH_VECTOR_BACKEND", "sqlite"),
            embedding_provider: env_string("RFPGRAPH_EMBEDDING_PROVIDER", "openai"),
            cache_enabled: env_bool("RFPGRAPH_CACHE_ENABLED", true),
            cache_ttl_seconds: env_u64("RFPGRAPH_CACHE_TTL_SECONDS", 3600),
            llm_default_provider: env_string("RFPGRAPH_LLM_DEFAULT_PROVIDER", "openai"),
            node_timeout_seconds: env_u64("RFPGRAPH_NODE_TIMEOUT_SECONDS", 120),
            llm_call_timeout_seconds: env_u64("RFPGRAPH_LLM_CALL_TIMEOUT_SECONDS", 30),
            circuit_breaker_failure_threshold: env_u32(
                "RFPGRAPH_CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                5,
            ),
            circuit_breaker_recovery_seconds: env_u64(
                "RFPGRAPH_CIRCUIT_BREAKER_RECOVERY_SECONDS",
                60,
            ),
            score_threshold: env_f32("RFPGRAPH_SCORE_THRESHOLD", 0.9),
        }
    }
}

impl OrchestratorConfig {
    pub fn node_timeout(&self) -> Duration {
        Duration::from_secs(self.node_timeout_seconds)
    }

    pub fn llm_call_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_call_timeout_seconds)
    }

    pub fn circuit_breaker_recovery(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_recovery_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    #[must_use]
    pub fn with_require_outline_approval(mut self, require: bool) -> Self {
        self.require_outline_approval = require;
        self
    }

    #[must_use]
    pub fn with_max_refinement_iterations(mut self, max: u32) -> Self {
        self.max_refinement_iterations = max;
        self
    }

    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_enable_competitor_analysis(mut self, enabled: bool) -> Self {
        self.enable_competitor_analysis = enabled;
        self
    }

    #[must_use]
    pub fn with_use_long_context(mut self, enabled: bool) -> Self {
        self.use_long_context = enabled;
        self
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
