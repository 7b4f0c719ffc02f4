//! `ChatService`: answers free-form questions about an RFP using only
//! retrieved context, backed by a response cache keyed by
//! `(query, project_id, conversation_hash)`.

use std::sync::Arc;
use std::time::Duration;

use crate::workflow::cache::TtlCache;
use crate::workflow::llm::{LlmGateway, LlmMessage, TaskType};

/// Exact literal response required when the retrieved context cannot
/// answer the question (spec.md §6.3).
pub const NO_CONTEXT_ANSWER: &str = "The provided RFP context does not contain this information.";

#[derive(Clone, Debug)]
pub struct ChatTurn {
    pub query: String,
    pub answer: String,
}

/// A minimal view of the retriever this service needs: a ranked list of
/// context snippets for a query, scoped to a project.
#[async_trait::async_trait]
pub trait ChatContextSource: Send + Sync {
    async fn retrieve_context(&self, project_id: i64, query: &str, top_k: usize) -> Vec<String>;
}

pub struct ChatService {
    llm: Arc<dyn LlmGateway>,
    context_source: Arc<dyn ChatContextSource>,
    cache: TtlCache<String>,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LlmGateway>, context_source: Arc<dyn ChatContextSource>) -> Self {
        Self {
            llm,
            context_source,
            cache: TtlCache::new(Duration::from_secs(3600)),
        }
    }

    /// Hashes the last three turns of conversation history with MD5 — a
    /// non-cryptographic keying use, not a security boundary.
    pub fn conversation_hash(history: &[ChatTurn]) -> String {
        let tail: Vec<&ChatTurn> = history.iter().rev().take(3).collect();
        let joined = tail
            .iter()
            .rev()
            .map(|t| format!("{}|{}", t.query, t.answer))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{:x}", md5::compute(joined.as_bytes()))
    }

    pub async fn ask(
        &self,
        project_id: i64,
        query: &str,
        history: &[ChatTurn],
    ) -> Result<String, crate::workflow::errors::WorkflowError> {
        let conversation_hash = Self::conversation_hash(history);
        let cache_key = format!("{project_id}:{conversation_hash}:{query}");

        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let context = self.context_source.retrieve_context(project_id, query, 6).await;
        if context.is_empty() {
            let answer = NO_CONTEXT_ANSWER.to_string();
            self.cache.insert(cache_key, answer.clone()).await;
            return Ok(answer);
        }

        let system = LlmMessage::system(
            "Answer strictly using the provided RFP context. If the answer is not \
             derivable from the context, reply with exactly: \
             \"The provided RFP context does not contain this information.\"",
        );
        let context_message =
            LlmMessage::user(format!("Context:\n{}\n\nQuestion: {query}", context.join("\n---\n")));

        let completion = self
            .llm
            .complete(TaskType::FastGeneration, vec![system, context_message], 0.2, 600)
            .await
            .map_err(|e| {
                crate::workflow::errors::WorkflowError::TransientUpstream {
                    provider: "chat".to_string(),
                    message: e.to_string(),
                }
            })?;

        self.cache.insert(cache_key, completion.text.clone()).await;
        Ok(completion.text)
    }
}
