//! Test doubles for [`LlmGateway`], used by node unit tests so they never
//! make network calls.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::gateway::{Completion, ImageAttachment, LlmError, LlmGateway, LlmMessage};
use super::router::{Provider, TaskType};

/// Always returns the same canned response text, recording every call for
/// assertions.
pub struct StubLlmGateway {
    response: String,
    calls: Mutex<Vec<(TaskType, usize)>>,
}

impl StubLlmGateway {
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmGateway for StubLlmGateway {
    async fn complete(
        &self,
        task: TaskType,
        messages: Vec<LlmMessage>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        self.calls.lock().push((task, messages.len()));
        Ok(Completion {
            text: self.response.clone(),
            model: "stub-model".to_string(),
            provider: Provider::OpenAi,
        })
    }

    async fn complete_with_images(
        &self,
        task: TaskType,
        messages: Vec<LlmMessage>,
        _images: Vec<ImageAttachment>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        self.complete(task, messages, temperature, max_tokens).await
    }
}

/// Returns a scripted sequence of responses per `TaskType`, falling back to
/// a default once a task's queue is drained. Used by end-to-end workflow
/// tests that need the critic to return different scores across
/// successive refinement visits (analyzer, challenge_extractor, and critic
/// all route through `TaskType::Analysis`; since analyzer and
/// challenge_extractor each run exactly once, before the critic/refine
/// cycle starts, the `Analysis` queue is read in the order
/// `[analyzer, challenge_extractor, critic, critic, ...]`).
pub struct ScriptedLlmGateway {
    queues: Mutex<std::collections::HashMap<TaskType, std::collections::VecDeque<String>>>,
    default_response: String,
}

impl ScriptedLlmGateway {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            queues: Mutex::new(std::collections::HashMap::new()),
            default_response: default_response.into(),
        }
    }

    #[must_use]
    pub fn with_queue(self, task: TaskType, responses: impl IntoIterator<Item = String>) -> Self {
        self.queues
            .lock()
            .insert(task, responses.into_iter().collect());
        self
    }
}

#[async_trait]
impl LlmGateway for ScriptedLlmGateway {
    async fn complete(
        &self,
        task: TaskType,
        _messages: Vec<LlmMessage>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        let text = self
            .queues
            .lock()
            .get_mut(&task)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| self.default_response.clone());
        Ok(Completion {
            text,
            model: "scripted-model".to_string(),
            provider: Provider::OpenAi,
        })
    }

    async fn complete_with_images(
        &self,
        task: TaskType,
        messages: Vec<LlmMessage>,
        _images: Vec<ImageAttachment>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        self.complete(task, messages, temperature, max_tokens).await
    }
}

/// Always fails with the given error, for exercising node failure paths.
pub struct FailingLlmGateway {
    pub error: LlmError,
}

#[async_trait]
impl LlmGateway for FailingLlmGateway {
    async fn complete(
        &self,
        _task: TaskType,
        _messages: Vec<LlmMessage>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        Err(self.error.clone())
    }

    async fn complete_with_images(
        &self,
        _task: TaskType,
        _messages: Vec<LlmMessage>,
        _images: Vec<ImageAttachment>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Completion, LlmError> {
        Err(self.error.clone())
    }
}
