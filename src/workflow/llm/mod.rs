//! LLM gateway: a provider-agnostic `complete`/`complete_with_images`
//! boundary wrapped in the standard timeout → retry → breaker → metrics
//! middleware chain, with model selection delegated to a [`ModelRouter`].

mod breaker;
mod gateway;
mod retry;
mod router;
pub mod testing;

pub use breaker::CircuitBreaker;
pub use gateway::{Completion, HttpLlmGateway, ImageAttachment, LlmError, LlmGateway, LlmMessage, LlmRole};
pub use retry::RetryPolicy;
pub use router::{ModelRouter, Provider, TaskType};
