//! Token counting abstraction.
//!
//! Chunk sizing (`max_tokens`/`min_tokens`) must be measured the same way
//! the embedding model and downstream LLM gateway measure it. The default
//! build uses `tiktoken-rs`'s `cl100k_base` encoding (the `semantic-chunking-tiktoken`
//! feature, on by default); other encodings can be swapped in behind the
//! same trait without touching the rest of the pipeline.

use std::sync::Arc;

/// Counts tokens in a string for the purpose of chunk sizing.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// Whitespace-splitting fallback, used when no tokenizer feature is enabled
/// and as a cheap approximation in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[cfg(feature = "semantic-chunking-tiktoken")]
mod tiktoken_impl {
    use super::Tokenizer;
    use tiktoken_rs::CoreBPE;

    pub struct TiktokenTokenizer {
        bpe: CoreBPE,
    }

    impl TiktokenTokenizer {
        pub fn cl100k() -> Self {
            Self {
                bpe: tiktoken_rs::cl100k_base().expect("cl100k_base encoding ships with tiktoken-rs"),
            }
        }
    }

    impl Tokenizer for TiktokenTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            self.bpe.encode_ordinary(text).len()
        }
    }
}

#[cfg(feature = "semantic-chunking-tiktoken")]
pub use tiktoken_impl::TiktokenTokenizer;

/// Returns the tokenizer selected by the active Cargo feature, falling back
/// to whitespace counting when no tokenizer feature is enabled.
pub fn default_tokenizer() -> Arc<dyn Tokenizer> {
    #[cfg(feature = "semantic-chunking-tiktoken")]
    {
        Arc::new(TiktokenTokenizer::cl100k())
    }
    #[cfg(not(feature = "semantic-chunking-tiktoken"))]
    {
        Arc::new(WhitespaceTokenizer)
    }
}
