//! Document segmentation, embedding, and semantic chunking.
//!
//! Pipeline: [`segmenter`] splits a document into heading-tagged segments,
//! [`breakpoints`] finds semantic seams among their embeddings,
//! [`assembly`] groups segments into token-bounded chunks, and
//! [`service`] ties it all together behind one async entry point with an
//! [`cache::EmbeddingCache`] in front of [`embeddings::EmbeddingProvider`].

pub mod assembly;
pub mod breakpoints;
pub mod cache;
pub mod config;
pub mod embeddings;
pub mod segmenter;
pub mod service;
pub mod tokenizer;
pub mod types;

pub use service::ChunkTelemetry;
