//! Rfpgraph node implementations for RAG pipelines.
//!
//! This module provides ready-to-use [`Node`] implementations that integrate
//! rfpgraph-retrieval's chunking and embedding capabilities into rfpgraph workflows.
//!
//! # Feature Flag
//!
//! This module requires the `rfpgraph-nodes` feature:
//!
//! ```toml
//! [dependencies]
//! rfpgraph-retrieval = { version = "0.1", features = ["rfpgraph-nodes"] }
//! ```
//!
//! # Available Nodes
//!
//! - [`ChunkingNode`] - Semantic chunking of documents into retrievable segments
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use rfpgraph::app::GraphBuilder;
//! use rfpgraph_retrieval::nodes::ChunkingNode;
//! use rfpgraph_retrieval::service::ChunkSource;
//!
//! let chunking_node = ChunkingNode::builder()
//!     .service(chunking_service)
//!     .input_key("document_html")
//!     .output_key("chunks")
//!     .build();
//!
//! let mut builder = GraphBuilder::new();
//! builder.add_node("chunker", chunking_node);
//! builder.add_edge("Start", "chunker");
//! builder.add_edge("chunker", "End");
//! ```

mod chunking;

pub use chunking::{ChunkingNode, ChunkingNodeBuilder, ChunkingNodeError};
