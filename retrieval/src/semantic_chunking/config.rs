//! Tunables for the chunking pipeline.

use serde::{Deserialize, Serialize};

/// How a semantic breakpoint (a split between two adjacent segments) is
/// chosen from the sequence of cosine distances between consecutive
/// segment embeddings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum BreakpointStrategy {
    /// Split wherever a distance exceeds the given percentile of all
    /// observed distances (0.0-1.0). The default strategy.
    Percentile { threshold: f64 },
    /// Split wherever a distance exceeds `mean + factor * stddev`.
    StandardDeviation { factor: f64 },
    /// Split using Tukey's interquartile-range rule:
    /// `q3 + multiplier * (q3 - q1)`.
    Interquartile { multiplier: f64 },
    /// Split at the single largest jump in distance ("gradient"), useful
    /// for short documents where percentile/stddev thresholds are unstable.
    Gradient,
}

impl Default for BreakpointStrategy {
    fn default() -> Self {
        BreakpointStrategy::Percentile { threshold: 0.95 }
    }
}

/// Chunking strategy requested by a caller; `Adaptive` picks between the
/// others based on document size, matching spec.md's four named strategies.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Fixed-size windows of `max_tokens`, ignoring semantic boundaries.
    Fixed,
    /// Breakpoint-detection over segment embeddings (the default).
    #[default]
    Semantic,
    /// Respect the document's heading hierarchy first, then apply semantic
    /// breakpoints within each section.
    Hierarchical,
    /// Fixed for short documents, semantic for long ones.
    Adaptive,
}

/// Configuration for one `chunk_document` call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    /// Upper bound on tokens per chunk; chunks are force-split past this
    /// even mid-section, so a single pathological segment can't produce an
    /// unbounded chunk.
    pub max_tokens: usize,
    /// Trailing chunks below this are merged into the previous chunk.
    pub min_tokens: usize,
    /// How to choose chunk boundaries among segments.
    pub strategy: BreakpointStrategy,
    /// Overall chunking strategy (fixed/semantic/hierarchical/adaptive).
    pub chunking_strategy: ChunkingStrategy,
    /// Number of adjacent segments embedded together as one breakpoint
    /// window (smooths noisy single-sentence embeddings).
    pub buffer_size: usize,
    /// When segmentation yields too few segments for semantic breakpoint
    /// detection to be meaningful (fewer than 3), fall back to fixed-size
    /// lexical chunking instead of erroring.
    pub fallback_to_lexical: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            min_tokens: 50,
            strategy: BreakpointStrategy::default(),
            chunking_strategy: ChunkingStrategy::default(),
            buffer_size: 1,
            fallback_to_lexical: true,
        }
    }
}

/// HTML-specific segmentation knobs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct HtmlChunkingConfig {
    /// CSS selector restricting which subtree is segmented (default: whole body).
    pub root_selector: Option<String>,
    /// Tags to drop entirely before segmenting (nav/footer chrome, etc.).
    pub ignore_selectors: Vec<String>,
}

/// JSON-specific segmentation knobs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct JsonChunkingConfig {
    /// Dot-path to an array of `{heading, content}`-shaped objects. When
    /// unset, `"sections"` is used if present, else the object is
    /// flattened key-by-key.
    pub sections_path: Option<String>,
}
