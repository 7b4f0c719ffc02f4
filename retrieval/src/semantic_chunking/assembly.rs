//! Groups segments into [`SemanticChunk`]s, respecting `max_tokens` (via
//! forced splitting) and `min_tokens` (via trailing-chunk merges), on top of
//! whatever breakpoints [`breakpoints::detect_breakpoints`] found.

use crate::semantic_chunking::breakpoints::Breakpoint;
use crate::semantic_chunking::config::ChunkingConfig;
use crate::semantic_chunking::segmenter::Segment;
use crate::semantic_chunking::tokenizer::Tokenizer;
use crate::semantic_chunking::types::{ChunkMetadata, ChunkingStats, SemanticChunk};

struct Group {
    segments: Vec<usize>,
    token_count: usize,
}

/// Assembles `segments` into chunks. `breakpoints` mark the semantic split
/// points; `config.max_tokens` forces additional splits inside an
/// over-long group and `config.min_tokens` merges undersized trailing
/// groups into their predecessor.
pub fn assemble_chunks(
    segments: &[Segment],
    breakpoints: &[Breakpoint],
    config: &ChunkingConfig,
    tokenizer: &dyn Tokenizer,
) -> (Vec<SemanticChunk>, ChunkingStats) {
    if segments.is_empty() {
        return (Vec::new(), ChunkingStats::default());
    }

    let token_counts: Vec<usize> = segments.iter().map(|s| tokenizer.count_tokens(&s.text)).collect();

    let semantic_groups = group_by_breakpoints(segments.len(), breakpoints);
    let split_groups = force_split(&semantic_groups, &token_counts, config.max_tokens);
    let merged_groups = merge_small_trailing(split_groups, &token_counts, config.min_tokens);

    let mut chunks = Vec::with_capacity(merged_groups.len());
    for group in &merged_groups {
        let content = group
            .segments
            .iter()
            .map(|&i| segments[i].text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let heading_hierarchy = group
            .segments
            .first()
            .map(|&i| segments[i].heading_hierarchy.clone())
            .unwrap_or_default();
        let metadata = ChunkMetadata {
            heading_hierarchy,
            ..ChunkMetadata::default()
        };
        chunks.push(SemanticChunk::new(content, group.token_count, metadata));
    }

    let total_chunks = chunks.len();
    let average_tokens = if total_chunks == 0 {
        0.0
    } else {
        chunks.iter().map(|c| c.token_count).sum::<usize>() as f64 / total_chunks as f64
    };

    let stats = ChunkingStats {
        total_segments: segments.len(),
        total_chunks,
        average_tokens,
    };

    (chunks, stats)
}

fn group_by_breakpoints(segment_count: usize, breakpoints: &[Breakpoint]) -> Vec<Group> {
    let mut boundaries: Vec<usize> = breakpoints.iter().map(|b| b.index + 1).collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut groups = Vec::new();
    let mut start = 0;
    for boundary in boundaries {
        if boundary > start && boundary <= segment_count {
            groups.push((start, boundary));
            start = boundary;
        }
    }
    if start < segment_count {
        groups.push((start, segment_count));
    }

    groups
        .into_iter()
        .map(|(start, end)| Group {
            segments: (start..end).collect(),
            token_count: 0,
        })
        .collect()
}

fn force_split(groups: &[Group], token_counts: &[usize], max_tokens: usize) -> Vec<Group> {
    if max_tokens == 0 {
        return groups
            .iter()
            .map(|g| Group {
                segments: g.segments.clone(),
                token_count: g.segments.iter().map(|&i| token_counts[i]).sum(),
            })
            .collect();
    }

    let mut out = Vec::new();
    for group in groups {
        let mut current: Vec<usize> = Vec::new();
        let mut current_tokens = 0usize;
        for &idx in &group.segments {
            let seg_tokens = token_counts[idx];
            if !current.is_empty() && current_tokens + seg_tokens > max_tokens {
                out.push(Group {
                    segments: std::mem::take(&mut current),
                    token_count: current_tokens,
                });
                current_tokens = 0;
            }
            current.push(idx);
            current_tokens += seg_tokens;
        }
        if !current.is_empty() {
            out.push(Group {
                segments: current,
                token_count: current_tokens,
            });
        }
    }
    out
}

fn merge_small_trailing(groups: Vec<Group>, token_counts: &[usize], min_tokens: usize) -> Vec<Group> {
    let _ = token_counts;
    if min_tokens == 0 || groups.len() < 2 {
        return groups;
    }

    let mut merged: Vec<Group> = Vec::with_capacity(groups.len());
    for group in groups {
        if group.token_count < min_tokens {
            if let Some(prev) = merged.last_mut() {
                prev.segments.extend(group.segments);
                prev.token_count += group.token_count;
                continue;
            }
        }
        merged.push(group);
    }
    merged
}
