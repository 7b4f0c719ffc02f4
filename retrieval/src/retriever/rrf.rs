//! Reciprocal Rank Fusion: combines several independently-ranked id lists
//! (one per query variant, plus optionally a BM25 ranking) into one ranking.

/// Fuses `rankings` (each a best-to-worst id list) using RRF with constant
/// `k` (spec default: 60 — large enough that rank 1 and rank 2 in a given
/// list aren't wildly different in contributed weight).
pub fn reciprocal_rank_fusion(rankings: &[Vec<String>], k: f64) -> Vec<(String, f64)> {
    use std::collections::HashMap;

    let mut scores: HashMap<String, f64> = HashMap::new();
    for ranking in rankings {
        for (rank, id) in ranking.iter().enumerate() {
            *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (k + rank as f64 + 1.0);
        }
    }

    let mut fused: Vec<(String, f64)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_ranked_first_in_every_list_wins() {
        let rankings = vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["a".to_string(), "c".to_string(), "b".to_string()],
        ];
        let fused = reciprocal_rank_fusion(&rankings, 60.0);
        assert_eq!(fused.first().map(|(id, _)| id.as_str()), Some("a"));
    }

    #[test]
    fn agreement_across_lists_beats_a_single_top_rank() {
        let rankings = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["b".to_string(), "a".to_string()],
            vec!["b".to_string(), "a".to_string()],
        ];
        let fused = reciprocal_rank_fusion(&rankings, 60.0);
        assert_eq!(fused.first().map(|(id, _)| id.as_str()), Some("b"));
    }
}
