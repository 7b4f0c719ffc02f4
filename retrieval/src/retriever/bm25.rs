//! A minimal Okapi BM25 index over in-memory chunk text, used as the lexical
//! half of hybrid retrieval.

use std::collections::{HashMap, HashSet};

const K1: f64 = 1.2;
const B: f64 = 0.75;

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|word| !word.is_empty())
        .collect()
}

/// An index built fresh per query over the candidate set already returned by
/// vector search — small enough that there is no need to persist it.
pub struct Bm25Index {
    doc_ids: Vec<String>,
    doc_tokens: Vec<Vec<String>>,
    doc_lengths: Vec<usize>,
    avg_doc_length: f64,
    doc_freq: HashMap<String, usize>,
}

impl Bm25Index {
    pub fn build<I>(docs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut doc_ids = Vec::new();
        let mut doc_tokens = Vec::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for (id, text) in docs {
            let tokens = tokenize(&text);
            let mut seen_in_doc = HashSet::new();
            for token in &tokens {
                if seen_in_doc.insert(token.clone()) {
                    *doc_freq.entry(token.clone()).or_insert(0) += 1;
                }
            }
            doc_ids.push(id);
            doc_tokens.push(tokens);
        }

        let doc_lengths: Vec<usize> = doc_tokens.iter().map(|t| t.len()).collect();
        let avg_doc_length = if doc_lengths.is_empty() {
            0.0
        } else {
            doc_lengths.iter().sum::<usize>() as f64 / doc_lengths.len() as f64
        };

        Self {
            doc_ids,
            doc_tokens,
            doc_lengths,
            avg_doc_length,
            doc_freq,
        }
    }

    /// Ranks indexed documents against `query`, most relevant first.
    pub fn rank(&self, query: &str) -> Vec<String> {
        let query_tokens = tokenize(query);
        let n = self.doc_ids.len() as f64;
        let avg_len = self.avg_doc_length.max(1.0);

        let mut scores: Vec<(usize, f64)> = (0..self.doc_ids.len())
            .map(|i| {
                let mut score = 0.0;
                for token in &query_tokens {
                    let df = *self.doc_freq.get(token).unwrap_or(&0) as f64;
                    if df == 0.0 {
                        continue;
                    }
                    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                    let tf = self.doc_tokens[i].iter().filter(|t| *t == token).count() as f64;
                    let denom = tf + K1 * (1.0 - B + B * (self.doc_lengths[i] as f64 / avg_len));
                    if denom > 0.0 {
                        score += idf * (tf * (K1 + 1.0)) / denom;
                    }
                }
                (i, score)
            })
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.into_iter().map(|(i, _)| self.doc_ids[i].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_exact_term_match_above_unrelated_document() {
        let index = Bm25Index::build([
            ("a".to_string(), "cats are great pets and very independent".to_string()),
            ("b".to_string(), "quarterly revenue grew due to new contracts".to_string()),
        ]);
        let ranking = index.rank("independent cats");
        assert_eq!(ranking.first(), Some(&"a".to_string()));
    }

    #[test]
    fn empty_index_ranks_nothing() {
        let index = Bm25Index::build(std::iter::empty());
        assert!(index.rank("anything").is_empty());
    }
}
