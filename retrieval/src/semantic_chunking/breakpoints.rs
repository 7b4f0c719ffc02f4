//! Detects semantic breakpoints — split points between segments whose
//! embeddings diverge sharply — from a sequence of segment embeddings.

use crate::semantic_chunking::config::BreakpointStrategy;
use crate::semantic_chunking::types::BreakpointTrace;

/// A detected split point: insert a chunk boundary after segment `index`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Breakpoint {
    pub index: usize,
    pub distance: f64,
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

/// Computes the cosine distance between each pair of consecutive embeddings.
pub fn consecutive_distances(embeddings: &[Vec<f32>]) -> Vec<f64> {
    embeddings
        .windows(2)
        .map(|pair| cosine_distance(&pair[0], &pair[1]))
        .collect()
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p.clamp(0.0, 1.0)) * (sorted.len() as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

fn mean_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

/// Determines the distance threshold above which a gap becomes a breakpoint,
/// per the configured strategy.
fn threshold_for(distances: &[f64], strategy: &BreakpointStrategy) -> f64 {
    match strategy {
        BreakpointStrategy::Percentile { threshold } => {
            let mut sorted = distances.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            percentile(&sorted, *threshold)
        }
        BreakpointStrategy::StandardDeviation { factor } => {
            let (mean, stddev) = mean_stddev(distances);
            mean + factor * stddev
        }
        BreakpointStrategy::Interquartile { multiplier } => {
            let mut sorted = distances.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let q1 = percentile(&sorted, 0.25);
            let q3 = percentile(&sorted, 0.75);
            q3 + multiplier * (q3 - q1)
        }
        BreakpointStrategy::Gradient => {
            distances.iter().cloned().fold(f64::MIN, f64::max)
        }
    }
}

/// Finds breakpoints among `embeddings` given the configured strategy.
///
/// Returns one [`Breakpoint`] per index `i` where a chunk boundary should be
/// inserted between segment `i` and segment `i + 1`, along with a parallel
/// [`BreakpointTrace`] list for diagnostics.
pub fn detect_breakpoints(
    embeddings: &[Vec<f32>],
    strategy: &BreakpointStrategy,
) -> (Vec<Breakpoint>, Vec<BreakpointTrace>) {
    if embeddings.len() < 2 {
        return (Vec::new(), Vec::new());
    }

    let distances = consecutive_distances(embeddings);
    let threshold = threshold_for(&distances, strategy);

    let mut breakpoints = Vec::new();
    let mut trace = Vec::new();
    for (index, distance) in distances.iter().enumerate() {
        if *distance >= threshold {
            breakpoints.push(Breakpoint {
                index,
                distance: *distance,
            });
            trace.push(BreakpointTrace {
                segment_index: index,
                distance: *distance,
                threshold,
            });
        }
    }
    (breakpoints, trace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_embeddings_have_zero_distance() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_embeddings_have_distance_one() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn detects_an_obvious_gradient_breakpoint() {
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.99, 0.01],
            vec![-1.0, 0.0],
            vec![-0.99, 0.01],
        ];
        let (breakpoints, trace) =
            detect_breakpoints(&embeddings, &BreakpointStrategy::Gradient);
        assert_eq!(breakpoints.len(), 1);
        assert_eq!(breakpoints[0].index, 1);
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn too_few_embeddings_yields_no_breakpoints() {
        let (breakpoints, trace) =
            detect_breakpoints(&[vec![1.0, 0.0]], &BreakpointStrategy::default());
        assert!(breakpoints.is_empty());
        assert!(trace.is_empty());
    }
}
