use crate::error::RankError;
use crate::graph::{NodeId, SimilarityEdge, SimilarityGraph};
use crate::signature::Signature;
use rayon::prelude::*;
use std::collections::HashSet;

/// Tunables for the pairwise similarity build.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Minimum Jaccard coefficient for an edge to be materialized.
    pub threshold: f64,
    /// Pair evaluations per worker chunk.
    pub chunk_size: u64,
    /// Retries per chunk before the whole build fails.
    pub max_chunk_retries: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            threshold: 0.15,
            chunk_size: 50_000,
            max_chunk_retries: 2,
        }
    }
}

/// Jaccard similarity |A∩B| / |A∪B| between two term sets; 0.0 when the
/// union is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// One contiguous range of the row-major upper-triangular pair index.
/// Chunks are disjoint, idempotent, and side-effect-free to recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairChunk {
    pub start: u64,
    pub end: u64,
}

/// Total number of unordered pairs over `n` documents.
pub fn pair_count(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

/// Number of pairs in rows strictly before row `i` (row-major order).
fn row_offset(i: u64, n: u64) -> u64 {
    i * (n - 1) - i * (i.saturating_sub(1)) / 2
}

/// Map a linear pair index back to its `(i, j)` cell, `i < j`. Binary search
/// over row offsets keeps this exact for any corpus size.
fn unrank(k: u64, n: u64) -> (usize, usize) {
    debug_assert!(k < pair_count(n as usize));
    let (mut lo, mut hi) = (0u64, n - 1);
    // invariant: row_offset(lo) <= k < row_offset(hi)
    while lo + 1 < hi {
        let mid = (lo + hi) / 2;
        if row_offset(mid, n) <= k {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let i = lo;
    let j = i + 1 + (k - row_offset(i, n));
    (i as usize, j as usize)
}

/// Split the pair space into contiguous disjoint chunks covering exactly
/// `pair_count(n)` indices.
pub fn partition_pairs(n: usize, chunk_size: u64) -> Vec<PairChunk> {
    let total = pair_count(n);
    let step = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = start.saturating_add(step).min(total);
        chunks.push(PairChunk { start, end });
        start = end;
    }
    chunks
}

/// Evaluate one chunk of the pair space, emitting edges at or above the
/// threshold. Pure function of its inputs, so a retry recomputes exactly
/// the same edge list.
pub fn compute_chunk(
    signatures: &[Signature],
    chunk: PairChunk,
    threshold: f64,
) -> Result<Vec<SimilarityEdge>, RankError> {
    let n = signatures.len() as u64;
    let mut edges = Vec::new();
    if chunk.start >= chunk.end {
        return Ok(edges);
    }
    let (mut i, mut j) = unrank(chunk.start, n);
    for _ in chunk.start..chunk.end {
        let (a, b) = (&signatures[i], &signatures[j]);
        // Size prefilter: min/max bounds the best reachable Jaccard, so a
        // failing pair can be skipped without touching the term sets. This
        // narrows the compute path only, never the edge set.
        let (lo, hi) = if a.terms.len() <= b.terms.len() {
            (a.terms.len(), b.terms.len())
        } else {
            (b.terms.len(), a.terms.len())
        };
        if hi > 0 && (lo as f64 / hi as f64) >= threshold {
            let sim = jaccard(&a.terms, &b.terms);
            if sim >= threshold && sim > 0.0 {
                edges.push(SimilarityEdge {
                    a: i as NodeId,
                    b: j as NodeId,
                    weight: sim,
                });
            }
        }
        j += 1;
        if j as u64 == n {
            i += 1;
            j = i + 1;
        }
    }
    Ok(edges)
}

fn run_chunk_with_retry<F>(
    signatures: &[Signature],
    chunk: PairChunk,
    config: &GraphConfig,
    compute: &F,
) -> Result<Vec<SimilarityEdge>, RankError>
where
    F: Fn(&[Signature], PairChunk, f64) -> Result<Vec<SimilarityEdge>, RankError> + Sync,
{
    let attempts = config.max_chunk_retries + 1;
    let mut last_reason = String::new();
    for attempt in 1..=attempts {
        match compute(signatures, chunk, config.threshold) {
            Ok(edges) => return Ok(edges),
            Err(err) => {
                tracing::warn!(
                    start = chunk.start,
                    end = chunk.end,
                    attempt,
                    %err,
                    "similarity chunk failed, retrying"
                );
                last_reason = err.to_string();
            }
        }
    }
    Err(RankError::ChunkComputeFailure {
        start: chunk.start,
        end: chunk.end,
        attempts,
        reason: last_reason,
    })
}

/// Build the similarity graph from signatures already sorted by identifier.
///
/// The pair space is partitioned into independent chunks fanned out across
/// the rayon pool; per-chunk edge lists are concatenated in chunk order, so
/// the resulting edge set is identical no matter how the work was split or
/// in what order workers finished.
pub fn build_graph(
    signatures: &[Signature],
    config: &GraphConfig,
) -> Result<SimilarityGraph, RankError> {
    build_graph_with(signatures, config, compute_chunk_adapter)
}

fn compute_chunk_adapter(
    signatures: &[Signature],
    chunk: PairChunk,
    threshold: f64,
) -> Result<Vec<SimilarityEdge>, RankError> {
    compute_chunk(signatures, chunk, threshold)
}

/// As [`build_graph`], with an injectable chunk function so the retry path
/// can be exercised deterministically.
pub fn build_graph_with<F>(
    signatures: &[Signature],
    config: &GraphConfig,
    compute: F,
) -> Result<SimilarityGraph, RankError>
where
    F: Fn(&[Signature], PairChunk, f64) -> Result<Vec<SimilarityEdge>, RankError> + Sync,
{
    let chunks = partition_pairs(signatures.len(), config.chunk_size);
    tracing::info!(
        num_docs = signatures.len(),
        num_pairs = pair_count(signatures.len()),
        num_chunks = chunks.len(),
        threshold = config.threshold,
        "computing pairwise similarity"
    );
    let per_chunk: Result<Vec<Vec<SimilarityEdge>>, RankError> = chunks
        .par_iter()
        .map(|&chunk| run_chunk_with_retry(signatures, chunk, config, &compute))
        .collect();
    let edges: Vec<SimilarityEdge> = per_chunk?.into_iter().flatten().collect();
    tracing::info!(num_edges = edges.len(), "similarity graph built");
    let nodes = signatures.iter().map(|s| s.id.clone()).collect();
    Ok(SimilarityGraph::new(nodes, edges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(terms: &[&str]) -> HashSet<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn jaccard_is_symmetric() {
        let a = set(&["the", "cat", "sat"]);
        let b = set(&["the", "cat", "ran"]);
        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn jaccard_empty_union_is_zero() {
        let e = set(&[]);
        assert_eq!(jaccard(&e, &e), 0.0);
    }

    #[test]
    fn pair_partition_covers_everything_disjointly() {
        let n = 37;
        let chunks = partition_pairs(n, 100);
        assert_eq!(chunks.first().unwrap().start, 0);
        assert_eq!(chunks.last().unwrap().end, pair_count(n));
        for w in chunks.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
    }

    #[test]
    fn unrank_walks_the_upper_triangle_in_order() {
        let n = 9u64;
        let mut expected = Vec::new();
        for i in 0..n as usize {
            for j in (i + 1)..n as usize {
                expected.push((i, j));
            }
        }
        for (k, want) in expected.iter().enumerate() {
            assert_eq!(unrank(k as u64, n), *want, "pair index {k}");
        }
    }
}
