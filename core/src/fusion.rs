use crate::asset::RankingAsset;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Blend parameters for combining lexical and centrality relevance.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Weight of the normalized lexical score; `1 - alpha` goes to
    /// centrality.
    pub alpha: f64,
    /// Comparability factor for centrality, whose corpus-wide magnitude
    /// (~1/N per node) is far below a normalized lexical score.
    pub centrality_scale: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            centrality_scale: 50.0,
        }
    }
}

/// One entry of the lexical candidate set supplied by the external search
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub lexical_score: f64,
}

/// Fused ranking entry with the score breakdown the serving layer surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHit {
    pub id: String,
    pub final_score: f64,
    pub lexical_score: f64,
    pub centrality: f64,
}

/// Min-max normalize the candidate set's lexical scores into [0, 1]. A
/// degenerate set (single candidate, or all scores equal) maps to 1.0 so
/// the lexical term neither vanishes nor divides by zero.
pub fn min_max_normalize(scores: &[f64]) -> Vec<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    scores
        .iter()
        .map(|&s| if range > 0.0 { (s - min) / range } else { 1.0 })
        .collect()
}

fn order_hits(x: &RankedHit, y: &RankedHit) -> Ordering {
    y.final_score
        .total_cmp(&x.final_score)
        .then(y.lexical_score.total_cmp(&x.lexical_score))
        .then_with(|| x.id.cmp(&y.id))
}

/// Fuse an externally ranked candidate set with the asset's centrality
/// scores: `final = α·minmax(lexical) + (1-α)·scale·centrality`.
///
/// Candidates absent from the centrality table (too short for the corpus,
/// or newer than the asset) contribute 0 centrality rather than erroring.
/// Ordering is fully deterministic: descending final score, then descending
/// raw lexical score, then ascending identifier.
pub fn rank(asset: &RankingAsset, candidates: &[Candidate], config: &FusionConfig) -> Vec<RankedHit> {
    let normalized = min_max_normalize(
        &candidates
            .iter()
            .map(|c| c.lexical_score)
            .collect::<Vec<_>>(),
    );
    let mut hits: Vec<RankedHit> = candidates
        .iter()
        .zip(normalized)
        .map(|(c, norm_lex)| {
            let centrality = asset.centrality_of(&c.id).unwrap_or(0.0);
            RankedHit {
                id: c.id.clone(),
                final_score: config.alpha * norm_lex
                    + (1.0 - config.alpha) * config.centrality_scale * centrality,
                lexical_score: c.lexical_score,
                centrality,
            }
        })
        .collect();
    hits.sort_by(order_hits);
    hits
}

/// Centrality-only ordering for candidate sets without lexical scores
/// (regex search mode). Descending centrality, ties by ascending id.
pub fn rank_by_centrality(asset: &RankingAsset, ids: &[String]) -> Vec<RankedHit> {
    let mut hits: Vec<RankedHit> = ids
        .iter()
        .map(|id| {
            let centrality = asset.centrality_of(id).unwrap_or(0.0);
            RankedHit {
                id: id.clone(),
                final_score: centrality,
                lexical_score: 0.0,
                centrality,
            }
        })
        .collect();
    hits.sort_by(order_hits);
    hits
}
