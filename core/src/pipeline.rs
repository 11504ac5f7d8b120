use crate::asset::{AssetMeta, RankingAsset};
use crate::centrality::{compute_centrality, CentralityConfig};
use crate::error::RankError;
use crate::signature::{build_signature, SignatureConfig};
use crate::similarity::{build_graph, GraphConfig};

/// One corpus record as supplied by the ingestion collaborator.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: String,
    pub text: String,
}

/// Everything one offline rebuild needs.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub signature: SignatureConfig,
    pub graph: GraphConfig,
    pub centrality: CentralityConfig,
    /// Version stamped into the produced asset.
    pub version: u64,
    /// RFC3339 build timestamp recorded in the asset metadata.
    pub created_at: String,
}

/// Run the full offline pipeline: signatures, similarity graph, centrality,
/// asset assembly.
///
/// Documents below the admission threshold are logged and skipped, never
/// fatal. Signatures are sorted by identifier before the pairwise pass, so
/// an unchanged corpus and config reproduce the same asset exactly.
pub fn rebuild(
    documents: impl IntoIterator<Item = RawDocument>,
    config: &BuildConfig,
) -> Result<RankingAsset, RankError> {
    let mut signatures = Vec::new();
    let mut skipped = 0usize;
    for doc in documents {
        match build_signature(&doc.id, &doc.text, &config.signature) {
            Ok(sig) => signatures.push(sig),
            Err(RankError::TooShort { id, word_count, minimum }) => {
                tracing::warn!(%id, word_count, minimum, "document too short, excluded from corpus");
                skipped += 1;
            }
            Err(other) => return Err(other),
        }
    }
    signatures.sort_by(|a, b| a.id.cmp(&b.id));
    tracing::info!(
        num_docs = signatures.len(),
        skipped,
        "signatures built"
    );

    let graph = build_graph(&signatures, &config.graph)?;
    let outcome = compute_centrality(&graph, &config.centrality);
    tracing::info!(
        iterations = outcome.iterations,
        converged = outcome.converged,
        "centrality computed"
    );

    let meta = AssetMeta {
        version: config.version,
        created_at: config.created_at.clone(),
        num_nodes: graph.node_count() as u32,
        num_edges: graph.edge_count() as u64,
        threshold: config.graph.threshold,
        damping: config.centrality.damping,
        iterations: outcome.iterations,
        converged: outcome.converged,
    };
    Ok(RankingAsset {
        graph,
        centrality: outcome.scores,
        meta,
    })
}
