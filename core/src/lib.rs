pub mod asset;
pub mod centrality;
pub mod error;
pub mod fusion;
pub mod graph;
pub mod pipeline;
pub mod signature;
pub mod similarity;

pub use asset::{AssetHandle, AssetMeta, AssetStore, RankingAsset};
pub use centrality::{CentralityConfig, CentralityOutcome};
pub use error::RankError;
pub use fusion::{Candidate, FusionConfig, RankedHit};
pub use graph::{NodeId, SimilarityEdge, SimilarityGraph};
pub use pipeline::{rebuild, BuildConfig, RawDocument};
pub use signature::{Signature, SignatureConfig};
pub use similarity::GraphConfig;
