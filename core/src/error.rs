use thiserror::Error;

/// Errors surfaced by the ranking engine.
///
/// Build-time failures (`TooShort`, `ChunkComputeFailure`) never touch a
/// previously published asset; query-time failures (`NotFound`,
/// `StaleAsset`) are returned to the caller and never retried internally.
#[derive(Debug, Error)]
pub enum RankError {
    /// Document is below the corpus-inclusion word count and was excluded
    /// at the signature stage. Logged and skipped by the pipeline.
    #[error("document '{id}' too short: {word_count} words (minimum {minimum})")]
    TooShort {
        id: String,
        word_count: usize,
        minimum: usize,
    },

    /// A pair-space chunk failed even after its bounded retries.
    #[error("similarity chunk [{start}, {end}) failed after {attempts} attempts: {reason}")]
    ChunkComputeFailure {
        start: u64,
        end: u64,
        attempts: u32,
        reason: String,
    },

    /// Lookup for an identifier that has no node in the published asset
    /// (e.g. excluded by the minimum-length threshold).
    #[error("no node '{id}' in the published ranking asset")]
    NotFound { id: String },

    /// A query arrived before any ranking asset was ever published. The
    /// caller should fall back to lexical-only ordering.
    #[error("no ranking asset has been published")]
    StaleAsset,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("asset codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("asset metadata error: {0}")]
    Meta(#[from] serde_json::Error),
}
