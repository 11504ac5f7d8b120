use crate::error::RankError;
use crate::graph::{SimilarityEdge, SimilarityGraph};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build provenance recorded alongside every published asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMeta {
    pub version: u64,
    pub created_at: String,
    pub num_nodes: u32,
    pub num_edges: u64,
    pub threshold: f64,
    pub damping: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Immutable bundle of one corpus snapshot's ranking data: the similarity
/// graph plus its centrality scores. Built offline, published atomically,
/// then only ever read.
#[derive(Debug)]
pub struct RankingAsset {
    pub graph: SimilarityGraph,
    /// One score per graph node, summing to 1.0.
    pub centrality: Vec<f64>,
    pub meta: AssetMeta,
}

impl RankingAsset {
    /// O(1) centrality lookup by external identifier; `None` for documents
    /// outside this snapshot.
    pub fn centrality_of(&self, external: &str) -> Option<f64> {
        self.graph
            .node_id(external)
            .map(|n| self.centrality[n as usize])
    }

    pub fn neighbors(&self, external: &str, k: usize) -> Result<Vec<(String, f64)>, RankError> {
        self.graph.neighbors(external, k)
    }
}

/// File layout of one asset directory.
pub struct AssetPaths {
    pub root: PathBuf,
}

impl AssetPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
    fn nodes(&self) -> PathBuf {
        self.root.join("nodes.bin")
    }
    fn edges(&self) -> PathBuf {
        self.root.join("edges.bin")
    }
    fn centrality(&self) -> PathBuf {
        self.root.join("centrality.bin")
    }
    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }
}

fn write_bin<T: Serialize>(path: PathBuf, value: &T) -> Result<(), RankError> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: for<'de> Deserialize<'de>>(path: PathBuf) -> Result<T, RankError> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

/// Write all four asset tables into `paths.root`.
pub fn save_asset(paths: &AssetPaths, asset: &RankingAsset) -> Result<(), RankError> {
    create_dir_all(&paths.root)?;
    write_bin(paths.nodes(), &asset.graph.nodes)?;
    write_bin(paths.edges(), &asset.graph.edges)?;
    write_bin(paths.centrality(), &asset.centrality)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(&asset.meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

/// Load a complete asset from one asset directory.
pub fn load_asset(paths: &AssetPaths) -> Result<RankingAsset, RankError> {
    let nodes: Vec<String> = read_bin(paths.nodes())?;
    let edges: Vec<SimilarityEdge> = read_bin(paths.edges())?;
    let centrality: Vec<f64> = read_bin(paths.centrality())?;
    let mut buf = String::new();
    File::open(paths.meta())?.read_to_string(&mut buf)?;
    let meta: AssetMeta = serde_json::from_str(&buf)?;
    Ok(RankingAsset {
        graph: SimilarityGraph::new(nodes, edges),
        centrality,
        meta,
    })
}

/// Versioned asset store with atomic publish.
///
/// Publish protocol: write the complete asset into `asset-{v}.tmp`, rename
/// it to `asset-{v}`, then rewrite the `CURRENT` pointer file through its
/// own tmp-and-rename. A reader following `CURRENT` therefore never sees a
/// partially written asset, and a failed build leaves the previous pointer
/// untouched.
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn current_file(&self) -> PathBuf {
        self.root.join("CURRENT")
    }

    fn asset_dir(&self, version: u64) -> PathBuf {
        self.root.join(format!("asset-{version:06}"))
    }

    pub fn publish(&self, asset: &RankingAsset) -> Result<PathBuf, RankError> {
        create_dir_all(&self.root)?;
        let final_dir = self.asset_dir(asset.meta.version);
        let tmp_dir = final_dir.with_extension("tmp");
        save_asset(&AssetPaths::new(&tmp_dir), asset)?;
        std::fs::rename(&tmp_dir, &final_dir)?;

        let pointer_tmp = self.root.join("CURRENT.tmp");
        std::fs::write(&pointer_tmp, format!("asset-{:06}\n", asset.meta.version))?;
        std::fs::rename(&pointer_tmp, self.current_file())?;
        tracing::info!(version = asset.meta.version, dir = %final_dir.display(), "ranking asset published");
        Ok(final_dir)
    }

    /// Load whatever `CURRENT` points at; `StaleAsset` when nothing has
    /// ever been published here.
    pub fn load_current(&self) -> Result<RankingAsset, RankError> {
        let pointer = match std::fs::read_to_string(self.current_file()) {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RankError::StaleAsset)
            }
            Err(e) => return Err(e.into()),
        };
        load_asset(&AssetPaths::new(self.root.join(pointer.trim())))
    }
}

/// Shared read-only handle the query path holds. Readers clone the `Arc`
/// under a short read lock; a reload swaps the whole asset in one write.
#[derive(Default)]
pub struct AssetHandle {
    current: RwLock<Option<Arc<RankingAsset>>>,
}

impl AssetHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_asset(asset: RankingAsset) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(asset))),
        }
    }

    /// Current asset, or `StaleAsset` before the first publish.
    pub fn get(&self) -> Result<Arc<RankingAsset>, RankError> {
        self.current.read().clone().ok_or(RankError::StaleAsset)
    }

    pub fn install(&self, asset: RankingAsset) {
        *self.current.write() = Some(Arc::new(asset));
    }
}
