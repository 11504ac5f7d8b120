use crate::error::RankError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dense node index into [`SimilarityGraph::nodes`]. Nodes are stored in
/// lexicographic identifier order, so ascending `NodeId` is also ascending
/// identifier order.
pub type NodeId = u32;

/// Undirected similarity edge between two documents, stored once per
/// unordered pair with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub a: NodeId,
    pub b: NodeId,
    /// Jaccard coefficient in [0, 1]; always at or above the build threshold.
    pub weight: f64,
}

/// Weighted undirected document-similarity graph plus the adjacency
/// structure the neighbor index reads from. Persisted as separate node and
/// edge tables and reassembled on load.
#[derive(Debug, Clone)]
pub struct SimilarityGraph {
    /// External identifiers, sorted; index = `NodeId`.
    pub nodes: Vec<String>,
    /// Edges sorted by `(a, b)`.
    pub edges: Vec<SimilarityEdge>,
    /// Per-node incident edges, sorted by descending weight then ascending
    /// neighbor id.
    adjacency: Vec<Vec<(NodeId, f64)>>,
    id_index: HashMap<String, NodeId>,
}

impl SimilarityGraph {
    /// Assemble a graph from sorted node identifiers and deduplicated edges.
    /// Edge endpoints must be valid indices into `nodes`.
    pub fn new(nodes: Vec<String>, mut edges: Vec<SimilarityEdge>) -> Self {
        debug_assert!(nodes.windows(2).all(|w| w[0] < w[1]), "nodes must be sorted and unique");
        edges.sort_by(|x, y| (x.a, x.b).cmp(&(y.a, y.b)));
        let mut adjacency: Vec<Vec<(NodeId, f64)>> = vec![Vec::new(); nodes.len()];
        for e in &edges {
            adjacency[e.a as usize].push((e.b, e.weight));
            adjacency[e.b as usize].push((e.a, e.weight));
        }
        for list in adjacency.iter_mut() {
            list.sort_by(|x, y| y.1.total_cmp(&x.1).then(x.0.cmp(&y.0)));
        }
        let id_index = Self::build_index(&nodes);
        Self {
            nodes,
            edges,
            adjacency,
            id_index,
        }
    }

    fn build_index(nodes: &[String]) -> HashMap<String, NodeId> {
        nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as NodeId))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_id(&self, external: &str) -> Option<NodeId> {
        self.id_index.get(external).copied()
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency[node as usize].len()
    }

    pub(crate) fn adjacent(&self, node: NodeId) -> &[(NodeId, f64)] {
        &self.adjacency[node as usize]
    }

    /// Top-k neighbors of a document by descending edge weight, ties broken
    /// by ascending identifier. Returns fewer than k when the degree is
    /// smaller, and `NotFound` for identifiers outside the graph.
    pub fn neighbors(&self, external: &str, k: usize) -> Result<Vec<(String, f64)>, RankError> {
        let node = self.node_id(external).ok_or_else(|| RankError::NotFound {
            id: external.to_string(),
        })?;
        Ok(self.adjacent(node)
            .iter()
            .take(k)
            .map(|&(n, w)| (self.nodes[n as usize].clone(), w))
            .collect())
    }
}
