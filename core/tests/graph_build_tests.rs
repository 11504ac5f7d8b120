use bookrank_core::similarity::{build_graph, build_graph_with, compute_chunk, jaccard, pair_count, partition_pairs, GraphConfig};
use bookrank_core::{RankError, Signature};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

fn sig(id: &str, terms: &[&str]) -> Signature {
    Signature {
        id: id.to_string(),
        terms: terms.iter().map(|t| t.to_string()).collect(),
        word_count: terms.len(),
    }
}

fn config(threshold: f64) -> GraphConfig {
    GraphConfig {
        threshold,
        ..GraphConfig::default()
    }
}

#[test]
fn cat_corpus_scenario() {
    // A and B overlap on {the, cat}: 2 shared of 4 distinct terms = 0.5.
    // C shares nothing, so at threshold 0.3 only edge(A,B) survives.
    let sigs = vec![
        sig("A", &["the", "cat", "sat"]),
        sig("B", &["the", "cat", "ran"]),
        sig("C", &["unrelated", "text", "entirely"]),
    ];
    let graph = build_graph(&sigs, &config(0.3)).unwrap();
    assert_eq!(graph.edge_count(), 1);
    let e = graph.edges[0];
    assert_eq!((e.a, e.b), (0, 1));
    assert!((e.weight - 0.5).abs() < 1e-12);
    assert!(graph.neighbors("C", 5).unwrap().is_empty());
}

#[test]
fn no_self_edges_and_one_edge_per_pair() {
    let sigs = vec![
        sig("A", &["x", "y"]),
        sig("B", &["x", "y"]),
        sig("C", &["x", "y"]),
    ];
    let graph = build_graph(&sigs, &config(0.1)).unwrap();
    assert_eq!(graph.edge_count(), 3);
    for e in &graph.edges {
        assert!(e.a < e.b, "self-edge or unordered pair materialized");
    }
}

#[test]
fn edge_set_is_independent_of_partitioning() {
    let sigs: Vec<Signature> = (0..30)
        .map(|i| {
            let terms: Vec<String> = (0..10).map(|t| format!("t{}", (i + t) % 17)).collect();
            Signature {
                id: format!("doc{i:02}"),
                terms: terms.into_iter().collect(),
                word_count: 10,
            }
        })
        .collect();
    let single = build_graph(
        &sigs,
        &GraphConfig { threshold: 0.2, chunk_size: u64::MAX, max_chunk_retries: 0 },
    )
    .unwrap();
    let sliced = build_graph(
        &sigs,
        &GraphConfig { threshold: 0.2, chunk_size: 7, max_chunk_retries: 0 },
    )
    .unwrap();
    assert_eq!(single.edges, sliced.edges);
    assert!(!single.edges.is_empty());
}

#[test]
fn chunk_crash_is_retried_and_result_matches_clean_run() {
    let sigs = vec![
        sig("A", &["the", "cat", "sat"]),
        sig("B", &["the", "cat", "ran"]),
        sig("C", &["the", "dog", "ran"]),
        sig("D", &["unrelated", "text"]),
    ];
    let cfg = GraphConfig {
        threshold: 0.2,
        chunk_size: 2,
        max_chunk_retries: 2,
    };

    let clean = build_graph(&sigs, &cfg).unwrap();

    let crashed_once = AtomicBool::new(false);
    let flaky = build_graph_with(&sigs, &cfg, |s, chunk, t| {
        if chunk.start == 2 && !crashed_once.swap(true, Ordering::SeqCst) {
            return Err(RankError::ChunkComputeFailure {
                start: chunk.start,
                end: chunk.end,
                attempts: 1,
                reason: "injected worker crash".into(),
            });
        }
        compute_chunk(s, chunk, t)
    })
    .unwrap();

    assert!(crashed_once.load(Ordering::SeqCst));
    assert_eq!(clean.edges, flaky.edges);
}

#[test]
fn exhausted_retries_fail_the_build() {
    let sigs = vec![sig("A", &["x"]), sig("B", &["x"])];
    let cfg = GraphConfig {
        threshold: 0.1,
        chunk_size: 10,
        max_chunk_retries: 1,
    };
    let err = build_graph_with(&sigs, &cfg, |_, chunk, _| {
        Err(RankError::ChunkComputeFailure {
            start: chunk.start,
            end: chunk.end,
            attempts: 1,
            reason: "always down".into(),
        })
    })
    .unwrap_err();
    match err {
        RankError::ChunkComputeFailure { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("expected ChunkComputeFailure, got {other:?}"),
    }
}

#[test]
fn prefilter_never_changes_the_edge_set() {
    // Wildly different signature sizes exercise the size prefilter; the
    // retained edges must equal a brute-force pass over every pair.
    let sigs = vec![
        sig("A", &["a", "b", "c", "d", "e", "f", "g", "h"]),
        sig("B", &["a"]),
        sig("C", &["a", "b", "c", "d", "e", "f", "g", "x"]),
        sig("D", &["q", "r"]),
    ];
    let threshold = 0.3;
    let graph = build_graph(&sigs, &config(threshold)).unwrap();

    let mut brute: Vec<(u32, u32)> = Vec::new();
    for i in 0..sigs.len() {
        for j in (i + 1)..sigs.len() {
            if jaccard(&sigs[i].terms, &sigs[j].terms) >= threshold {
                brute.push((i as u32, j as u32));
            }
        }
    }
    let built: Vec<(u32, u32)> = graph.edges.iter().map(|e| (e.a, e.b)).collect();
    assert_eq!(built, brute);
}

#[test]
fn jaccard_symmetry_over_random_shapes() {
    let shapes: Vec<HashSet<String>> = vec![
        ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
        ["b", "c", "d", "e"].iter().map(|s| s.to_string()).collect(),
        HashSet::new(),
    ];
    for x in &shapes {
        for y in &shapes {
            assert_eq!(jaccard(x, y), jaccard(y, x));
        }
    }
}

#[test]
fn partition_covers_exact_pair_space() {
    for n in [0usize, 1, 2, 3, 10, 101] {
        let chunks = partition_pairs(n, 13);
        let covered: u64 = chunks.iter().map(|c| c.end - c.start).sum();
        assert_eq!(covered, pair_count(n), "n = {n}");
    }
}
