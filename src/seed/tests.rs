use super::*;

use crate::dna;

//-----------------------------------------------------------------------------

// ATGC -> {G, C} -> TAACG
fn bubble_graph() -> Graph {
    let mut graph = Graph::new();
    let a = graph.add_node(b"ATGC".to_vec(), None);
    let b = graph.add_node(b"G".to_vec(), None);
    let c = graph.add_node(b"C".to_vec(), None);
    let d = graph.add_node(b"TAACG".to_vec(), None);
    for (from, to) in [(a, b), (a, c), (b, d), (c, d)] {
        let result = graph.add_edge(from, to, if from == a { 0.5 } else { 1.0 });
        assert!(result.is_ok(), "Failed to add edge {} -> {}: {}", from, to, result.unwrap_err());
    }
    graph
}

fn single_node(seq: &[u8]) -> Graph {
    let mut graph = Graph::new();
    graph.add_node(seq.to_vec(), None);
    graph
}

fn build_index(graph: &Graph, k: usize, step: usize) -> KmerIndex {
    let index = KmerIndex::new(graph, k, step);
    assert!(index.is_ok(), "Failed to build the index with k {} and step {}: {}", k, step, index.unwrap_err());
    index.unwrap()
}

fn check_seed(seed: &Seed, truth: &[(NodeId, usize, usize, usize)], name: &str) {
    let parts: Vec<(NodeId, usize, usize, usize)> = seed.parts.iter().map(|part| {
        (part.node, part.target_start, part.query_start, part.len)
    }).collect();
    assert_eq!(parts, truth, "Wrong parts for {}", name);
    let total: usize = truth.iter().map(|part| part.3).sum();
    assert_eq!(seed.total_len, total, "Wrong total length for {}", name);
    assert_eq!(seed.query_end(), seed.query_start() + total, "Wrong query end for {}", name);
}

//-----------------------------------------------------------------------------

#[test]
fn invalid_parameters() {
    let graph = bubble_graph();
    assert!(KmerIndex::new(&graph, 0, 1).is_err(), "Built an index with k = 0");
    assert!(KmerIndex::new(&graph, 33, 1).is_err(), "Built an index with k = 33");
    assert!(KmerIndex::new(&graph, 4, 0).is_err(), "Built an index with step 0");
    assert!(KmerIndex::new(&graph, 32, 1).is_ok(), "Failed to build an index with k = 32");
}

#[test]
fn index_contents() {
    let graph = bubble_graph();
    let index = build_index(&graph, 3, 1);
    assert_eq!(index.k(), 3, "Wrong k");
    assert_eq!(index.step(), 1, "Wrong step");
    // ATGC: 2, G: 0, C: 0, TAACG: 3
    assert_eq!(index.len(), 5, "Wrong number of occurrences");
    assert_eq!(index.occurrences(b"TGC"), &[(0, 1)], "Wrong occurrences for TGC");
    assert_eq!(index.occurrences(b"ACG"), &[(3, 2)], "Wrong occurrences for ACG");
    assert!(index.occurrences(b"GCG").is_empty(), "K-mers should not cross node boundaries");
    assert!(index.occurrences(b"AT").is_empty(), "Found a k-mer with the wrong length");
    assert!(index.occurrences(b"ANG").is_empty(), "Found a k-mer with an N");
}

#[test]
fn sampled_positions() {
    let graph = single_node(b"ACGTACGTAC");
    let index = build_index(&graph, 4, 3);
    assert_eq!(index.len(), 3, "Wrong number of sampled occurrences");
    assert_eq!(index.occurrences(b"ACGT"), &[(0, 0)], "Offset 4 should not be sampled");
    assert_eq!(index.occurrences(b"TACG"), &[(0, 3)], "Wrong occurrences for TACG");
    assert_eq!(index.occurrences(b"GTAC"), &[(0, 6)], "Wrong occurrences for GTAC");
}

#[test]
fn ambiguous_bases() {
    let graph = single_node(b"ACGNTTGCAnACGT");
    let index = build_index(&graph, 3, 1);
    // ACG, TTG, TGC, GCA, ACG, CGT
    assert_eq!(index.len(), 6, "K-mers with ambiguous bases were indexed");
    assert_eq!(index.occurrences(b"ACG"), &[(0, 0), (0, 10)], "Wrong occurrences for ACG");
    assert_eq!(index.distinct_kmers(), 5, "Wrong number of distinct k-mers");

    let lowercase = single_node(b"acgt");
    let index = build_index(&lowercase, 4, 1);
    assert_eq!(index.occurrences(b"ACGT"), &[(0, 0)], "Softmasked bases were not indexed");
}

#[test]
fn seed_within_node() {
    let graph = single_node(b"GGGATTACAGGG");
    let index = build_index(&graph, 4, 2);
    let seeds = index.find_seeds(&graph, b"CCATTACAC", Orientation::Forward);
    assert_eq!(seeds.len(), 1, "Wrong number of seeds");
    let seed = &seeds[0];
    assert_eq!(seed.orientation, Orientation::Forward, "Wrong orientation");
    check_seed(seed, &[(0, 3, 2, 6)], "ATTACA");
    assert_eq!(seed.nodes(), vec![0], "Wrong seed nodes");
}

#[test]
fn chained_seed() {
    let graph = bubble_graph();
    let index = build_index(&graph, 4, 1);

    let seeds = index.find_seeds(&graph, b"ATGCGTAACG", Orientation::Forward);
    assert_eq!(seeds.len(), 1, "Wrong number of seeds for the reference allele");
    check_seed(&seeds[0], &[(0, 0, 0, 4), (1, 0, 4, 1), (3, 0, 5, 5)], "reference allele");

    let seeds = index.find_seeds(&graph, b"ATGCCTAACG", Orientation::Forward);
    assert_eq!(seeds.len(), 1, "Wrong number of seeds for the alternate allele");
    check_seed(&seeds[0], &[(0, 0, 0, 4), (2, 0, 4, 1), (3, 0, 5, 5)], "alternate allele");
}

#[test]
fn mismatch_splits_seeds() {
    let graph = bubble_graph();
    let index = build_index(&graph, 4, 1);

    // The T after ATGC matches neither allele.
    let seeds = index.find_seeds(&graph, b"ATGCTTAACG", Orientation::Forward);
    assert_eq!(seeds.len(), 2, "Wrong number of seeds");
    check_seed(&seeds[0], &[(0, 0, 0, 4)], "left seed");
    check_seed(&seeds[1], &[(3, 0, 5, 5)], "right seed");
}

#[test]
fn reverse_orientation() {
    let graph = bubble_graph();
    let index = build_index(&graph, 4, 1);
    let query = dna::reverse_complement(b"ATGCGTAACG");
    assert!(index.find_seeds(&graph, &query, Orientation::Forward).is_empty(), "Found seeds for the reverse complement");

    let oriented = dna::reverse_complement(&query);
    let seeds = index.find_seeds(&graph, &oriented, Orientation::Reverse);
    assert_eq!(seeds.len(), 1, "Wrong number of seeds");
    assert_eq!(seeds[0].orientation, Orientation::Reverse, "Wrong orientation");
    assert_eq!(seeds[0].total_len, 10, "Wrong seed length");
}

#[test]
fn short_query() {
    let graph = bubble_graph();
    let index = build_index(&graph, 4, 1);
    assert!(index.find_seeds(&graph, b"ATG", Orientation::Forward).is_empty(), "Found seeds for a query shorter than k");
    assert!(index.find_seeds(&graph, b"", Orientation::Forward).is_empty(), "Found seeds for an empty query");
}

#[test]
fn repeated_hits() {
    let graph = single_node(b"ACGTTACGTT");
    let index = build_index(&graph, 4, 1);
    let seeds = index.find_seeds(&graph, b"ACGTT", Orientation::Forward);
    assert_eq!(seeds.len(), 2, "Wrong number of seeds");
    check_seed(&seeds[0], &[(0, 0, 0, 5)], "first copy");
    check_seed(&seeds[1], &[(0, 5, 0, 5)], "second copy");
}

//-----------------------------------------------------------------------------
