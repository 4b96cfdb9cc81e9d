// Shared utilities for the tests.

use crate::construct::{build_graph, BuildParams};
use crate::formats::{FastaRecord, FastqRecord};
use crate::graph::{Annotation, Graph, NodeKind, ALT_ALLELE, REF_ALLELE};
use crate::variant::Variant;
use crate::dna;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

//-----------------------------------------------------------------------------

// Random sequences and graphs.

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

pub(crate) fn random_sequence(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| BASES[rng.gen_range(0..BASES.len())]).collect()
}

// Returns a base different from the given one.
pub(crate) fn other_base(rng: &mut StdRng, base: u8) -> u8 {
    loop {
        let candidate = BASES[rng.gen_range(0..BASES.len())];
        if candidate != base {
            return candidate;
        }
    }
}

// A random acyclic graph with `n` nodes, where every edge goes from a smaller identifier to a larger one.
// Nodes get random annotations, and the weights are even.
pub(crate) fn random_graph(seed: u64, n: usize) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = Graph::new();
    let mut start = 1;
    for _ in 0..n {
        let len = rng.gen_range(1..=20);
        let seq = random_sequence(&mut rng, len);
        let annotation = if rng.gen_bool(0.8) {
            let allele = if rng.gen_bool(0.7) { REF_ALLELE } else { ALT_ALLELE };
            let kind = if allele == REF_ALLELE { NodeKind::Match } else { NodeKind::Snp };
            Some(Annotation::new(allele, start, kind))
        } else {
            None
        };
        graph.add_node(seq, annotation);
        start += len;
    }

    for from in 0..n {
        let edges = rng.gen_range(0..=3);
        for _ in 0..edges {
            if from + 1 >= n {
                break;
            }
            let to = rng.gen_range(from + 1..n);
            if !graph.has_edge(from as u32, to as u32) {
                let result = graph.add_edge(from as u32, to as u32, 1.0);
                assert!(result.is_ok(), "Failed to add edge {} -> {}: {}", from, to, result.unwrap_err());
            }
        }
    }
    graph.set_all_even_weights();

    if n > 0 {
        let result = graph.add_contig("random", 0..(n as u32), start - 1);
        assert!(result.is_ok(), "Failed to add a contig: {}", result.unwrap_err());
    }
    graph
}

//-----------------------------------------------------------------------------

// Reference graphs and simulated reads.

// A random reference with SNPs at the given 1-based positions, and the graph built from it.
pub(crate) fn snp_graph(seed: u64, len: usize, positions: &[usize]) -> (FastaRecord, Vec<Variant>, Graph) {
    let mut rng = StdRng::seed_from_u64(seed);
    let reference = FastaRecord { name: String::from("chr1"), seq: random_sequence(&mut rng, len) };
    let mut variants = Vec::new();
    for &pos in positions.iter() {
        let ref_base = reference.seq[pos - 1];
        let alt_base = other_base(&mut rng, ref_base);
        variants.push(Variant::new("chr1", pos, &[ref_base], &[alt_base]));
    }

    let result = build_graph(&[reference.clone()], &[variants.clone()], &BuildParams::default());
    assert!(result.is_ok(), "Failed to build the graph: {}", result.unwrap_err());
    let (graph, stats) = result.unwrap();
    assert_eq!(stats.added, positions.len(), "Some variants were not added");
    (reference, variants, graph)
}

// A read covering `seq[start..start + len]` with the given (offset, base) substitutions.
pub(crate) fn simulate_read(name: &str, seq: &[u8], start: usize, len: usize, substitutions: &[(usize, u8)], reverse: bool) -> FastqRecord {
    let mut read = seq[start..start + len].to_vec();
    for &(offset, base) in substitutions.iter() {
        read[offset] = base;
    }
    if reverse {
        read = dna::reverse_complement(&read);
    }
    let qual = vec![b'I'; read.len()];
    FastqRecord { name: name.to_string(), seq: read, qual: Some(qual) }
}

//-----------------------------------------------------------------------------
