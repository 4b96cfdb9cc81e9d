use super::*;

use crate::align::affine_gap;
use crate::alignment::{FLAG_FORWARD, FLAG_UNMAPPED};
use crate::formats::FastaRecord;
use crate::scoring::ScoreMatrix;
use crate::internal;

use rand::rngs::StdRng;
use rand::SeedableRng;

//-----------------------------------------------------------------------------

// Reference of length 300 with a SNP at position 101.
// Nodes: 0 = [0..100], 1 = reference allele, 2 = alternate allele, 3 = [101..300].
fn snp_graph() -> (FastaRecord, u8, Graph) {
    let (reference, variants, graph) = internal::snp_graph(7, 300, &[101]);
    let alt_base = variants[0].alt_allele[0];
    (reference, alt_base, graph)
}

fn test_params() -> AlignerParams {
    AlignerParams { seed_len: 16, step: 4, ..AlignerParams::default() }
}

fn create_aligner(graph: &Graph, params: AlignerParams) -> Aligner<'_> {
    let aligner = Aligner::new(graph, Scoring::default(), params);
    assert!(aligner.is_ok(), "Failed to create the aligner: {}", aligner.unwrap_err());
    aligner.unwrap()
}

fn align_read(aligner: &Aligner, read: &[u8], name: &str) -> GraphAlignment {
    let mut workspace = Workspace::new();
    let alignment = aligner.align(read, &mut workspace);
    assert!(alignment.is_some(), "Failed to align {}", name);
    alignment.unwrap()
}

fn check_alignment(alignment: &GraphAlignment, orientation: Orientation, path: GraphPath, cigar: &str, score: i64, name: &str) {
    assert_eq!(alignment.orientation, orientation, "Wrong orientation for {}", name);
    assert_eq!(alignment.path, path, "Wrong path for {}", name);
    assert_eq!(alignment.cigar.to_string(), cigar, "Wrong CIGAR for {}", name);
    assert_eq!(alignment.score, score, "Wrong score for {}", name);
}

//-----------------------------------------------------------------------------

#[test]
fn invalid_parameters() {
    let (_, _, graph) = snp_graph();
    let params = AlignerParams { seed_len: 0, ..AlignerParams::default() };
    assert!(Aligner::new(&graph, Scoring::default(), params).is_err(), "Created an aligner with seed length 0");
    let params = AlignerParams { step: 0, ..AlignerParams::default() };
    assert!(Aligner::new(&graph, Scoring::default(), params).is_err(), "Created an aligner with step 0");
}

#[test]
fn read_identical_to_node() {
    let mut rng = StdRng::seed_from_u64(11);
    let seq = internal::random_sequence(&mut rng, 60);
    let mut graph = Graph::new();
    let node = graph.add_node(seq.clone(), None);
    let aligner = create_aligner(&graph, test_params());

    let alignment = align_read(&aligner, &seq, "node sequence");
    let (full_score, full_cigar) = affine_gap(&seq, &seq, aligner.scoring());
    assert_eq!(alignment.score, full_score, "Score differs from the full-match score");
    assert_eq!(alignment.path, GraphPath::new(0, vec![node], 60), "Wrong path");
    assert_eq!(alignment.cigar, full_cigar, "CIGAR differs from the full-match CIGAR");
    assert_eq!(alignment.cigar.len(), 1, "The CIGAR should be a single run");
    assert_eq!(alignment.query_interval, 0..60, "Wrong query interval");
}

#[test]
fn reference_and_alternate_alleles() {
    let (reference, alt_base, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());
    let scoring = aligner.scoring();

    let read = internal::simulate_read("ref", &reference.seq, 60, 80, &[], false);
    let alignment = align_read(&aligner, &read.seq, "reference read");
    check_alignment(
        &alignment, Orientation::Forward, GraphPath::new(60, vec![0, 1, 3], 39),
        "80M", scoring.perfect_score(&read.seq), "reference read"
    );

    let read = internal::simulate_read("alt", &reference.seq, 60, 80, &[(40, alt_base)], false);
    let alignment = align_read(&aligner, &read.seq, "alternate read");
    check_alignment(
        &alignment, Orientation::Forward, GraphPath::new(60, vec![0, 2, 3], 39),
        "80M", scoring.perfect_score(&read.seq), "alternate read"
    );
}

#[test]
fn reverse_strand() {
    let (reference, _, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());

    let read = internal::simulate_read("rev", &reference.seq, 150, 80, &[], true);
    let alignment = align_read(&aligner, &read.seq, "reverse read");
    check_alignment(
        &alignment, Orientation::Reverse, GraphPath::new(49, vec![3], 129),
        "80M", aligner.scoring().perfect_score(&read.seq), "reverse read"
    );
    assert_eq!(alignment.query_interval, 0..80, "Wrong query interval");
}

#[test]
fn mismatch() {
    let (reference, _, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());
    let scoring = aligner.scoring();

    let mut rng = StdRng::seed_from_u64(3);
    let original = reference.seq[190];
    let substitute = internal::other_base(&mut rng, original);
    let read = internal::simulate_read("mismatch", &reference.seq, 150, 80, &[(40, substitute)], false);
    let alignment = align_read(&aligner, &read.seq, "read with a mismatch");
    let truth = scoring.self_score(&reference.seq[150..230]) - scoring.score(original, original) + scoring.score(original, substitute);
    check_alignment(&alignment, Orientation::Forward, GraphPath::new(49, vec![3], 129), "80M", truth, "read with a mismatch");
}

#[test]
fn unaligned_end() {
    let (reference, _, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());

    // Ns have a negative score against every base.
    let mut read = reference.seq[200..260].to_vec();
    read.extend_from_slice(&[b'N'; 20]);
    let alignment = align_read(&aligner, &read, "read with an unaligned end");
    check_alignment(
        &alignment, Orientation::Forward, GraphPath::new(99, vec![3], 159),
        "60M", aligner.scoring().self_score(&reference.seq[200..260]), "read with an unaligned end"
    );
    assert_eq!(alignment.query_interval, 0..60, "Wrong query interval");
}

#[test]
fn unalignable_reads() {
    let (_, _, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());
    let mut workspace = Workspace::new();

    assert!(aligner.align(b"GATTACA", &mut workspace).is_none(), "Aligned a read shorter than the seed length");
    assert!(aligner.align(b"", &mut workspace).is_none(), "Aligned an empty read");

    let mut rng = StdRng::seed_from_u64(1234);
    let unrelated = internal::random_sequence(&mut rng, 80);
    assert!(aligner.align(&unrelated, &mut workspace).is_none(), "Aligned an unrelated read");

    let read = vec![b'N'; 80];
    assert!(aligner.align(&read, &mut workspace).is_none(), "Aligned a read of Ns");
}

#[test]
fn cancellation() {
    let (reference, _, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());
    let mut workspace = Workspace::new();

    let read = &reference.seq[60..140];
    let cancel = AtomicBool::new(true);
    assert!(aligner.align_until(read, &mut workspace, &cancel).is_none(), "Aligned a read after cancellation");
    cancel.store(false, Ordering::Relaxed);
    assert!(aligner.align_until(read, &mut workspace, &cancel).is_some(), "Failed to align a read without cancellation");
}

#[test]
fn search_stops_early() {
    // Copies of a segment followed by the same base, and a read with a different base after the segment.
    let mut rng = StdRng::seed_from_u64(99);
    let segment = internal::random_sequence(&mut rng, 79);
    let after = b'A';
    let last = internal::other_base(&mut rng, after);
    let mut seq = Vec::new();
    for _ in 0..5 {
        seq.extend_from_slice(&segment);
        seq.push(after);
        seq.extend(internal::random_sequence(&mut rng, 20));
    }
    let mut graph = Graph::new();
    graph.add_node(seq, None);

    let rows: Vec<Vec<i64>> = (0..ALPHABET_SIZE).map(|i| {
        (0..ALPHABET_SIZE).map(|j| if i == j && i < ALPHABET_SIZE - 1 { 100 } else { -100 }).collect()
    }).collect();
    let scoring = Scoring::new(ScoreMatrix::new(&rows).unwrap(), -400, -30).unwrap();
    let aligner = Aligner::new(&graph, scoring, test_params());
    assert!(aligner.is_ok(), "Failed to create the aligner: {}", aligner.unwrap_err());
    let aligner = aligner.unwrap();

    let mut read = segment.clone();
    read.push(last);
    let mut workspace = Workspace::new();
    let cancel = AtomicBool::new(false);
    let (best, stats) = aligner.search(&read, &mut workspace, &cancel);
    assert!(best.is_some(), "Failed to align the read");
    let best = best.unwrap();
    check_alignment(&best, Orientation::Forward, GraphPath::new(0, vec![0], 79), "79M", 7900, "read ending with a mismatch");

    // Every copy gives a seed with the same bound, and the first one already reaches it.
    assert!(stats.seeds >= 5, "Expected a seed for each copy, found {}", stats.seeds);
    assert_eq!(stats.extended, 1, "Wrong number of extended seeds");
    assert_eq!(stats.examined, 1, "The search did not stop after reaching the bound");
}

//-----------------------------------------------------------------------------

#[test]
fn mapped_records() {
    let (reference, alt_base, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());
    let mut workspace = Workspace::new();

    let read = internal::simulate_read("alt", &reference.seq, 60, 80, &[(40, alt_base)], false);
    let record = aligner.map_read(&read, &mut workspace);
    assert_eq!(record.name, "alt", "Wrong name");
    assert_eq!(record.flag, FLAG_FORWARD, "Wrong flags");
    assert_eq!(record.mapq, 255, "Wrong mapping quality");
    assert_eq!(record.path, GraphPath::new(60, vec![0, 2, 3], 39), "Wrong path");
    assert_eq!(record.string_note(GirafRecord::ORIGIN_TAG), Some(&b"chr1=61"[..]), "Wrong origin");
    assert_eq!(record.string_note(GirafRecord::VARIANT_TAG), Some(&b"2=snp"[..]), "Wrong variants");
    let line = record.to_line(&graph);
    assert!(line.is_ok(), "Failed to write the record: {}", line.unwrap_err());

    let read = internal::simulate_read("rev", &reference.seq, 150, 80, &[], true);
    let record = aligner.map_read(&read, &mut workspace);
    assert_eq!(record.flag, 0, "Wrong flags for the reverse read");
    assert_eq!(record.orientation, Orientation::Reverse, "Wrong orientation for the reverse read");
    assert_eq!(record.seq, &reference.seq[150..230], "The sequence was not reverse complemented");
    assert_eq!(record.string_note(GirafRecord::ORIGIN_TAG), Some(&b"chr1=151"[..]), "Wrong origin for the reverse read");
    assert!(record.string_note(GirafRecord::VARIANT_TAG).is_none(), "Reverse read should not have variants");
}

#[test]
fn unmapped_records() {
    let (reference, _, graph) = snp_graph();
    let params = AlignerParams { min_score: 100_000, ..test_params() };
    let aligner = create_aligner(&graph, params);
    let mut workspace = Workspace::new();

    let read = internal::simulate_read("low", &reference.seq, 60, 80, &[], false);
    let record = aligner.map_read(&read, &mut workspace);
    assert_eq!(record.flag, FLAG_FORWARD | FLAG_UNMAPPED, "Low-scoring read should be flagged");
    assert!(!record.path.is_empty(), "Low-scoring read should keep its path");
    assert!(record.is_unmapped(), "Low-scoring read should be reported as unmapped");

    let read = FastqRecord { name: String::from("short"), seq: b"GATTACA".to_vec(), qual: None };
    let record = aligner.map_read(&read, &mut workspace);
    assert_eq!(record, GirafRecord::unmapped("short", b"GATTACA", None), "Wrong record for a short read");
    assert_eq!(record.string_note(GirafRecord::ORIGIN_TAG), Some(GirafRecord::UNMAPPED_ORIGIN), "Wrong origin for a short read");
}

#[test]
fn paired_reads() {
    let (reference, _, graph) = snp_graph();
    let aligner = create_aligner(&graph, test_params());
    let mut workspace = Workspace::new();

    let first = internal::simulate_read("pair", &reference.seq, 20, 80, &[], false);
    let second = internal::simulate_read("pair", &reference.seq, 200, 80, &[], true);
    let (a, b) = aligner.map_pair(&first, &second, &mut workspace);
    assert_eq!(a.flag, FLAG_FORWARD | FLAG_PAIRED | FLAG_FIRST_IN_PAIR | FLAG_PROPER_PAIR, "Wrong flags for the first mate");
    assert_eq!(b.flag, FLAG_PAIRED | FLAG_PROPER_PAIR, "Wrong flags for the second mate");

    // Both mates on the forward strand.
    let second = internal::simulate_read("pair", &reference.seq, 200, 80, &[], false);
    let (a, b) = aligner.map_pair(&first, &second, &mut workspace);
    assert!(!a.has_flag(FLAG_PROPER_PAIR), "First mate should not be in a proper pair");
    assert!(!b.has_flag(FLAG_PROPER_PAIR), "Second mate should not be in a proper pair");
    assert!(b.has_flag(FLAG_PAIRED) && !b.has_flag(FLAG_FIRST_IN_PAIR), "Wrong pair flags for the second mate");

    // The reverse mate is upstream.
    let first = internal::simulate_read("pair", &reference.seq, 200, 80, &[], false);
    let second = internal::simulate_read("pair", &reference.seq, 20, 80, &[], true);
    let (a, _) = aligner.map_pair(&first, &second, &mut workspace);
    assert!(!a.has_flag(FLAG_PROPER_PAIR), "Mates facing away from each other should not be a proper pair");

    // Too far apart.
    let params = AlignerParams { max_pair_distance: 100, ..test_params() };
    let aligner = create_aligner(&graph, params);
    let first = internal::simulate_read("pair", &reference.seq, 20, 80, &[], false);
    let second = internal::simulate_read("pair", &reference.seq, 200, 80, &[], true);
    let (a, _) = aligner.map_pair(&first, &second, &mut workspace);
    assert!(!a.has_flag(FLAG_PROPER_PAIR), "Distant mates should not be a proper pair");
}

#[test]
fn penalties() {
    let scoring = Scoring::default();
    let drops = mismatch_penalties(&scoring);
    // A: best 91, best mismatch -31.
    assert_eq!(drops[dna::base_index(b'A')], 91, "Wrong penalty for A");
    // C: best 100, best mismatch -31.
    assert_eq!(drops[dna::base_index(b'C')], 100, "Wrong penalty for C");
    assert_eq!(drops[dna::base_index(b'N')], 0, "Wrong penalty for N");
}

//-----------------------------------------------------------------------------
