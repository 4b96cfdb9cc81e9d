use super::*;

use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;

//-----------------------------------------------------------------------------

// (target, query, score, CIGAR) with the default scoring.
const GLOBAL_CASES: [(&str, &str, i64, &str); 16] = [
    ("ACGT", "ACGT", 382, "4M"),
    ("ACGT", "CGT", -109, "1D3M"),
    ("ACGT", "ACG", -109, "3M1D"),
    ("CGT", "ACGT", -109, "1I3M"),
    ("ACG", "ACGT", -109, "3M1I"),
    ("AGT", "ACGT", -118, "1M1I2M"),
    ("ACT", "ACGT", -118, "2M1I1M"),
    ("CGCGCGCGCG", "CGCGCGTTTTCGCG", 510, "6M4I4M"),
    ("CGCGCGCGCG", "CGAAAACGCGTTTTCGCG", 20, "2M4I4M4I4M"),
    ("ACG", "ACG", 291, "3M"),
    ("ACG", "CCG", 86, "3M"),
    ("TTGTTCTTCTTCTTC", "TTGTTCTTCTTATTATTATTCTTC", 770, "9M9I6M"),
    ("ACAACAATAAGAAAAACAAAA", "ACAACAAAAACAAAA", 842, "5M6D10M"),
    ("", "", 0, "*"),
    ("", "ACG", -460, "3I"),
    ("AC", "", -430, "2D"),
];

fn random_sequence(rng: &mut StdRng, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max_len);
    (0..len).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect()
}

// Returns a mutated copy of the sequence with substitutions and indels.
fn mutate(rng: &mut StdRng, sequence: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(sequence.len() + 10);
    for &base in sequence {
        match rng.gen_range(0..20) {
            0 => result.push(b"ACGT"[rng.gen_range(0..4)]),
            1 => {},
            2 => {
                result.push(base);
                for _ in 0..rng.gen_range(1..4) {
                    result.push(b"ACGT"[rng.gen_range(0..4)]);
                }
            },
            _ => result.push(base),
        }
    }
    result
}

fn check_cigar(cigar: &Cigar, a: &[u8], b: &[u8], name: &str) {
    assert!(cigar.is_normalized(), "CIGAR {} is not normalized for {}", cigar, name);
    assert_eq!(cigar.target_len(), a.len(), "Wrong target length for {}", name);
    assert_eq!(cigar.query_len(), b.len(), "Wrong query length for {}", name);
}

//-----------------------------------------------------------------------------

#[test]
fn global_alignment() {
    let scoring = Scoring::default();
    for (a, b, score, expected) in GLOBAL_CASES {
        let name = format!("{} vs {}", a, b);
        let (result, cigar) = affine_gap(a.as_bytes(), b.as_bytes(), &scoring);
        assert_eq!(result, score, "Wrong score for {}", name);
        assert_eq!(cigar.to_string(), expected, "Wrong CIGAR for {}", name);
        check_cigar(&cigar, a.as_bytes(), b.as_bytes(), &name);
    }
}

#[test]
fn alignment_views() {
    let scoring = Scoring::default();
    let cases = [
        ("ACGT", "CGT", "ACGT\n-CGT\n"),
        ("CGT", "ACGT", "-CGT\nACGT\n"),
        ("ACAACAATAAGAAAAACAAAA", "ACAACAAAAACAAAA", "ACAACAATAAGAAAAACAAAA\nACAAC------AAAAACAAAA\n"),
        ("TTGTTCTTCTTCTTC", "TTGTTCTTCTTATTATTATTCTTC", "TTGTTCTTC---------TTCTTC\nTTGTTCTTCTTATTATTATTCTTC\n"),
        ("", "", "\n\n"),
    ];
    for (a, b, expected) in cases {
        let (_, cigar) = affine_gap(a.as_bytes(), b.as_bytes(), &scoring);
        assert_eq!(view(a.as_bytes(), b.as_bytes(), &cigar), expected, "Wrong view for {} vs {}", a, b);
    }
}

#[test]
fn rescoring_views() {
    let scoring = Scoring::default();
    for (a, b, score, _) in GLOBAL_CASES {
        let (_, cigar) = affine_gap(a.as_bytes(), b.as_bytes(), &scoring);
        let view = view(a.as_bytes(), b.as_bytes(), &cigar);
        let lines: Vec<&str> = view.lines().collect();
        let (top, bottom) = if lines.len() == 2 { (lines[0], lines[1]) } else { ("", "") };
        let result = score_alignment(top.as_bytes(), bottom.as_bytes(), &scoring);
        assert!(result.is_ok(), "Failed to score the alignment of {} vs {}: {}", a, b, result.unwrap_err());
        assert_eq!(result.unwrap(), score, "Wrong rescored alignment for {} vs {}", a, b);
    }
    assert!(score_alignment(b"AC-", b"ACGT", &scoring).is_err(), "Scored rows of different lengths");
    let result = score_alignment(b"A--CG", b"A-TCG", &scoring);
    assert_eq!(result.unwrap(), 91 - 400 + 100 + 100, "Columns with two gaps should be ignored");
}

#[test]
fn other_presets() {
    // Gaps are more expensive than mismatches with human-chimp scores.
    let scoring = Scoring::human_chimp_two();
    let (score, cigar) = affine_gap(b"ACGT", b"AGGT", &scoring);
    assert_eq!(score, 90 - 318 + 100 + 90, "Wrong score with human-chimp scoring");
    assert_eq!(cigar.to_string(), "4M", "Wrong CIGAR with human-chimp scoring");
}

//-----------------------------------------------------------------------------

#[test]
fn blocked_fixed_cases() {
    let scoring = Scoring::default();
    for (a, b, score, expected) in GLOBAL_CASES {
        for (rows, cols) in [(1, 1), (2, 3), (3, 2), (4, 4), (7, 1), (100, 100)] {
            let name = format!("{} vs {} with {}x{} blocks", a, b, rows, cols);
            let result = affine_gap_blocked(a.as_bytes(), b.as_bytes(), &scoring, rows, cols);
            assert!(result.is_ok(), "Failed to align {}: {}", name, result.unwrap_err());
            let (result, cigar) = result.unwrap();
            assert_eq!(result, score, "Wrong score for {}", name);
            assert_eq!(cigar.to_string(), expected, "Wrong CIGAR for {}", name);
        }
    }
}

#[test]
fn blocked_equals_full() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let presets = [Scoring::default(), Scoring::mouse_rat(), Scoring::human_chimp_two()];
    for round in 0..300 {
        let scoring = &presets[round % presets.len()];
        let a = random_sequence(&mut rng, 60);
        let b = if rng.gen_bool(0.5) { mutate(&mut rng, &a) } else { random_sequence(&mut rng, 60) };
        let rows = rng.gen_range(1..12);
        let cols = rng.gen_range(1..12);
        let name = format!("round {} ({}x{} blocks)", round, rows, cols);

        let (full_score, full_cigar) = affine_gap(&a, &b, scoring);
        check_cigar(&full_cigar, &a, &b, &name);
        let blocked = affine_gap_blocked(&a, &b, scoring, rows, cols);
        assert!(blocked.is_ok(), "Failed to align {}: {}", name, blocked.unwrap_err());
        let (score, cigar) = blocked.unwrap();
        assert_eq!(score, full_score, "Wrong score for {}", name);
        assert_eq!(cigar, full_cigar, "Wrong CIGAR for {}", name);
    }
}

#[test]
fn blocked_invalid_size() {
    let scoring = Scoring::default();
    assert!(affine_gap_blocked(b"ACGT", b"ACGT", &scoring, 0, 4).is_err(), "Accepted zero block rows");
    assert!(affine_gap_blocked(b"ACGT", b"ACGT", &scoring, 4, 0).is_err(), "Accepted zero block columns");
}

//-----------------------------------------------------------------------------

#[test]
fn chunk_alignment() {
    let scoring = Scoring::default();
    let cases = [
        ("ACG", "ACG", 291, "ACG\nACG\n"),
        ("ACG", "CCG", 86, "ACG\nCCG\n"),
        ("TTGTTCTTCTTCTTC", "TTGTTCTTCTTATTATTATTCTTC", 770, "TTGTTCTTC---------TTCTTC\nTTGTTCTTCTTATTATTATTCTTC\n"),
        ("ACAACAATAAGAAAAACAAAA", "ACAACAAAAACAAAA", 842, "ACAACAATAAGAAAAACAAAA\nACAACA------AAAACAAAA\n"),
    ];
    for (a, b, score, expected) in cases {
        let name = format!("{} vs {}", a, b);
        let result = affine_gap_chunk(a.as_bytes(), b.as_bytes(), &scoring, 3);
        assert!(result.is_ok(), "Failed to align {}: {}", name, result.unwrap_err());
        let (result, cigar) = result.unwrap();
        assert_eq!(result, score, "Wrong score for {}", name);
        assert_eq!(view(a.as_bytes(), b.as_bytes(), &cigar), expected, "Wrong view for {}", name);
        check_cigar(&cigar, a.as_bytes(), b.as_bytes(), &name);
    }
}

#[test]
fn chunk_matches_full_on_chunk_boundaries() {
    let scoring = Scoring::default();
    for (a, b) in [("ACG", "ACG"), ("ACG", "CCG"), ("TTGTTCTTCTTCTTC", "TTGTTCTTCTTATTATTATTCTTC")] {
        let full = affine_gap(a.as_bytes(), b.as_bytes(), &scoring);
        let chunked = affine_gap_chunk(a.as_bytes(), b.as_bytes(), &scoring, 3).unwrap();
        assert_eq!(chunked, full, "Chunked alignment differs from the full alignment for {} vs {}", a, b);
    }
}

#[test]
fn chunk_size_one_equals_full() {
    let mut rng = StdRng::seed_from_u64(1);
    let scoring = Scoring::default();
    for round in 0..300 {
        let a = random_sequence(&mut rng, 12);
        let b = random_sequence(&mut rng, 12);
        let full = affine_gap(&a, &b, &scoring);
        let chunked = affine_gap_chunk(&a, &b, &scoring, 1);
        assert!(chunked.is_ok(), "Failed to align round {}: {}", round, chunked.unwrap_err());
        assert_eq!(chunked.unwrap(), full, "Wrong alignment in round {}", round);
    }
}

#[test]
fn chunk_invalid_lengths() {
    let scoring = Scoring::default();
    assert!(affine_gap_chunk(b"ACGT", b"ACG", &scoring, 3).is_err(), "Accepted a length that is not a multiple of the chunk size");
    assert!(affine_gap_chunk(b"ACG", b"ACG", &scoring, 0).is_err(), "Accepted chunk size 0");
}

//-----------------------------------------------------------------------------

fn block(rows: &[&str]) -> Vec<Vec<u8>> {
    rows.iter().map(|row| row.as_bytes().to_vec()).collect()
}

#[test]
fn multiple_single_rows() {
    // With one row in each block, this is pairwise alignment.
    let scoring = Scoring::default();
    for (a, b, score, expected) in GLOBAL_CASES.iter().filter(|case| !case.0.is_empty() && !case.1.is_empty()) {
        let alpha = block(&[a]);
        let beta = block(&[b]);
        let result = multiple_affine_gap(&alpha, &beta, &scoring);
        assert!(result.is_ok(), "Failed to align {} vs {}: {}", a, b, result.unwrap_err());
        let (result, cigar) = result.unwrap();
        assert_eq!(result, *score, "Wrong score for {} vs {}", a, b);
        assert_eq!(cigar.to_string(), *expected, "Wrong CIGAR for {} vs {}", a, b);
    }
}

#[test]
fn multiple_merge() {
    let scoring = Scoring::default();
    let alpha = block(&["ACGT", "AC-T"]);
    let beta = block(&["CGT"]);
    let (_, cigar) = multiple_affine_gap(&alpha, &beta, &scoring).unwrap();
    assert_eq!(cigar.to_string(), "1D3M", "Wrong profile alignment");
    let merged = merge_multiple_alignments(&alpha, &beta, &cigar);
    assert!(merged.is_ok(), "Failed to merge the blocks: {}", merged.unwrap_err());
    assert_eq!(merged.unwrap(), block(&["ACGT", "AC-T", "-CGT"]), "Wrong merged block");

    let alpha = block(&["AC"]);
    let beta = block(&["A-C", "AGC"]);
    let (_, cigar) = multiple_affine_gap(&alpha, &beta, &scoring).unwrap();
    let merged = merge_multiple_alignments(&alpha, &beta, &cigar).unwrap();
    assert_eq!(merged, block(&["A-C", "A-C", "AGC"]), "Existing gap columns were not preserved");
}

#[test]
fn multiple_invalid_blocks() {
    let scoring = Scoring::default();
    let good = block(&["ACGT"]);
    assert!(multiple_affine_gap(&[], &good, &scoring).is_err(), "Accepted an empty block");
    assert!(multiple_affine_gap(&block(&["ACGT", "AC"]), &good, &scoring).is_err(), "Accepted a ragged block");
    let cigar: Cigar = "3M".parse().unwrap();
    assert!(merge_multiple_alignments(&good, &good, &cigar).is_err(), "Merged with a CIGAR of the wrong length");
}

//-----------------------------------------------------------------------------

#[test]
fn right_local_alignment() {
    let scoring = Scoring::default();
    let mut workspace = Workspace::new();
    let cases = [
        ("ACGTAAAA", "ACGTCCCC", 382, "4M", 4, 4),
        ("ACGTTACGTACGTACGT", "ACGTACGTACGTACGT", 1128, "3M1D13M", 17, 16),
        ("ACGTACGTACGTACGT", "ACGTTACGTACGTACGT", 1128, "3M1I13M", 16, 17),
        ("TTTT", "ACGT", 0, "*", 0, 0),
        ("", "ACGT", 0, "*", 0, 0),
        ("ACGT", "", 0, "*", 0, 0),
        ("GGGGACGTACGT", "ACGTACGT", 274, "4D8M", 12, 8),
    ];
    for (target, query, score, cigar, target_len, query_len) in cases {
        let name = format!("{} vs {}", target, query);
        let result = right_local(target.as_bytes(), query.as_bytes(), &scoring, &mut workspace);
        assert_eq!(result.score, score, "Wrong score for {}", name);
        assert_eq!(result.cigar.to_string(), cigar, "Wrong CIGAR for {}", name);
        assert_eq!((result.target_len, result.query_len), (target_len, query_len), "Wrong aligned lengths for {}", name);
        assert_eq!(result.cigar.target_len(), target_len, "CIGAR does not match the target length for {}", name);
        assert_eq!(result.cigar.query_len(), query_len, "CIGAR does not match the query length for {}", name);
    }
}

#[test]
fn left_local_alignment() {
    let scoring = Scoring::default();
    let mut workspace = Workspace::new();
    let cases = [
        ("ACGTAAAA", "ACGTCCCC", 0, "*", 0, 0),
        ("ACGTTACGTACGTACGT", "ACGTACGTACGTACGT", 1237, "13M", 13, 13),
        ("TTTT", "ACGT", 91, "1M", 1, 1),
        ("GGGGACGTACGT", "ACGTACGT", 764, "8M", 8, 8),
        ("ACGTACGTAAAA", "ACGTACGTAAAAT", 728, "12M1I", 12, 13),
        ("CCCCACGTACGT", "TTACGTACGT", 764, "8M", 8, 8),
    ];
    for (target, query, score, cigar, target_len, query_len) in cases {
        let name = format!("{} vs {}", target, query);
        let result = left_local(target.as_bytes(), query.as_bytes(), &scoring, &mut workspace);
        assert_eq!(result.score, score, "Wrong score for {}", name);
        assert_eq!(result.cigar.to_string(), cigar, "Wrong CIGAR for {}", name);
        assert_eq!((result.target_len, result.query_len), (target_len, query_len), "Wrong aligned lengths for {}", name);
    }
}

#[test]
fn workspace_reuse() {
    let scoring = Scoring::default();
    let mut shared = Workspace::new();
    let mut rng = StdRng::seed_from_u64(7);
    for round in 0..50 {
        let target = random_sequence(&mut rng, 40);
        let query = mutate(&mut rng, &target);
        let reused = right_local(&target, &query, &scoring, &mut shared);
        let fresh = right_local(&target, &query, &scoring, &mut Workspace::new());
        assert_eq!(reused, fresh, "Reusing the workspace changed the result in round {}", round);
        assert!(reused.score >= 0, "Negative local score in round {}", round);
    }
}

//-----------------------------------------------------------------------------
