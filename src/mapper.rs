//! Seed-and-extend alignment of reads to a genome graph.
//!
//! For each read, the [`Aligner`] finds exact-match seeds for both the read and its reverse complement using a [`KmerIndex`].
//! Seeds are ranked by length, and each seed is extended to the left and to the right through the graph (see [`crate::extend`]).
//! The alignment is the concatenation of the left extension, the seed as a match run, and the right extension.
//!
//! A seed is skipped if an upper bound for the alignments containing it cannot beat the best alignment.
//! The bound is the perfect score, reduced by the smallest possible penalty for the query base next to the seed when the seed cannot be extended without a mismatch or a gap.
//! The search stops when the best alignment found so far reaches the bound of every remaining seed, which includes reaching the perfect score of the read.
//!
//! Reads shorter than the seed length, reads without seeds, and reads without a positive alignment are unmapped.
//! Such reads are still reported as [`GirafRecord`]s.

use crate::alignment::{GirafRecord, GraphPath, FLAG_FIRST_IN_PAIR, FLAG_PAIRED, FLAG_PROPER_PAIR};
use crate::cigar::{Cigar, Op};
use crate::dna::{self, ALPHABET_SIZE};
use crate::extend::{extend_left, extend_right};
use crate::formats::FastqRecord;
use crate::graph::Graph;
use crate::projection;
use crate::scoring::Scoring;
use crate::seed::{KmerIndex, Seed};
use crate::Result;

use std::cmp::Reverse;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use gbwt::Orientation;
use log::{debug, info, warn};

pub use crate::align::Workspace;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Parameters for the aligner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignerParams {
    /// Length of the exact-match seeds.
    pub seed_len: usize,
    /// Node k-mers are indexed at offsets divisible by the step size.
    pub step: usize,
    /// Alignments with a lower score are flagged as unmapped.
    pub min_score: i64,
    /// Maximum distance between the starting positions of the mates in a proper pair.
    pub max_pair_distance: usize,
}

impl AlignerParams {
    /// Default seed length.
    pub const SEED_LEN: usize = 32;

    /// Default step size.
    pub const STEP: usize = 32;

    /// Default minimum alignment score.
    pub const MIN_SCORE: i64 = 1200;

    /// Default maximum distance between mates.
    pub const MAX_PAIR_DISTANCE: usize = 10000;
}

impl Default for AlignerParams {
    fn default() -> Self {
        AlignerParams {
            seed_len: Self::SEED_LEN,
            step: Self::STEP,
            min_score: Self::MIN_SCORE,
            max_pair_distance: Self::MAX_PAIR_DISTANCE,
        }
    }
}

/// The best alignment of a read to the graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphAlignment {
    /// Orientation of the read.
    pub orientation: Orientation,
    /// Aligned interval of the read in the orientation of the alignment.
    pub query_interval: Range<usize>,
    /// Target path.
    pub path: GraphPath,
    /// Alignment operations.
    pub cigar: Cigar,
    /// Alignment score.
    pub score: i64,
}

//-----------------------------------------------------------------------------

// Seed counts for one read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SearchStats {
    perfect: i64,
    seeds: usize,
    examined: usize,
    extended: usize,
}

/// A seed-and-extend aligner for a graph.
///
/// The aligner borrows the graph and owns the k-mer index.
/// It can be shared between threads, as long as each thread uses its own [`Workspace`].
///
/// # Examples
///
/// ```
/// use gengraph::{Aligner, AlignerParams, Graph, Scoring, Workspace};
///
/// let mut graph = Graph::new();
/// let node = graph.add_node(b"GATTACAGATTACACATTAG".to_vec(), None);
/// let params = AlignerParams { seed_len: 8, step: 1, ..AlignerParams::default() };
/// let aligner = Aligner::new(&graph, Scoring::default(), params).unwrap();
///
/// let mut workspace = Workspace::new();
/// let alignment = aligner.align(b"ACAGATTACACA", &mut workspace).unwrap();
/// assert_eq!(alignment.path.nodes, vec![node]);
/// assert_eq!(alignment.path.start, 4);
/// assert_eq!(alignment.cigar.to_string(), "12M");
/// ```
#[derive(Clone, Debug)]
pub struct Aligner<'a> {
    graph: &'a Graph,
    index: KmerIndex,
    scoring: Scoring,
    params: AlignerParams,
    // Smallest score loss caused by a query base that is not aligned as a match, by scoring index.
    drops: [i64; ALPHABET_SIZE],
}

impl<'a> Aligner<'a> {
    /// Builds the k-mer index and returns an aligner for the graph.
    ///
    /// Returns an error if the seed length or the step size is invalid.
    pub fn new(graph: &'a Graph, scoring: Scoring, params: AlignerParams) -> Result<Self> {
        let index = KmerIndex::new(graph, params.seed_len, params.step)?;
        info!(
            "Indexed {} occurrences of {} distinct {}-mers with step {}",
            index.len(), index.distinct_kmers(), params.seed_len, params.step
        );
        let drops = mismatch_penalties(&scoring);
        Ok(Aligner { graph, index, scoring, params, drops })
    }

    /// Returns the graph.
    #[inline]
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// Returns the k-mer index.
    #[inline]
    pub fn index(&self) -> &KmerIndex {
        &self.index
    }

    /// Returns the scoring model.
    #[inline]
    pub fn scoring(&self) -> &Scoring {
        &self.scoring
    }

    /// Returns the parameters.
    #[inline]
    pub fn params(&self) -> &AlignerParams {
        &self.params
    }

    /// Returns the best alignment of the read, or `None` if the read cannot be aligned.
    pub fn align(&self, read: &[u8], workspace: &mut Workspace) -> Option<GraphAlignment> {
        let cancel = AtomicBool::new(false);
        self.align_until(read, workspace, &cancel)
    }

    /// Returns the best alignment of the read, or `None` if the read cannot be aligned.
    ///
    /// The cancellation flag is checked before extending each seed.
    /// If the flag is set, the best alignment found so far is returned.
    pub fn align_until(&self, read: &[u8], workspace: &mut Workspace, cancel: &AtomicBool) -> Option<GraphAlignment> {
        let (best, stats) = self.search(read, workspace, cancel);
        debug!(
            "{} seeds, {} examined, {} extended, best score {} / {}",
            stats.seeds, stats.examined, stats.extended, best.as_ref().map_or(0, |best| best.score), stats.perfect
        );
        best.filter(|best| best.score > 0)
    }

    fn search(&self, read: &[u8], workspace: &mut Workspace, cancel: &AtomicBool) -> (Option<GraphAlignment>, SearchStats) {
        let mut stats = SearchStats::default();
        if read.len() < self.params.seed_len {
            return (None, stats);
        }
        let perfect = self.scoring.perfect_score(read);
        stats.perfect = perfect;
        let reverse = dna::reverse_complement(read);

        let mut seeds = self.index.find_seeds(self.graph, read, Orientation::Forward);
        seeds.extend(self.index.find_seeds(self.graph, &reverse, Orientation::Reverse));
        seeds.sort_by_key(|seed| {
            let first = seed.parts[0];
            (Reverse(seed.total_len), seed.orientation == Orientation::Reverse, first.query_start, first.node, first.target_start)
        });
        stats.seeds = seeds.len();

        // remaining[i] is the largest bound among seeds i.., so the search can stop once the best alignment reaches it.
        let bounds: Vec<i64> = seeds.iter().map(|seed| self.upper_bound(seed, query_for(seed, read, &reverse), perfect)).collect();
        let mut remaining = bounds.clone();
        for i in (1..remaining.len()).rev() {
            remaining[i - 1] = remaining[i - 1].max(remaining[i]);
        }

        let mut best: Option<GraphAlignment> = None;
        for (i, seed) in seeds.iter().enumerate() {
            let best_score = best.as_ref().map_or(0, |best| best.score);
            if best_score >= remaining[i] || cancel.load(Ordering::Relaxed) {
                break;
            }
            stats.examined += 1;
            if bounds[i] <= best_score {
                continue;
            }
            let candidate = self.extend_seed(seed, query_for(seed, read, &reverse), workspace);
            stats.extended += 1;
            if candidate.score > best_score {
                best = Some(candidate);
            }
        }

        (best, stats)
    }

    // Seeds are maximal exact matches. If the seed ends before the end of the query and cannot be continued
    // in the graph, the next query base cannot be aligned as a match in any alignment containing the seed.
    // The bound is at most the perfect score.
    fn upper_bound(&self, seed: &Seed, query: &[u8], perfect: i64) -> i64 {
        let first = seed.parts[0];
        let mut bound = perfect;
        if first.query_start > 0 && first.target_start > 0 {
            bound -= self.drops[dna::base_index(query[first.query_start - 1])];
        }
        if seed.query_end() < query.len() {
            bound -= self.drops[dna::base_index(query[seed.query_end()])];
        }
        bound
    }

    fn extend_seed(&self, seed: &Seed, query: &[u8], workspace: &mut Workspace) -> GraphAlignment {
        let first = seed.parts[0];
        let last = seed.parts[seed.parts.len() - 1];
        let (query_start, query_end) = (seed.query_start(), seed.query_end());

        let left_query = &query[..query_start];
        let left_budget = left_query.len() + self.scoring.max_deletion(self.scoring.perfect_score(left_query));
        let left = extend_left(self.graph, first.node, first.target_start, left_query, left_budget, &self.scoring, workspace);

        let right_query = &query[query_end..];
        let right_budget = right_query.len() + self.scoring.max_deletion(self.scoring.perfect_score(right_query));
        let right = extend_right(self.graph, last.node, last.target_end(), right_query, right_budget, &self.scoring, workspace);

        let score = left.score + self.scoring.self_score(&query[query_start..query_end]) + right.score;
        let mut cigar = left.cigar;
        cigar.push(seed.total_len, Op::Match);
        cigar.append(&right.cigar);

        let mut nodes = left.nodes;
        nodes.extend(seed.parts.iter().map(|part| part.node));
        nodes.extend(right.nodes);
        GraphAlignment {
            orientation: seed.orientation,
            query_interval: (query_start - left.query_len)..(query_end + right.query_len),
            path: GraphPath::new(left.offset, nodes, right.offset),
            cigar,
            score,
        }
    }
}

//-----------------------------------------------------------------------------

/// Reads as GIRAF records.
impl<'a> Aligner<'a> {
    /// Aligns the read and returns the result as a GIRAF record.
    ///
    /// Unaligned reads become unmapped records.
    pub fn map_read(&self, read: &FastqRecord, workspace: &mut Workspace) -> GirafRecord {
        let cancel = AtomicBool::new(false);
        self.map_read_until(read, workspace, &cancel)
    }

    /// Aligns the read and returns the result as a GIRAF record, checking the cancellation flag between seeds.
    pub fn map_read_until(&self, read: &FastqRecord, workspace: &mut Workspace, cancel: &AtomicBool) -> GirafRecord {
        let alignment = self.align_until(&read.seq, workspace, cancel);
        let qual = read.qual.as_deref();
        match projection::giraf_record(self.graph, &read.name, &read.seq, qual, alignment.as_ref(), self.params.min_score) {
            Ok(record) => record,
            Err(err) => {
                warn!("Could not project the alignment of {}: {}", read.name, err);
                GirafRecord::unmapped(&read.name, &read.seq, qual)
            }
        }
    }

    /// Aligns both mates of a pair and sets the pair flags.
    ///
    /// Both records get the paired flag, and the first mate gets the first-in-pair flag.
    /// The pair is proper if both mates map to the same contig within the maximum distance,
    /// with the upstream mate on the forward strand and the downstream mate on the reverse strand.
    pub fn map_pair(&self, first: &FastqRecord, second: &FastqRecord, workspace: &mut Workspace) -> (GirafRecord, GirafRecord) {
        let cancel = AtomicBool::new(false);
        self.map_pair_until(first, second, workspace, &cancel)
    }

    /// Aligns both mates of a pair, checking the cancellation flag between seeds.
    pub fn map_pair_until(
        &self, first: &FastqRecord, second: &FastqRecord, workspace: &mut Workspace, cancel: &AtomicBool
    ) -> (GirafRecord, GirafRecord) {
        let mut first = self.map_read_until(first, workspace, cancel);
        let mut second = self.map_read_until(second, workspace, cancel);
        first.flag |= FLAG_PAIRED | FLAG_FIRST_IN_PAIR;
        second.flag |= FLAG_PAIRED;
        if self.is_proper_pair(&first, &second) {
            first.flag |= FLAG_PROPER_PAIR;
            second.flag |= FLAG_PROPER_PAIR;
        }
        (first, second)
    }

    fn is_proper_pair(&self, first: &GirafRecord, second: &GirafRecord) -> bool {
        if first.is_unmapped() || second.is_unmapped() {
            return false;
        }
        let (first_contig, first_pos) = match projection::origin(first) {
            Some(origin) => origin,
            None => return false,
        };
        let (second_contig, second_pos) = match projection::origin(second) {
            Some(origin) => origin,
            None => return false,
        };
        if first_contig != second_contig || first_pos.abs_diff(second_pos) >= self.params.max_pair_distance {
            return false;
        }
        match (first.orientation, second.orientation) {
            (Orientation::Forward, Orientation::Reverse) => first_pos <= second_pos,
            (Orientation::Reverse, Orientation::Forward) => first_pos >= second_pos,
            _ => false,
        }
    }
}

//-----------------------------------------------------------------------------

// Returns the query in the orientation of the seed.
fn query_for<'b>(seed: &Seed, forward: &'b [u8], reverse: &'b [u8]) -> &'b [u8] {
    match seed.orientation {
        Orientation::Forward => forward,
        Orientation::Reverse => reverse,
    }
}

// For each query base, the smallest score loss when the base is not aligned as a match.
// The alternatives are ending the alignment, a mismatch, and a gap.
fn mismatch_penalties(scoring: &Scoring) -> [i64; ALPHABET_SIZE] {
    let matrix = scoring.matrix();
    let mut result = [0; ALPHABET_SIZE];
    for (i, value) in result.iter_mut().enumerate() {
        let best = (0..ALPHABET_SIZE).map(|j| matrix.score_index(i, j)).max().unwrap_or(0).max(0);
        let mismatch = (0..ALPHABET_SIZE).filter(|&j| j != i)
            .map(|j| matrix.score_index(i, j).max(matrix.score_index(j, i)))
            .max().unwrap_or(0);
        *value = best.min(best - mismatch).min(-scoring.gap_open()).max(0);
    }
    result
}

//-----------------------------------------------------------------------------
