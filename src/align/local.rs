//! Alignments with one end anchored and the other end free.
//!
//! These are used for extending seeds: the alignment starts (or ends) next to the seed and may stop anywhere.
//! The empty alignment with score 0 is always a candidate, so the score is never negative.

use super::{boundary_cell, fill_cell, predecessor, Cell, Penalties, State};

use crate::cigar::Cigar;
use crate::scoring::Scoring;

//-----------------------------------------------------------------------------

/// Reusable DP buffers.
///
/// Each worker thread owns its own workspace.
#[derive(Clone, Debug, Default)]
pub struct Workspace {
    traces: Vec<u8>,
    prev: Vec<Cell>,
    curr: Vec<Cell>,
    target: Vec<u8>,
    query: Vec<u8>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Result of a local extension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalAlignment {
    /// Alignment score.
    pub score: i64,
    /// Operations in forward order.
    pub cigar: Cigar,
    /// Number of target bases aligned.
    pub target_len: usize,
    /// Number of query bases aligned.
    pub query_len: usize,
}

//-----------------------------------------------------------------------------

/// Aligns a prefix of `target` with a prefix of `query`, choosing the prefixes that maximize the score.
///
/// Ties between end cells are broken by the first cell in row-major order (shortest target prefix first).
pub fn right_local(target: &[u8], query: &[u8], scoring: &Scoring, workspace: &mut Workspace) -> LocalAlignment {
    let penalties = Penalties::from(scoring);
    let matrix = scoring.matrix();
    let (rows, cols) = (target.len(), query.len());
    let width = cols + 1;

    let Workspace { traces, prev, curr, .. } = workspace;
    traces.clear();
    traces.resize((rows + 1) * width, 0);
    prev.clear();
    for j in 0..width {
        let (cell, trace) = boundary_cell(0, j, penalties);
        prev.push(cell);
        traces[j] = trace;
    }

    let mut best = (0, 0, 0);
    for i in 1..=rows {
        curr.clear();
        let (cell, trace) = boundary_cell(i, 0, penalties);
        curr.push(cell);
        traces[i * width] = trace;
        for j in 1..width {
            let substitution = matrix.score(target[i - 1], query[j - 1]);
            let (cell, trace) = fill_cell(&prev[j - 1], &curr[j - 1], &prev[j], substitution, penalties);
            if cell.m > best.0 {
                best = (cell.m, i, j);
            }
            curr.push(cell);
            traces[i * width + j] = trace;
        }
        std::mem::swap(prev, curr);
    }

    let (score, end_i, end_j) = best;
    let mut reversed = Cigar::new();
    let (mut i, mut j, mut state) = (end_i, end_j, State::Match);
    while i > 0 || j > 0 {
        reversed.push(1, state.op());
        let next = predecessor(traces[i * width + j], state);
        match state {
            State::Match => { i -= 1; j -= 1; },
            State::Insertion => { j -= 1; },
            State::Deletion => { i -= 1; },
        }
        state = next;
    }
    reversed.reverse();

    LocalAlignment { score, cigar: reversed, target_len: end_i, query_len: end_j }
}

/// Aligns a suffix of `target` with a suffix of `query`, choosing the suffixes that maximize the score.
///
/// This is [`right_local`] on the reversed sequences.
/// The lengths in the result count bases from the ends of the sequences.
pub fn left_local(target: &[u8], query: &[u8], scoring: &Scoring, workspace: &mut Workspace) -> LocalAlignment {
    let mut rev_target = std::mem::take(&mut workspace.target);
    let mut rev_query = std::mem::take(&mut workspace.query);
    rev_target.clear();
    rev_target.extend(target.iter().rev());
    rev_query.clear();
    rev_query.extend(query.iter().rev());

    let mut result = right_local(&rev_target, &rev_query, scoring, workspace);
    result.cigar.reverse();

    workspace.target = rev_target;
    workspace.query = rev_query;
    result
}

//-----------------------------------------------------------------------------
