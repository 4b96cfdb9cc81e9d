//! Global alignment with affine gap penalties.
//!
//! The engine is the standard three-matrix Gotoh formulation:
//!
//! * `M[i][j]`: the alignment of `a[..i]` and `b[..j]` ends with `a[i - 1]` aligned to `b[j - 1]`.
//! * `I[i][j]`: the alignment ends with an insertion (`b[j - 1]` aligned to a gap).
//! * `D[i][j]`: the alignment ends with a deletion (`a[i - 1]` aligned to a gap).
//!
//! Opening a gap from any other state costs the open penalty, and continuing a gap in the same state costs the extension penalty.
//! When several predecessors achieve the same score, the tie is broken as Match > Insertion > Deletion.
//! The same order is used for choosing the final state.
//! The order is arbitrary but observable in ambiguous alignments, so all variants share it.
//!
//! Variants:
//!
//! * [`affine_gap`]: full traceback matrix.
//! * [`blocked::affine_gap_blocked`]: checkpointed forward pass and tile-by-tile traceback with identical output.
//! * [`chunk::affine_gap_chunk`]: the same DP over fixed-size chunks of both sequences.
//! * [`multiple::multiple_affine_gap`]: profile alignment of two alignment blocks.
//! * [`local::right_local`] and [`local::left_local`]: one end anchored, the other end free.

use crate::cigar::{Cigar, Op};
use crate::dna::GAP;
use crate::scoring::Scoring;
use crate::{Error, Result};

pub mod blocked;
pub mod chunk;
pub mod local;
pub mod multiple;

pub use blocked::affine_gap_blocked;
pub use chunk::affine_gap_chunk;
pub use local::{left_local, right_local, LocalAlignment, Workspace};
pub use multiple::{merge_multiple_alignments, multiple_affine_gap};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

// Score of an unreachable state. Far enough from `i64::MIN` that adding penalties cannot overflow.
pub(crate) const NEG: i64 = i64::MIN / 4;

/// DP state of a cell; also used as a traceback pointer to the state of the predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Match = 0,
    Insertion = 1,
    Deletion = 2,
}

impl State {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => State::Match,
            1 => State::Insertion,
            _ => State::Deletion,
        }
    }

    pub(crate) fn op(self) -> Op {
        match self {
            State::Match => Op::Match,
            State::Insertion => Op::Insertion,
            State::Deletion => Op::Deletion,
        }
    }
}

// Best of the three values with ties broken as Match > Insertion > Deletion.
#[inline]
pub(crate) fn triple_max(m: i64, i: i64, d: i64) -> (i64, State) {
    if m >= i && m >= d {
        (m, State::Match)
    } else if i >= d {
        (i, State::Insertion)
    } else {
        (d, State::Deletion)
    }
}

/// Scores of the three states in a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub m: i64,
    pub i: i64,
    pub d: i64,
}

impl Cell {
    pub const ORIGIN: Cell = Cell { m: 0, i: NEG, d: NEG };

    #[inline]
    pub fn best(&self) -> (i64, State) {
        triple_max(self.m, self.i, self.d)
    }
}

/// Gap penalties in the units of the DP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Penalties {
    pub open: i64,
    pub extend: i64,
}

impl From<&Scoring> for Penalties {
    fn from(scoring: &Scoring) -> Self {
        Penalties { open: scoring.gap_open(), extend: scoring.gap_extend() }
    }
}

// Packs the traceback pointers of the three states into a byte.
#[inline]
fn pack(m: State, i: State, d: State) -> u8 {
    (m as u8) | ((i as u8) << 2) | ((d as u8) << 4)
}

/// Returns the state of the predecessor for a cell in the given state.
#[inline]
pub(crate) fn predecessor(trace: u8, state: State) -> State {
    State::from_bits(trace >> (2 * state as u8))
}

/// Computes a cell from its diagonal, left, and upper neighbors.
///
/// Returns the cell and the packed traceback pointers.
#[inline]
pub(crate) fn fill_cell(diag: &Cell, left: &Cell, up: &Cell, substitution: i64, penalties: Penalties) -> (Cell, u8) {
    let (m, m_trace) = triple_max(diag.m, diag.i, diag.d);
    let (i, i_trace) = triple_max(left.m + penalties.open, left.i + penalties.extend, left.d + penalties.open);
    let (d, d_trace) = triple_max(up.m + penalties.open, up.i + penalties.open, up.d + penalties.extend);
    (Cell { m: m + substitution, i, d }, pack(m_trace, i_trace, d_trace))
}

/// Returns the cell and the traceback pointers on the first row or column.
///
/// Row 0 consists of insertions and column 0 of deletions.
#[inline]
pub(crate) fn boundary_cell(i: usize, j: usize, penalties: Penalties) -> (Cell, u8) {
    if i == 0 && j == 0 {
        (Cell::ORIGIN, 0)
    } else if i == 0 {
        let trace = if j == 1 { State::Match } else { State::Insertion };
        let score = penalties.open + (j as i64 - 1) * penalties.extend;
        (Cell { m: NEG, i: score, d: NEG }, pack(State::Match, trace, State::Match))
    } else {
        let trace = if i == 1 { State::Match } else { State::Deletion };
        let score = penalties.open + (i as i64 - 1) * penalties.extend;
        (Cell { m: NEG, i: NEG, d: score }, pack(State::Match, State::Match, trace))
    }
}

//-----------------------------------------------------------------------------

/// Generic Gotoh DP over `rows x cols` units with a full traceback matrix.
///
/// `substitution(i, j)` is the score for aligning unit `i` of the first sequence with unit `j` of the second.
/// The returned CIGAR is in units.
pub(crate) fn gotoh<F: Fn(usize, usize) -> i64>(rows: usize, cols: usize, substitution: F, penalties: Penalties) -> (i64, Cigar) {
    let width = cols + 1;
    let mut traces = vec![0u8; (rows + 1) * width];
    let mut prev: Vec<Cell> = Vec::with_capacity(width);
    let mut curr: Vec<Cell> = Vec::with_capacity(width);

    for j in 0..width {
        let (cell, trace) = boundary_cell(0, j, penalties);
        prev.push(cell);
        traces[j] = trace;
    }
    for i in 1..=rows {
        curr.clear();
        let (cell, trace) = boundary_cell(i, 0, penalties);
        curr.push(cell);
        traces[i * width] = trace;
        for j in 1..width {
            let (cell, trace) = fill_cell(&prev[j - 1], &curr[j - 1], &prev[j], substitution(i - 1, j - 1), penalties);
            curr.push(cell);
            traces[i * width + j] = trace;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let (score, state) = prev[cols].best();
    let cigar = traceback(rows, cols, state, |i, j| traces[i * width + j]);
    (score, cigar)
}

// Follows the traceback pointers from `(i, j)` in the given state to the origin.
fn traceback<F: Fn(usize, usize) -> u8>(rows: usize, cols: usize, state: State, trace: F) -> Cigar {
    let mut reversed = Cigar::new();
    let (mut i, mut j, mut state) = (rows, cols, state);
    while i > 0 || j > 0 {
        reversed.push(1, state.op());
        let next = predecessor(trace(i, j), state);
        match state {
            State::Match => { i -= 1; j -= 1; },
            State::Insertion => { j -= 1; },
            State::Deletion => { i -= 1; },
        }
        state = next;
    }
    reversed.reverse();
    reversed
}

//-----------------------------------------------------------------------------

/// Computes the optimal global alignment of `a` (target) and `b` (query).
///
/// Returns the score and the alignment as a CIGAR, where insertions consume `b` and deletions consume `a`.
/// Empty sequences are aligned entirely to gaps.
///
/// # Examples
///
/// ```
/// use gengraph::align;
/// use gengraph::Scoring;
///
/// let (score, cigar) = align::affine_gap(b"ACGT", b"CGT", &Scoring::default());
/// assert_eq!(score, -109);
/// assert_eq!(cigar.to_string(), "1D3M");
/// assert_eq!(align::view(b"ACGT", b"CGT", &cigar), "ACGT\n-CGT\n");
/// ```
pub fn affine_gap(a: &[u8], b: &[u8], scoring: &Scoring) -> (i64, Cigar) {
    let matrix = scoring.matrix();
    gotoh(a.len(), b.len(), |i, j| matrix.score(a[i], b[j]), Penalties::from(scoring))
}

/// Renders a pairwise alignment as two lines with gaps.
///
/// The first line is `a` with gaps at insertions, and the second is `b` with gaps at deletions.
///
/// # Panics
///
/// Panics if the CIGAR consumes more bases than the sequences have.
pub fn view(a: &[u8], b: &[u8], cigar: &Cigar) -> String {
    let columns = cigar.columns();
    let mut top = String::with_capacity(columns + 1);
    let mut bottom = String::with_capacity(columns + 1);
    let (mut i, mut j) = (0, 0);
    for run in cigar.runs() {
        for _ in 0..run.len {
            match run.op {
                Op::Match => {
                    top.push(a[i] as char);
                    bottom.push(b[j] as char);
                    i += 1;
                    j += 1;
                },
                Op::Insertion => {
                    top.push(GAP as char);
                    bottom.push(b[j] as char);
                    j += 1;
                },
                Op::Deletion => {
                    top.push(a[i] as char);
                    bottom.push(GAP as char);
                    i += 1;
                },
            }
        }
    }
    top.push('\n');
    top.push_str(&bottom);
    top.push('\n');
    top
}

/// Scores an existing gapped pairwise alignment under affine gap penalties.
///
/// Columns where both rows have a gap are ignored.
/// Returns an error if the rows have different lengths.
pub fn score_alignment(a: &[u8], b: &[u8], scoring: &Scoring) -> Result<i64> {
    if a.len() != b.len() {
        return Err(Error::Config(format!("Aligned rows have different lengths: {} and {}", a.len(), b.len())));
    }
    let mut score = 0;
    let mut state = State::Match;
    for (&x, &y) in a.iter().zip(b.iter()) {
        match (x == GAP, y == GAP) {
            (true, true) => {},
            (true, false) => {
                score += if state == State::Insertion { scoring.gap_extend() } else { scoring.gap_open() };
                state = State::Insertion;
            },
            (false, true) => {
                score += if state == State::Deletion { scoring.gap_extend() } else { scoring.gap_open() };
                state = State::Deletion;
            },
            (false, false) => {
                score += scoring.score(x, y);
                state = State::Match;
            },
        }
    }
    Ok(score)
}

//-----------------------------------------------------------------------------
