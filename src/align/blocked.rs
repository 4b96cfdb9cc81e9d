//! Memory-bounded global alignment.
//!
//! The forward pass keeps only two rows of the DP, but it saves every `block_rows`-th row and every `block_cols`-th column as checkpoints.
//! The traceback then recomputes the traceback pointers one tile at a time.
//! A tile spans the rows between two consecutive row checkpoints and the columns between two consecutive column checkpoints, so only `block_rows * block_cols` pointers exist at any time.
//! Because the tiles are recomputed with the same recurrences and tie-breaks from the same values, the result is identical to [`super::affine_gap`].

use super::{boundary_cell, fill_cell, predecessor, Cell, Penalties, State};

use crate::cigar::Cigar;
use crate::scoring::Scoring;
use crate::{Error, Result};

//-----------------------------------------------------------------------------

// Checkpoints saved during the forward pass.
struct Checkpoints {
    block_rows: usize,
    block_cols: usize,
    // Row `k * block_rows` for all `k`.
    rows: Vec<Vec<Cell>>,
    // Column `k * block_cols` for all `k`.
    cols: Vec<Vec<Cell>>,
}

impl Checkpoints {
    fn row(&self, i: usize) -> &[Cell] {
        &self.rows[i / self.block_rows]
    }

    fn col(&self, j: usize) -> &[Cell] {
        &self.cols[j / self.block_cols]
    }
}

// A recomputed tile with rows `r0..=r1` and columns `c0..=c1`.
// Row `r0` and column `c0` come from the checkpoints and have no traceback pointers.
struct Tile {
    r0: usize,
    c0: usize,
    width: usize,
    traces: Vec<u8>,
}

impl Tile {
    fn trace(&self, i: usize, j: usize) -> u8 {
        self.traces[(i - self.r0 - 1) * self.width + (j - self.c0 - 1)]
    }
}

//-----------------------------------------------------------------------------

/// Computes the same alignment as [`super::affine_gap`] using `O(block_rows * block_cols)` traceback memory.
///
/// Checkpoints take `O((m * n) / block_rows + (m * n) / block_cols)` cells.
/// Returns an error if either block size is zero.
pub fn affine_gap_blocked(a: &[u8], b: &[u8], scoring: &Scoring, block_rows: usize, block_cols: usize) -> Result<(i64, Cigar)> {
    if block_rows == 0 || block_cols == 0 {
        return Err(Error::Config(format!("Invalid block size {}x{}", block_rows, block_cols)));
    }
    let penalties = Penalties::from(scoring);
    let matrix = scoring.matrix();
    let substitution = |i: usize, j: usize| matrix.score(a[i], b[j]);
    let (rows, cols) = (a.len(), b.len());

    // Forward pass.
    let mut checkpoints = Checkpoints {
        block_rows,
        block_cols,
        rows: Vec::with_capacity(rows / block_rows + 1),
        cols: vec![Vec::with_capacity(rows + 1); cols / block_cols + 1],
    };
    let mut prev: Vec<Cell> = (0..=cols).map(|j| boundary_cell(0, j, penalties).0).collect();
    for (k, column) in checkpoints.cols.iter_mut().enumerate() {
        column.push(prev[k * block_cols]);
    }
    checkpoints.rows.push(prev.clone());
    let mut curr: Vec<Cell> = Vec::with_capacity(cols + 1);
    for i in 1..=rows {
        curr.clear();
        curr.push(boundary_cell(i, 0, penalties).0);
        for j in 1..=cols {
            let (cell, _) = fill_cell(&prev[j - 1], &curr[j - 1], &prev[j], substitution(i - 1, j - 1), penalties);
            curr.push(cell);
        }
        for (k, column) in checkpoints.cols.iter_mut().enumerate() {
            column.push(curr[k * block_cols]);
        }
        if i % block_rows == 0 {
            checkpoints.rows.push(curr.clone());
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let (score, mut state) = prev[cols].best();
    drop(prev);
    drop(curr);

    // Traceback, one tile at a time.
    let mut reversed = Cigar::new();
    let (mut i, mut j) = (rows, cols);
    while i > 0 && j > 0 {
        let tile = compute_tile(&checkpoints, i, j, rows, cols, &substitution, penalties);
        while i > tile.r0 && j > tile.c0 {
            reversed.push(1, state.op());
            let next = predecessor(tile.trace(i, j), state);
            match state {
                State::Match => { i -= 1; j -= 1; },
                State::Insertion => { j -= 1; },
                State::Deletion => { i -= 1; },
            }
            state = next;
        }
    }
    // The first row consists of insertions and the first column of deletions.
    while i > 0 || j > 0 {
        let (_, trace) = boundary_cell(i, j, penalties);
        reversed.push(1, state.op());
        let next = predecessor(trace, state);
        match state {
            State::Match => { i -= 1; j -= 1; },
            State::Insertion => { j -= 1; },
            State::Deletion => { i -= 1; },
        }
        state = next;
    }

    reversed.reverse();
    Ok((score, reversed))
}

// Recomputes the traceback pointers for the tile containing cell `(i, j)` with `i, j > 0`.
fn compute_tile<F: Fn(usize, usize) -> i64>(
    checkpoints: &Checkpoints, i: usize, j: usize, rows: usize, cols: usize,
    substitution: &F, penalties: Penalties
) -> Tile {
    let r0 = ((i - 1) / checkpoints.block_rows) * checkpoints.block_rows;
    let c0 = ((j - 1) / checkpoints.block_cols) * checkpoints.block_cols;
    let r1 = (r0 + checkpoints.block_rows).min(rows);
    let c1 = (c0 + checkpoints.block_cols).min(cols);
    let width = c1 - c0;

    let top = &checkpoints.row(r0)[c0..=c1];
    let left = &checkpoints.col(c0)[r0..=r1];
    let mut traces = vec![0u8; (r1 - r0) * width];
    let mut prev: Vec<Cell> = top.to_vec();
    let mut curr: Vec<Cell> = Vec::with_capacity(width + 1);
    for row in r0 + 1..=r1 {
        curr.clear();
        curr.push(left[row - r0]);
        for col in c0 + 1..=c1 {
            let x = col - c0;
            let (cell, trace) = fill_cell(&prev[x - 1], &curr[x - 1], &prev[x], substitution(row - 1, col - 1), penalties);
            curr.push(cell);
            traces[(row - r0 - 1) * width + (x - 1)] = trace;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    Tile { r0, c0, width, traces }
}

//-----------------------------------------------------------------------------
