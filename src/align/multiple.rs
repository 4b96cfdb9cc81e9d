//! Profile alignment of two alignment blocks.
//!
//! A block is a set of equal-length gapped rows.
//! Two columns are scored as the integer mean of the substitution scores over all pairs of rows where neither base is a gap.
//! The blocks are aligned column by column with the usual affine gap penalties, and the resulting CIGAR is used to merge them into a single block.

use super::{gotoh, Penalties};

use crate::cigar::{Cigar, Op};
use crate::dna::GAP;
use crate::scoring::Scoring;
use crate::{Error, Result};

//-----------------------------------------------------------------------------

// Returns the number of columns in the block.
fn block_width(block: &[Vec<u8>], name: &str) -> Result<usize> {
    let width = block.first().map(|row| row.len()).ok_or_else(|| Error::Config(format!("Alignment block {} is empty", name)))?;
    if let Some(row) = block.iter().position(|row| row.len() != width) {
        return Err(Error::Config(format!(
            "Row {} of alignment block {} has length {}, expected {}", row, name, block[row].len(), width
        )));
    }
    Ok(width)
}

// Scores column `i` of `alpha` against column `j` of `beta`.
fn column_score(alpha: &[Vec<u8>], beta: &[Vec<u8>], i: usize, j: usize, scoring: &Scoring) -> i64 {
    let mut total = 0;
    let mut pairs = 0;
    for x in alpha.iter().map(|row| row[i]).filter(|&base| base != GAP) {
        for y in beta.iter().map(|row| row[j]).filter(|&base| base != GAP) {
            total += scoring.score(x, y);
            pairs += 1;
        }
    }
    if pairs == 0 { 0 } else { total / pairs }
}

/// Aligns two alignment blocks.
///
/// Insertions consume columns of `beta` and deletions consume columns of `alpha`.
/// Returns an error if a block is empty or its rows have different lengths.
pub fn multiple_affine_gap(alpha: &[Vec<u8>], beta: &[Vec<u8>], scoring: &Scoring) -> Result<(i64, Cigar)> {
    let rows = block_width(alpha, "alpha")?;
    let cols = block_width(beta, "beta")?;
    let substitution = |i: usize, j: usize| column_score(alpha, beta, i, j, scoring);
    Ok(gotoh(rows, cols, substitution, Penalties::from(scoring)))
}

/// Merges two alignment blocks according to a CIGAR from [`multiple_affine_gap`].
///
/// The result contains the rows of `alpha` followed by the rows of `beta`.
/// Existing gap columns are preserved, and a gap column is added to the block that does not consume a column at each insertion or deletion.
/// Returns an error if the CIGAR does not consume exactly the columns of both blocks.
pub fn merge_multiple_alignments(alpha: &[Vec<u8>], beta: &[Vec<u8>], cigar: &Cigar) -> Result<Vec<Vec<u8>>> {
    let alpha_width = block_width(alpha, "alpha")?;
    let beta_width = block_width(beta, "beta")?;
    if cigar.target_len() != alpha_width || cigar.query_len() != beta_width {
        return Err(Error::Config(format!(
            "CIGAR {} does not match blocks of widths {} and {}", cigar, alpha_width, beta_width
        )));
    }

    let columns = cigar.columns();
    let mut result: Vec<Vec<u8>> = vec![Vec::with_capacity(columns); alpha.len() + beta.len()];
    let (top, bottom) = result.split_at_mut(alpha.len());
    let (mut i, mut j) = (0, 0);
    for run in cigar.runs() {
        for _ in 0..run.len {
            let (from_alpha, from_beta) = match run.op {
                Op::Match => (true, true),
                Op::Insertion => (false, true),
                Op::Deletion => (true, false),
            };
            for (out, row) in top.iter_mut().zip(alpha.iter()) {
                out.push(if from_alpha { row[i] } else { GAP });
            }
            for (out, row) in bottom.iter_mut().zip(beta.iter()) {
                out.push(if from_beta { row[j] } else { GAP });
            }
            i += from_alpha as usize;
            j += from_beta as usize;
        }
    }

    Ok(result)
}

//-----------------------------------------------------------------------------
