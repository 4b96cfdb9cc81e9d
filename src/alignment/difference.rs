//! Explicit base-level description of an alignment.

use crate::cigar::{Cigar, Op};
use crate::utils;

use std::str;

//-----------------------------------------------------------------------------

/// An operation in a difference string describing an alignment between a query sequence and a target sequence.
///
/// This implementation supports the following operations:
///
/// * `=`: A match given as the matching sequence.
/// * `:`: A match given as the match length.
/// * `*`: A mismatch given as the target base and the query base.
/// * `+`: An insertion given as the inserted sequence.
/// * `-`: A deletion given as the deleted sequence.
///
/// The operations do not store target bases, as the query sequence can be reconstructed without that information.
/// Writing a difference string requires the target sequence, which is usually obtained from the graph path.
/// Parsing is based on bytes rather than characters to avoid unnecessary UTF-8 validation.
///
/// # Examples
///
/// ```
/// use gengraph::Difference;
///
/// let with_gaps = b":48-CAT:44+GATTACA:51";
/// let ops = Difference::parse(with_gaps);
/// assert!(ops.is_ok());
/// let ops = ops.unwrap();
/// assert_eq!(ops.len(), 5);
/// assert_eq!(ops[0], Difference::Match(48));
/// assert_eq!(ops[1], Difference::Deletion(3));
/// assert_eq!(ops[2], Difference::Match(44));
/// assert_eq!(ops[3], Difference::Insertion(b"GATTACA".to_vec()));
/// assert_eq!(ops[4], Difference::Match(51));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Difference {
    /// A match of the given length.
    Match(usize),
    /// Mismatch represented as the query base.
    Mismatch(u8),
    /// Insertion to the reference represented as the inserted sequence.
    Insertion(Vec<u8>),
    /// Deletion from the reference represented as deletion length.
    Deletion(usize),
}

impl Difference {
    const OPS: &'static [u8] = b"=:*+-";

    fn matching_sequence(value: &[u8]) -> Option<Self> {
        Some(Self::Match(value.len()))
    }

    fn match_length(value: &[u8]) -> Option<Self> {
        let len = str::from_utf8(value).ok()?;
        let len = len.parse::<usize>().ok()?;
        Some(Self::Match(len))
    }

    fn mismatch(value: &[u8]) -> Option<Self> {
        if value.len() != 2 {
            return None;
        }
        Some(Self::Mismatch(value[1].to_ascii_uppercase()))
    }

    fn insertion(value: &[u8]) -> Option<Self> {
        Some(Self::Insertion(value.to_ascii_uppercase()))
    }

    fn deletion(value: &[u8]) -> Option<Self> {
        Some(Self::Deletion(value.len()))
    }

    /// Parses a difference string and returns it as a vector of operations.
    ///
    /// Returns an error if the difference string is invalid.
    pub fn parse(difference_string: &[u8]) -> Result<Vec<Self>, String> {
        let mut result: Vec<Self> = Vec::new();
        if difference_string.is_empty() {
            return Ok(result);
        }
        if !Self::OPS.contains(&difference_string[0]) {
            return Err(format!("Invalid difference string operation: {}", difference_string[0] as char));
        }

        let mut start = 0;
        while start < difference_string.len() {
            let mut end = start + 1;
            while end < difference_string.len() && !Self::OPS.contains(&difference_string[end]) {
                end += 1;
            }
            let value = &difference_string[start + 1..end];
            let op = match difference_string[start] {
                b'=' => Self::matching_sequence(value),
                b':' => Self::match_length(value),
                b'*' => Self::mismatch(value),
                b'+' => Self::insertion(value),
                b'-' => Self::deletion(value),
                _ => return Err(format!("Invalid difference string operation: {}", difference_string[start] as char)),
            }.ok_or_else(|| format!("Invalid difference string field: {}", String::from_utf8_lossy(&difference_string[start..end])))?;
            result.push(op);
            start = end;
        }

        Ok(result)
    }

    /// Parses a difference string and returns it as a normalized vector of operations.
    ///
    /// The operations are merged and empty operations are removed.
    /// Returns an error if the difference string is invalid.
    pub fn parse_normalized(difference_string: &[u8]) -> Result<Vec<Self>, String> {
        let ops = Self::parse(difference_string)?;
        Ok(Self::normalize(ops))
    }

    /// Builds explicit operations from a coarse alignment.
    ///
    /// Match runs in the CIGAR are split into matches and mismatches by comparing the query and target bases.
    /// Returns an error if the CIGAR does not cover the sequences exactly.
    pub fn from_alignment(query: &[u8], target: &[u8], cigar: &Cigar) -> Result<Vec<Self>, String> {
        if cigar.query_len() != query.len() || cigar.target_len() != target.len() {
            return Err(format!(
                "CIGAR {} covers {} query and {} target bases, expected {} and {}",
                cigar, cigar.query_len(), cigar.target_len(), query.len(), target.len()
            ));
        }

        let mut result: Vec<Self> = Vec::new();
        let (mut query_offset, mut target_offset) = (0, 0);
        for run in cigar.runs() {
            match run.op {
                Op::Match => {
                    let mut matches = 0;
                    for i in 0..run.len {
                        let (q, t) = (query[query_offset + i], target[target_offset + i]);
                        if q.eq_ignore_ascii_case(&t) {
                            matches += 1;
                        } else {
                            if matches > 0 {
                                result.push(Self::Match(matches));
                                matches = 0;
                            }
                            result.push(Self::Mismatch(q.to_ascii_uppercase()));
                        }
                    }
                    if matches > 0 {
                        result.push(Self::Match(matches));
                    }
                },
                Op::Insertion => {
                    result.push(Self::Insertion(query[query_offset..query_offset + run.len].to_ascii_uppercase()));
                },
                Op::Deletion => {
                    result.push(Self::Deletion(run.len));
                },
            }
            if run.op.consumes_query() {
                query_offset += run.len;
            }
            if run.op.consumes_target() {
                target_offset += run.len;
            }
        }

        Ok(Self::normalize(result))
    }

    /// Converts the operations back to a coarse CIGAR.
    ///
    /// Matches and mismatches both become match runs.
    pub fn to_cigar(ops: &[Self]) -> Cigar {
        let mut result = Cigar::new();
        for op in ops.iter() {
            match op {
                Self::Match(len) => result.push(*len, Op::Match),
                Self::Mismatch(_) => result.push(1, Op::Match),
                Self::Insertion(seq) => result.push(seq.len(), Op::Insertion),
                Self::Deletion(len) => result.push(*len, Op::Deletion),
            }
        }
        result
    }

    /// Calculates various statistics from a sequence of operations.
    ///
    /// The return value is (query length, target length, matches, edits).
    pub fn stats(difference_string: &[Self]) -> (usize, usize, usize, usize) {
        let mut query_len = 0;
        let mut target_len = 0;
        let mut matches = 0;
        let mut edits = 0;
        for diff in difference_string.iter() {
            match diff {
                Self::Match(len) => {
                    query_len += len;
                    target_len += len;
                    matches += len;
                },
                Self::Mismatch(_) => {
                    query_len += 1;
                    target_len += 1;
                    edits += 1;
                }
                Self::Insertion(seq) => {
                    query_len += seq.len();
                    edits += seq.len();
                }
                Self::Deletion(len) => {
                    target_len += len;
                    edits += len;
                },
            }
        }
        (query_len, target_len, matches, edits)
    }

    /// Returns the length of the operation.
    pub fn len(&self) -> usize {
        match self {
            Self::Match(len) => *len,
            Self::Mismatch(_) => 1,
            Self::Insertion(seq) => seq.len(),
            Self::Deletion(len) => *len,
        }
    }

    /// Returns `true` if the operation is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the length of the operation in the target sequence.
    pub fn target_len(&self) -> usize {
        match self {
            Self::Match(len) => *len,
            Self::Mismatch(_) => 1,
            Self::Insertion(_) => 0,
            Self::Deletion(len) => *len,
        }
    }

    /// Returns the length of the operation in the query sequence.
    pub fn query_len(&self) -> usize {
        match self {
            Self::Match(len) => *len,
            Self::Mismatch(_) => 1,
            Self::Insertion(seq) => seq.len(),
            Self::Deletion(_) => 0,
        }
    }

    /// Merges the given operation into this operation if they can be merged.
    ///
    /// Returns `true` if the operations were merged.
    pub fn try_merge(&mut self, op: &Self) -> bool {
        match (self, op) {
            (Self::Match(len1), Self::Match(len2)) => {
                *len1 += len2;
                true
            },
            (Self::Insertion(seq1), Self::Insertion(seq2)) => {
                seq1.extend_from_slice(seq2);
                true
            },
            (Self::Deletion(len1), Self::Deletion(len2)) => {
                *len1 += len2;
                true
            },
            _ => false,
        }
    }

    /// Normalizes the sequence of operations.
    ///
    /// This merges adjacent matches and insertions and removes empty operations.
    pub fn normalize(ops: Vec<Self>) -> Vec<Self> {
        let mut result = ops;
        let mut tail = 0;
        for i in 0..result.len() {
            if result[i].is_empty() {
                continue;
            }
            if tail > 0 {
                let (left, right) = result.split_at_mut(i);
                if left[tail - 1].try_merge(&right[0]) {
                    continue;
                }
            }
            result.swap(tail, i);
            tail += 1;
        }

        result.truncate(tail);
        result
    }

    /// Writes a difference string as a `Vec<u8>` string.
    ///
    /// Returns an error if the operations do not cover the target sequence exactly.
    pub fn to_bytes(ops: &[Self], target_sequence: &[u8]) -> Result<Vec<u8>, String> {
        let (_, target_len, _, _) = Self::stats(ops);
        if target_len != target_sequence.len() {
            return Err(format!("Difference string covers {} target bases, expected {}", target_len, target_sequence.len()));
        }

        let mut result = Vec::new();
        let mut target_offset = 0;
        for op in ops.iter() {
            match op {
                Self::Match(len) => {
                    result.push(b':');
                    utils::append_usize(&mut result, *len);
                    target_offset += *len;
                },
                Self::Mismatch(base) => {
                    result.push(b'*');
                    result.push(target_sequence[target_offset]);
                    result.push(*base);
                    target_offset += 1;
                },
                Self::Insertion(seq) => {
                    result.push(b'+');
                    result.extend_from_slice(seq);
                },
                Self::Deletion(len) => {
                    result.push(b'-');
                    result.extend_from_slice(&target_sequence[target_offset..target_offset + *len]);
                    target_offset += *len;
                },
            }
        }
        Ok(result)
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
