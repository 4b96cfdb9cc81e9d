//! Run-length encoded alignment operations.
//!
//! A [`Cigar`] never contains two adjacent runs with the same operation or a run of length zero.
//! Insertions consume the second sequence (query) only and deletions consume the first sequence (target) only.

use std::fmt;
use std::str::FromStr;

//-----------------------------------------------------------------------------

/// An alignment operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Aligned bases, either matches or mismatches.
    Match,
    /// Bases present only in the query.
    Insertion,
    /// Bases present only in the target.
    Deletion,
}

impl Op {
    /// Returns the SAM symbol for the operation.
    pub fn symbol(self) -> char {
        match self {
            Op::Match => 'M',
            Op::Insertion => 'I',
            Op::Deletion => 'D',
        }
    }

    /// Returns `true` if the operation consumes query bases.
    #[inline]
    pub fn consumes_query(self) -> bool {
        self != Op::Deletion
    }

    /// Returns `true` if the operation consumes target bases.
    #[inline]
    pub fn consumes_target(self) -> bool {
        self != Op::Insertion
    }
}

/// A run of identical operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CigarRun {
    pub len: usize,
    pub op: Op,
}

impl CigarRun {
    pub fn new(len: usize, op: Op) -> Self {
        CigarRun { len, op }
    }
}

//-----------------------------------------------------------------------------

/// A normalized sequence of operation runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cigar {
    runs: Vec<CigarRun>,
}

impl Cigar {
    /// Creates an empty CIGAR.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a CIGAR with a single run.
    pub fn single(len: usize, op: Op) -> Self {
        let mut result = Self::new();
        result.push(len, op);
        result
    }

    /// Creates a CIGAR from a sequence of runs, merging runs as necessary.
    pub fn from_runs<I: IntoIterator<Item = CigarRun>>(runs: I) -> Self {
        let mut result = Self::new();
        for run in runs {
            result.push(run.len, run.op);
        }
        result
    }

    /// Appends a run, merging it with the last run if the operations match.
    ///
    /// Empty runs are ignored.
    pub fn push(&mut self, len: usize, op: Op) {
        if len == 0 {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.op == op => last.len += len,
            _ => self.runs.push(CigarRun::new(len, op)),
        }
    }

    /// Appends all runs from another CIGAR.
    pub fn append(&mut self, other: &Cigar) {
        for run in other.runs.iter() {
            self.push(run.len, run.op);
        }
    }

    /// Reverses the order of the runs.
    pub fn reverse(&mut self) {
        self.runs.reverse();
    }

    /// Returns the runs.
    #[inline]
    pub fn runs(&self) -> &[CigarRun] {
        &self.runs
    }

    /// Returns the number of runs.
    #[inline]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns `true` if there are no runs.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Returns the number of query bases consumed.
    pub fn query_len(&self) -> usize {
        self.runs.iter().filter(|run| run.op.consumes_query()).map(|run| run.len).sum()
    }

    /// Returns the number of target bases consumed.
    pub fn target_len(&self) -> usize {
        self.runs.iter().filter(|run| run.op.consumes_target()).map(|run| run.len).sum()
    }

    /// Returns the number of alignment columns.
    pub fn columns(&self) -> usize {
        self.runs.iter().map(|run| run.len).sum()
    }

    /// Returns `true` if no two adjacent runs share an operation and no run is empty.
    pub fn is_normalized(&self) -> bool {
        self.runs.iter().all(|run| run.len > 0) && self.runs.windows(2).all(|w| w[0].op != w[1].op)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.runs.is_empty() {
            return write!(f, "*");
        }
        for run in self.runs.iter() {
            write!(f, "{}{}", run.len, run.op.symbol())?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Cigar::new();
        if s == "*" {
            return Ok(result);
        }
        let mut len: Option<usize> = None;
        for c in s.chars() {
            if let Some(digit) = c.to_digit(10) {
                len = Some(len.unwrap_or(0) * 10 + digit as usize);
                continue;
            }
            let op = match c {
                'M' | '=' | 'X' => Op::Match,
                'I' => Op::Insertion,
                'D' => Op::Deletion,
                _ => return Err(format!("Unsupported CIGAR operation {} in {}", c, s)),
            };
            let run_len = len.take().ok_or(format!("Missing run length in CIGAR {}", s))?;
            result.push(run_len, op);
        }
        if len.is_some() {
            return Err(format!("CIGAR {} ends with a run length", s));
        }
        Ok(result)
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
