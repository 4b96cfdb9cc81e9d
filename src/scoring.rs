//! Substitution scores and affine gap penalties.
//!
//! A gap of length `L` costs `gap_open + (L - 1) * gap_extend`.
//! Both penalties are non-positive, and the extension penalty must be negative.

use crate::dna::{self, ALPHABET_SIZE};
use crate::{Error, Result};

use std::fmt;

//-----------------------------------------------------------------------------

/// A dense substitution matrix over `A, C, G, T, N`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreMatrix {
    values: [[i64; ALPHABET_SIZE]; ALPHABET_SIZE],
}

impl ScoreMatrix {
    /// Creates a matrix from rows.
    ///
    /// Returns an error if the matrix is not `5x5`.
    pub fn new(rows: &[Vec<i64>]) -> Result<Self> {
        if rows.len() != ALPHABET_SIZE {
            return Err(Error::ScoreMatrix(format!("Expected {} rows, got {}", ALPHABET_SIZE, rows.len())));
        }
        let mut values = [[0; ALPHABET_SIZE]; ALPHABET_SIZE];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ALPHABET_SIZE {
                return Err(Error::ScoreMatrix(format!("Row {} has {} columns, expected {}", i, row.len(), ALPHABET_SIZE)));
            }
            values[i].copy_from_slice(row);
        }
        Ok(ScoreMatrix { values })
    }

    /// Creates a matrix from a fixed-size array.
    pub const fn from_array(values: [[i64; ALPHABET_SIZE]; ALPHABET_SIZE]) -> Self {
        ScoreMatrix { values }
    }

    /// Returns the score for aligning the two bases.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i64 {
        self.values[dna::base_index(a)][dna::base_index(b)]
    }

    /// Returns the score for the given scoring indices.
    #[inline]
    pub fn score_index(&self, a: usize, b: usize) -> i64 {
        self.values[a][b]
    }

    /// Returns `true` if the matrix is symmetric.
    pub fn is_symmetric(&self) -> bool {
        (0..ALPHABET_SIZE).all(|i| (0..ALPHABET_SIZE).all(|j| self.values[i][j] == self.values[j][i]))
    }

    /// Returns the largest score in the matrix.
    pub fn max_score(&self) -> i64 {
        self.values.iter().flat_map(|row| row.iter()).copied().max().unwrap_or(0)
    }
}

//-----------------------------------------------------------------------------

const DEFAULT_MATRIX: [[i64; 5]; 5] = [
    [91, -114, -31, -123, -44],
    [-114, 100, -125, -31, -43],
    [-31, -125, 100, -114, -43],
    [-123, -31, -114, 91, -44],
    [-44, -43, -43, -44, -43],
];

const HOXD55_MATRIX: [[i64; 5]; 5] = [
    [91, -114, -31, -123, 0],
    [-114, 100, -125, -31, 0],
    [-31, -125, 100, -114, 0],
    [-123, -31, -114, 91, 0],
    [0, 0, 0, 0, 0],
];

const HUMAN_CHIMP_TWO_MATRIX: [[i64; 5]; 5] = [
    [90, -330, -236, -356, -208],
    [-330, 100, -318, -236, -196],
    [-236, -318, 100, -330, -196],
    [-356, -236, -330, 90, -208],
    [-208, -196, -196, -208, -202],
];

/// Scoring model: a substitution matrix with affine gap penalties.
///
/// The model also answers the perfect-score questions used for pruning:
/// the best possible score of a query base is `max(0, max_c S[q][c])`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scoring {
    matrix: ScoreMatrix,
    gap_open: i64,
    gap_extend: i64,
    best: [i64; ALPHABET_SIZE],
}

impl Scoring {
    /// Creates a new scoring model.
    ///
    /// Returns an error if a penalty is positive or if the extension penalty is zero.
    pub fn new(matrix: ScoreMatrix, gap_open: i64, gap_extend: i64) -> Result<Self> {
        if gap_open > 0 || gap_extend >= 0 {
            return Err(Error::ScoreMatrix(format!(
                "Gap penalties must be non-positive with a negative extension penalty (open {}, extend {})",
                gap_open, gap_extend
            )));
        }
        let mut best = [0; ALPHABET_SIZE];
        for (i, value) in best.iter_mut().enumerate() {
            *value = (0..ALPHABET_SIZE).map(|j| matrix.score_index(i, j)).max().unwrap_or(0).max(0);
        }
        Ok(Scoring { matrix, gap_open, gap_extend, best })
    }

    /// Creates a scoring model from a named preset.
    ///
    /// Supported names are `default`, `hoxd55`, `mouse-rat`, and `human-chimp-two`.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "default" => Ok(Self::default()),
            "hoxd55" => Ok(Self::hoxd55()),
            "mouse-rat" => Ok(Self::mouse_rat()),
            "human-chimp-two" => Ok(Self::human_chimp_two()),
            _ => Err(Error::ScoreMatrix(format!("Unknown scoring preset: {}", name))),
        }
    }

    fn from_constants(values: [[i64; 5]; 5], gap_open: i64, gap_extend: i64) -> Self {
        let mut best = [0; ALPHABET_SIZE];
        for (i, value) in best.iter_mut().enumerate() {
            *value = values[i].iter().copied().max().unwrap_or(0).max(0);
        }
        Scoring { matrix: ScoreMatrix::from_array(values), gap_open, gap_extend, best }
    }

    /// HOXD55 substitution scores with a neutral `N` and gap penalties -400 / -30.
    pub fn hoxd55() -> Self {
        Self::from_constants(HOXD55_MATRIX, -400, -30)
    }

    /// HOXD55 scores with the mouse-rat gap penalties -600 / -55.
    pub fn mouse_rat() -> Self {
        Self::from_constants(HOXD55_MATRIX, -600, -55)
    }

    /// Human-chimp scores with gap penalties -600 / -150.
    pub fn human_chimp_two() -> Self {
        Self::from_constants(HUMAN_CHIMP_TWO_MATRIX, -600, -150)
    }

    /// Returns the substitution matrix.
    #[inline]
    pub fn matrix(&self) -> &ScoreMatrix {
        &self.matrix
    }

    /// Returns the gap open penalty.
    #[inline]
    pub fn gap_open(&self) -> i64 {
        self.gap_open
    }

    /// Returns the gap extension penalty.
    #[inline]
    pub fn gap_extend(&self) -> i64 {
        self.gap_extend
    }

    /// Returns the score for aligning the two bases.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i64 {
        self.matrix.score(a, b)
    }

    /// Returns the cost of a gap of the given length.
    #[inline]
    pub fn gap_cost(&self, len: usize) -> i64 {
        if len == 0 {
            0
        } else {
            self.gap_open + (len as i64 - 1) * self.gap_extend
        }
    }

    /// Returns the best possible score for the query base.
    #[inline]
    pub fn best_score(&self, base: u8) -> i64 {
        self.best[dna::base_index(base)]
    }

    /// Returns the largest score in the matrix.
    pub fn max_match(&self) -> i64 {
        self.matrix.max_score()
    }

    /// Returns an upper bound for the score of any alignment of the query.
    pub fn perfect_score(&self, query: &[u8]) -> i64 {
        query.iter().map(|&base| self.best_score(base)).sum()
    }

    /// Returns the score of aligning the sequence to itself without gaps.
    pub fn self_score(&self, sequence: &[u8]) -> i64 {
        sequence.iter().map(|&base| self.score(base, base)).sum()
    }

    /// Returns the maximum number of target bases worth exploring beyond the query length.
    ///
    /// An alignment that deletes more bases than this cannot have a positive score.
    pub fn max_deletion(&self, perfect: i64) -> usize {
        if perfect + self.gap_open <= 0 {
            return 0;
        }
        ((perfect + self.gap_open - 1) / -self.gap_extend) as usize + 1
    }
}

impl Default for Scoring {
    /// The default DNA matrix with gap penalties -400 / -30.
    fn default() -> Self {
        Self::from_constants(DEFAULT_MATRIX, -400, -30)
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.matrix.values.iter() {
            let row: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            writeln!(f, "{}", row.join("\t"))?;
        }
        write!(f, "gap open {}, gap extend {}", self.gap_open, self.gap_extend)
    }
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_dimensions() {
        let rows = vec![vec![1, -1, -1, -1, 0]; 4];
        assert!(ScoreMatrix::new(&rows).is_err(), "Accepted a matrix with 4 rows");
        let mut rows = vec![vec![1, -1, -1, -1, 0]; 5];
        rows[2].pop();
        assert!(ScoreMatrix::new(&rows).is_err(), "Accepted a row with 4 columns");
        let rows: Vec<Vec<i64>> = DEFAULT_MATRIX.iter().map(|row| row.to_vec()).collect();
        let matrix = ScoreMatrix::new(&rows);
        assert!(matrix.is_ok(), "Failed to create a matrix: {}", matrix.unwrap_err());
        assert_eq!(matrix.unwrap(), ScoreMatrix::from_array(DEFAULT_MATRIX), "Wrong matrix");
    }

    #[test]
    fn gap_penalties() {
        let matrix = ScoreMatrix::from_array(DEFAULT_MATRIX);
        assert!(Scoring::new(matrix.clone(), 10, -30).is_err(), "Accepted a positive gap open penalty");
        assert!(Scoring::new(matrix.clone(), -400, 0).is_err(), "Accepted a zero gap extension penalty");
        let scoring = Scoring::new(matrix, -400, -30).unwrap();
        assert_eq!(scoring, Scoring::default(), "Explicit default scoring differs from the default");
        assert_eq!(scoring.gap_cost(0), 0, "Wrong cost for an empty gap");
        assert_eq!(scoring.gap_cost(1), -400, "Wrong cost for a single-base gap");
        assert_eq!(scoring.gap_cost(4), -490, "Wrong cost for a 4-base gap");
    }

    #[test]
    fn presets() {
        for name in ["default", "hoxd55", "mouse-rat", "human-chimp-two"] {
            let scoring = Scoring::preset(name);
            assert!(scoring.is_ok(), "Failed to get preset {}: {}", name, scoring.unwrap_err());
            assert!(scoring.unwrap().matrix().is_symmetric(), "Preset {} is not symmetric", name);
        }
        assert!(Scoring::preset("blosum62").is_err(), "Got a nonexistent preset");
        let scoring = Scoring::mouse_rat();
        assert_eq!((scoring.gap_open(), scoring.gap_extend()), (-600, -55), "Wrong mouse-rat penalties");
    }

    #[test]
    fn perfect_scores() {
        let scoring = Scoring::default();
        assert_eq!(scoring.max_match(), 100, "Wrong maximum match score");
        assert_eq!(scoring.best_score(b'A'), 91, "Wrong best score for A");
        assert_eq!(scoring.best_score(b'N'), 0, "N should not contribute to the perfect score");
        assert_eq!(scoring.perfect_score(b"ACGT"), 382, "Wrong perfect score");
        assert_eq!(scoring.self_score(b"ACGT"), 382, "Wrong self score");
        assert_eq!(scoring.self_score(b"ACGN"), 248, "Wrong self score with N");
        assert_eq!(scoring.perfect_score(b"ACGN"), 291, "Wrong perfect score with N");
    }

    #[test]
    fn deletion_budget() {
        let scoring = Scoring::default();
        assert_eq!(scoring.max_deletion(400), 0, "Deletions cannot pay off without a positive score");
        // 430 - 400 = 30 > 0 allows one deleted base, 30 - 30 = 0 does not allow a second.
        assert_eq!(scoring.max_deletion(430), 1, "Wrong deletion budget");
        assert_eq!(scoring.max_deletion(431), 2, "Wrong deletion budget");
        for perfect in [401, 500, 1000, 4567] {
            let max = scoring.max_deletion(perfect);
            assert!(perfect + scoring.gap_cost(max) > 0, "Budget {} too small for {}", max, perfect);
            assert!(perfect + scoring.gap_cost(max + 1) <= 0, "Budget {} too large for {}", max, perfect);
        }
    }
}

//-----------------------------------------------------------------------------
