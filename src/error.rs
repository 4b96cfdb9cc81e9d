//! Error type shared by the library.
//!
//! Configuration errors and structural invariant violations are fatal: they are returned before any alignment work starts.
//! Per-read conditions (too short to seed, no seeds, zero score) are never errors; they become unmapped records.

use std::io;

use thiserror::Error;

/// Errors reported by graph construction, graph I/O, and the aligners.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid scoring matrix or gap penalties.
    #[error("Invalid scoring model: {0}")]
    ScoreMatrix(String),

    /// Malformed graph file.
    #[error("Invalid graph file at line {line}: {message}")]
    GraphFormat {
        /// Line number (1-based).
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A graph invariant does not hold.
    #[error("Graph invariant violated: {0}")]
    Invariant(String),

    /// Inconsistent inputs or parameters.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A malformed input record.
    #[error("Invalid {format} record at line {line}: {message}")]
    Parse {
        /// Name of the input format.
        format: &'static str,
        /// Line number (1-based).
        line: usize,
        /// What went wrong.
        message: String,
    },
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn parse(format: &'static str, line: usize, message: impl Into<String>) -> Self {
        Error::Parse { format, line, message: message.into() }
    }

    pub(crate) fn graph_format(line: usize, message: impl Into<String>) -> Self {
        Error::GraphFormat { line, message: message.into() }
    }
}
