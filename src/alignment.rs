//! Structures for representing sequence to graph alignments.
//!
//! A [`GirafRecord`] represents the alignment of a query sequence to a [`GraphPath`] in a [`Graph`].
//! It corresponds to a single line in a GIRAF file.
//!
//! ### GIRAF lines
//!
//! A GIRAF line has 11 mandatory tab-separated fields followed by optional typed fields (notes):
//!
//! 1. Query name.
//! 2. Start of the aligned query interval (0-based).
//! 3. End of the aligned query interval (past-the-end).
//! 4. Flag; see the `FLAG_` constants.
//! 5. Strand: `+` or `-`.
//! 6. Graph path `tstart:n1>n2>...:tend`, or `*` for unmapped reads.
//! 7. Difference string of the aligned interval, or `*` for unmapped reads.
//! 8. Alignment score.
//! 9. Mapping quality.
//! 10. Query sequence in the orientation of the alignment.
//! 11. Base qualities in the orientation of the alignment, or `*`.
//!
//! Unmapped reads have mapping quality 0 and note `XO:Z:~`.

use crate::formats::TypedField;
use crate::graph::{Graph, NodeId};
use crate::{utils, Error, Result};

use std::fmt;
use std::ops::Range;
use std::str;

use gbwt::Orientation;

pub mod difference;

pub use difference::Difference;


//-----------------------------------------------------------------------------

/// Flag: the read is part of a proper pair.
pub const FLAG_PROPER_PAIR: u16 = 0x1;

/// Flag: the read is unmapped or the score is too low.
pub const FLAG_UNMAPPED: u16 = 0x2;

/// Flag: the read aligns to the forward strand.
pub const FLAG_FORWARD: u16 = 0x4;

/// Flag: the read is the first mate of a pair.
pub const FLAG_FIRST_IN_PAIR: u16 = 0x8;

/// Flag: the read is paired.
pub const FLAG_PAIRED: u16 = 0x10;

//-----------------------------------------------------------------------------

/// A walk through the graph with offsets into the first and the last node.
///
/// The walk covers `nodes[0][start..]`, every intermediate node in full, and `nodes[last][..end]`.
/// If there is only one node, the walk covers `nodes[0][start..end]`.
/// A path without nodes is used for unmapped reads.
///
/// # Examples
///
/// ```
/// use gengraph::GraphPath;
///
/// let path = GraphPath::parse(b"2:0>2>3:4").unwrap();
/// assert_eq!(path, GraphPath::new(2, vec![0, 2, 3], 4));
/// assert_eq!(path.to_string(), "2:0>2>3:4");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphPath {
    /// Offset of the first aligned base in the first node.
    pub start: usize,
    /// Visited nodes in order.
    pub nodes: Vec<NodeId>,
    /// Past-the-end offset in the last node.
    pub end: usize,
}

impl GraphPath {
    pub fn new(start: usize, nodes: Vec<NodeId>, end: usize) -> Self {
        GraphPath { start, nodes, end }
    }

    /// Returns `true` if the path has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the first node of the path.
    #[inline]
    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Parses a path from a GIRAF field.
    ///
    /// Returns an empty path for the missing value `*`.
    pub fn parse(field: &[u8]) -> std::result::Result<Self, String> {
        if field == b"*" {
            return Ok(Self::default());
        }
        let parts: Vec<&[u8]> = field.split(|&c| c == b':').collect();
        if parts.len() != 3 {
            return Err(format!("Invalid graph path: {}", String::from_utf8_lossy(field)));
        }
        let start = parse_number(parts[0], "path start")?;
        let end = parse_number(parts[2], "path end")?;
        let mut nodes = Vec::new();
        for node in parts[1].split(|&c| c == b'>') {
            nodes.push(parse_number(node, "path node")?);
        }
        Ok(GraphPath { start, nodes, end })
    }
}

impl fmt::Display for GraphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return write!(f, "*");
        }
        write!(f, "{}:", self.start)?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ">")?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, ":{}", self.end)
    }
}

// Parses an unsigned integer from a field.
fn parse_number<T: str::FromStr>(field: &[u8], field_name: &str) -> std::result::Result<T, String> {
    let value = str::from_utf8(field).map_err(|err| format!("Invalid {}: {}", field_name, err))?;
    value.parse().map_err(|_| format!("Invalid {}: {}", field_name, value))
}

//-----------------------------------------------------------------------------

/// An alignment between a query sequence and a path in a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GirafRecord {
    /// Name of the query sequence.
    pub name: String,
    /// Aligned interval of the query sequence in the orientation of the alignment.
    pub query_interval: Range<usize>,
    /// Flag bits.
    pub flag: u16,
    /// Strand of the alignment.
    pub orientation: Orientation,
    /// Target path.
    pub path: GraphPath,
    /// Differences between the aligned query interval and the path sequence, or `None` for unmapped reads.
    pub difference: Option<Vec<Difference>>,
    /// Alignment score.
    pub score: i64,
    /// Mapping quality.
    pub mapq: u8,
    /// Query sequence in the orientation of the alignment.
    pub seq: Vec<u8>,
    /// Base qualities in the orientation of the alignment.
    pub qual: Option<Vec<u8>>,
    /// Notes as typed fields.
    pub notes: Vec<TypedField>,
}

impl GirafRecord {
    // Number of mandatory fields in a GIRAF line.
    const MANDATORY_FIELDS: usize = 11;

    // The field is empty and the value is missing.
    const MISSING_VALUE: [u8; 1] = [b'*'];

    /// Tag for the note with the starting position of the alignment.
    pub const ORIGIN_TAG: [u8; 2] = [b'X', b'O'];

    /// Tag for the note listing the traversed alternate alleles.
    pub const VARIANT_TAG: [u8; 2] = [b'X', b'V'];

    /// Value of the origin note for unmapped reads.
    pub const UNMAPPED_ORIGIN: &'static [u8] = b"~";

    /// Creates a record for an unmapped read.
    pub fn unmapped(name: &str, seq: &[u8], qual: Option<&[u8]>) -> Self {
        GirafRecord {
            name: name.to_string(),
            query_interval: 0..0,
            flag: FLAG_UNMAPPED | FLAG_FORWARD,
            orientation: Orientation::Forward,
            path: GraphPath::default(),
            difference: None,
            score: 0,
            mapq: 0,
            seq: seq.to_vec(),
            qual: qual.map(|x| x.to_vec()),
            notes: vec![TypedField::String(Self::ORIGIN_TAG, Self::UNMAPPED_ORIGIN.to_vec())],
        }
    }

    /// Returns `true` if the read is unmapped.
    pub fn is_unmapped(&self) -> bool {
        self.flag & FLAG_UNMAPPED != 0 || self.path.is_empty()
    }

    /// Returns `true` if the given flag bits are set.
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flag & flag == flag
    }

    /// Returns the first note with the given tag.
    pub fn note(&self, tag: [u8; 2]) -> Option<&TypedField> {
        self.notes.iter().find(|field| field.tag() == tag)
    }

    /// Returns the value of the first string note with the given tag.
    pub fn string_note(&self, tag: [u8; 2]) -> Option<&[u8]> {
        match self.note(tag) {
            Some(TypedField::String(_, value)) => Some(value),
            _ => None,
        }
    }

    /// Replaces the first note with the same tag or appends the note.
    pub fn set_note(&mut self, field: TypedField) {
        match self.notes.iter_mut().find(|x| x.tag() == field.tag()) {
            Some(existing) => *existing = field,
            None => self.notes.push(field),
        }
    }

    /// Parses a record from a GIRAF line.
    ///
    /// Returns an error if the line cannot be parsed.
    /// The line may end with up to one endline character, which is ignored.
    pub fn from_line(line: &[u8]) -> std::result::Result<Self, String> {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let fields = line.split(|&c| c == b'\t').collect::<Vec<_>>();
        if fields.len() < Self::MANDATORY_FIELDS {
            let line = String::from_utf8_lossy(line);
            return Err(format!("GIRAF line with fewer than {} fields: {}", Self::MANDATORY_FIELDS, line));
        }

        let name = String::from_utf8(fields[0].to_vec()).map_err(|err| format!("Invalid query name: {}", err))?;
        let start: usize = parse_number(fields[1], "query start")?;
        let end: usize = parse_number(fields[2], "query end")?;
        if end < start {
            return Err(format!("Invalid query interval {}..{}", start, end));
        }
        let flag: u16 = parse_number(fields[3], "flag")?;
        let orientation = match fields[4] {
            b"+" => Orientation::Forward,
            b"-" => Orientation::Reverse,
            _ => return Err(format!("Invalid strand: {}", String::from_utf8_lossy(fields[4]))),
        };
        let path = GraphPath::parse(fields[5])?;
        let difference = if fields[6] == Self::MISSING_VALUE {
            None
        } else {
            Some(Difference::parse_normalized(fields[6])?)
        };
        if let Some(ops) = difference.as_ref() {
            let (query_len, _, _, _) = Difference::stats(ops);
            if query_len != end - start {
                return Err(format!("Difference string covers {} query bases, expected {}", query_len, end - start));
            }
        }
        let score: i64 = parse_number(fields[7], "alignment score")?;
        let mapq: u8 = parse_number(fields[8], "mapping quality")?;
        let seq = if fields[9] == Self::MISSING_VALUE { Vec::new() } else { fields[9].to_ascii_uppercase() };
        if end > seq.len() && !seq.is_empty() {
            return Err(format!("Query interval {}..{} exceeds the sequence length {}", start, end, seq.len()));
        }
        let qual = if fields[10] == Self::MISSING_VALUE { None } else { Some(fields[10].to_vec()) };

        let mut notes = Vec::new();
        for field in fields[Self::MANDATORY_FIELDS..].iter() {
            notes.push(TypedField::parse(field)?);
        }

        Ok(GirafRecord {
            name, query_interval: start..end, flag, orientation,
            path, difference, score, mapq,
            seq, qual, notes,
        })
    }

    /// Writes the record as a GIRAF line without the endline character.
    ///
    /// The graph is used for the target bases of mismatches and deletions in the difference string.
    /// Returns an error if the path is not valid in the graph or the difference string does not match it.
    pub fn to_line(&self, graph: &Graph) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(self.name.as_bytes());
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.query_interval.start);
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.query_interval.end);
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.flag as usize);
        buffer.push(b'\t');
        buffer.push(match self.orientation {
            Orientation::Forward => b'+',
            Orientation::Reverse => b'-',
        });
        buffer.push(b'\t');
        buffer.extend_from_slice(self.path.to_string().as_bytes());
        buffer.push(b'\t');
        match self.difference.as_ref() {
            Some(ops) if !self.path.is_empty() => {
                let target = graph.path_sequence(&self.path)?;
                let bytes = Difference::to_bytes(ops, &target).map_err(|err| {
                    Error::Invariant(format!("Alignment of {}: {}", self.name, err))
                })?;
                buffer.extend_from_slice(&bytes);
            },
            _ => buffer.extend_from_slice(&Self::MISSING_VALUE),
        }
        buffer.push(b'\t');
        utils::append_isize(&mut buffer, self.score as isize);
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.mapq as usize);
        buffer.push(b'\t');
        if self.seq.is_empty() {
            buffer.extend_from_slice(&Self::MISSING_VALUE);
        } else {
            buffer.extend_from_slice(&self.seq);
        }
        buffer.push(b'\t');
        match self.qual.as_ref() {
            Some(qual) if !qual.is_empty() => buffer.extend_from_slice(qual),
            _ => buffer.extend_from_slice(&Self::MISSING_VALUE),
        }
        for note in self.notes.iter() {
            note.append_to(&mut buffer, true);
        }
        Ok(buffer)
    }
}

//-----------------------------------------------------------------------------
