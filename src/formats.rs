//! Support for reading and writing various file formats.
//!
//! ### FASTA, FASTQ, and VCF (reading)
//!
//! * [`FastaReader`]: Iterates over reference contigs in a FASTA file with wrapped sequence lines.
//! * [`FastqReader`]: Iterates over reads in a FASTQ file; FASTA records are also accepted without qualities.
//! * [`VcfReader`]: Iterates over variant records in a VCF file.
//!
//! Sequences are converted to upper case.
//! Readers report malformed records as [`Error::Parse`] with the line number.
//!
//! ### GFA (writing)
//!
//! The GFA format is a text-based format for representing sequence graphs.
//! See the [GFA 1 format description](https://github.com/GFA-spec/GFA-spec/blob/master/GFA1.md) for details.
//! The following functions support line-by-line writing of GFA version 1.1:
//!
//! * [`write_gfa_header`]: Write a GFA file header.
//! * [`write_gfa_segment`]: Write a segment line for a node.
//! * [`write_gfa_link`]: Write a link line for an edge.
//! * [`write_gfa_walk`]: Write a walk line for a path.
//!
//! ### GIRAF headers
//!
//! GIRAF header lines start with `@`.
//! They can be handled with [`is_header_line`], [`read_header_lines`], and [`write_giraf_file_header`].
//! I/O for alignment lines is implemented in [`crate::GirafRecord`].

use crate::variant::Variant;
use crate::{utils, Error, Result};

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::path::Path;

use log::warn;


//-----------------------------------------------------------------------------

/// A typed optional field used in formats such as SAM, GFA, and GIRAF.
///
/// The field corresponds to a TAG:TYPE:VALUE string.
/// Supported types include A (single character), Z (string), i (integer), f (float), and b (boolean).
/// The field is stored as a tag and a value.
/// Parsing is based on bytes rather than characters to avoid unnecessary UTF-8 validation.
///
/// # Examples
///
/// ```
/// use gengraph::formats::TypedField;
///
/// let alignment_score = "AS:i:382";
/// let field = TypedField::parse(alignment_score.as_bytes());
/// assert_eq!(field, Ok(TypedField::Int([b'A', b'S'], 382)));
/// let field = field.unwrap();
/// assert_eq!(field.to_string(), alignment_score);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum TypedField {
    /// A single character.
    Char([u8; 2], u8),
    /// A string.
    String([u8; 2], Vec<u8>),
    /// An integer.
    Int([u8; 2], isize),
    /// A float.
    Float([u8; 2], f64),
    /// A boolean value.
    Bool([u8; 2], bool),
}

impl TypedField {
    /// Parses the field from a TAG:TYPE:VALUE string.
    ///
    /// Returns an error if the field cannot be parsed or the type is unsupported.
    pub fn parse(field: &[u8]) -> std::result::Result<Self, String> {
        if field.len() < 5 || field[2] != b':' || field[4] != b':' {
            return Err(format!("Invalid typed field: {}", String::from_utf8_lossy(field)));
        }
        let tag = [field[0], field[1]];
        match field[3] {
            b'A' => {
                if field.len() != 6 {
                    return Err(format!("Invalid char field {}", String::from_utf8_lossy(field)));
                }
                Ok(TypedField::Char(tag, field[5]))
            },
            b'Z' => Ok(TypedField::String(tag, field[5..].to_vec())),
            b'i' => {
                let value = String::from_utf8_lossy(&field[5..]);
                let value = value.parse::<isize>().map_err(|err| {
                    format!("Invalid int field {}: {}", value, err)
                })?;
                Ok(TypedField::Int(tag, value))
            },
            b'f' => {
                let value = String::from_utf8_lossy(&field[5..]);
                let value = value.parse::<f64>().map_err(|err| {
                    format!("Invalid float field {}: {}", value, err)
                })?;
                Ok(TypedField::Float(tag, value))
            },
            b'b' => {
                if field.len() != 6 {
                    return Err(format!("Invalid bool field {}", String::from_utf8_lossy(field)));
                }
                match field[5] {
                    b'0' => Ok(TypedField::Bool(tag, false)),
                    b'1' => Ok(TypedField::Bool(tag, true)),
                    _ => Err(format!("Invalid bool field {}", String::from_utf8_lossy(field))),
                }
            },
            _ => Err(format!("Unsupported field type: {}", field[3] as char)),
        }
    }

    /// Returns the tag of the field.
    pub fn tag(&self) -> [u8; 2] {
        match self {
            TypedField::Char(tag, _) => *tag,
            TypedField::String(tag, _) => *tag,
            TypedField::Int(tag, _) => *tag,
            TypedField::Float(tag, _) => *tag,
            TypedField::Bool(tag, _) => *tag,
        }
    }

    /// Appends the field to the given buffer.
    ///
    /// If `as_new_field` is `true`, a tab character is added before the field.
    pub fn append_to(&self, buffer: &mut Vec<u8>, as_new_field: bool) {
        if as_new_field {
            buffer.push(b'\t');
        }
        let _ = write!(buffer, "{}", self);
    }

}

impl Display for TypedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedField::Char(tag, value) => {
                write!(f, "{}{}:A:{}", tag[0] as char, tag[1] as char, *value as char)
            },
            TypedField::String(tag, value) => {
                let value = String::from_utf8_lossy(value);
                write!(f, "{}{}:Z:{}", tag[0] as char, tag[1] as char, value)
            },
            TypedField::Int(tag, value) => {
                write!(f, "{}{}:i:{}", tag[0] as char, tag[1] as char, value)
            },
            TypedField::Float(tag, value) => {
                write!(f, "{}{}:f:{}", tag[0] as char, tag[1] as char, value)
            },
            TypedField::Bool(tag, value) => {
                write!(f, "{}{}:b:{}", tag[0] as char, tag[1] as char, if *value { '1' } else { '0' })
            },
        }
    }
}

//-----------------------------------------------------------------------------

/// A reference contig.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastaRecord {
    /// The first word of the header line.
    pub name: String,
    /// Upper-case sequence.
    pub seq: Vec<u8>,
}

// Shared line reader that tracks line numbers and supports one line of lookahead.
struct LineReader<R: BufRead> {
    input: R,
    line_num: usize,
    peeked: Option<String>,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R) -> Self {
        LineReader { input, line_num: 0, peeked: None }
    }

    // Returns the next line without the line terminator.
    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        let mut line = String::new();
        let bytes = self.input.read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }
        self.line_num += 1;
        let len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(len);
        Ok(Some(line))
    }

    // Returns the next non-empty line.
    fn next_nonempty(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.next_line()? {
            if !line.is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn push_back(&mut self, line: String) {
        self.peeked = Some(line);
    }

    // Reads wrapped sequence lines until the next header line starting with `>`.
    fn read_wrapped(&mut self) -> Result<Vec<u8>> {
        let mut seq = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.starts_with('>') {
                self.push_back(line);
                break;
            }
            seq.extend(line.trim().bytes().map(|c| c.to_ascii_uppercase()));
        }
        Ok(seq)
    }
}

fn header_name(header: &str) -> String {
    header.split_whitespace().next().unwrap_or_default().to_string()
}

/// An iterator over the records in a FASTA file.
pub struct FastaReader<R: BufRead> {
    lines: LineReader<R>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(input: R) -> Self {
        FastaReader { lines: LineReader::new(input) }
    }

    fn read_record(&mut self) -> Result<Option<FastaRecord>> {
        let Some(line) = self.lines.next_nonempty()? else {
            return Ok(None);
        };
        let Some(header) = line.strip_prefix('>') else {
            return Err(Error::parse("FASTA", self.lines.line_num, "Expected a header line"));
        };
        let name = header_name(header);
        if name.is_empty() {
            return Err(Error::parse("FASTA", self.lines.line_num, "Empty sequence name"));
        }
        let seq = self.lines.read_wrapped()?;
        Ok(Some(FastaRecord { name, seq }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Reads all records from a possibly gzip-compressed FASTA file.
pub fn read_fasta_file<P: AsRef<Path>>(filename: P) -> Result<Vec<FastaRecord>> {
    let input = utils::open_file(filename)?;
    FastaReader::new(input).collect()
}

//-----------------------------------------------------------------------------

/// A sequencing read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FastqRecord {
    /// The first word of the header line.
    pub name: String,
    /// Upper-case sequence.
    pub seq: Vec<u8>,
    /// Base qualities, if present.
    pub qual: Option<Vec<u8>>,
}

/// An iterator over the reads in a FASTQ file.
///
/// Each FASTQ record must have four lines.
/// FASTA records with wrapped sequence lines are accepted as reads without qualities.
pub struct FastqReader<R: BufRead> {
    lines: LineReader<R>,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(input: R) -> Self {
        FastqReader { lines: LineReader::new(input) }
    }

    fn read_record(&mut self) -> Result<Option<FastqRecord>> {
        let Some(line) = self.lines.next_nonempty()? else {
            return Ok(None);
        };
        let header_line = self.lines.line_num;
        if let Some(header) = line.strip_prefix('>') {
            let seq = self.lines.read_wrapped()?;
            return Ok(Some(FastqRecord { name: header_name(header), seq, qual: None }));
        }
        let Some(header) = line.strip_prefix('@') else {
            return Err(Error::parse("FASTQ", header_line, "Expected a header line"));
        };
        let name = header_name(header);

        let truncated = || Error::parse("FASTQ", header_line, format!("Truncated record {}", name));
        let seq = self.lines.next_line()?.ok_or_else(truncated)?;
        let separator = self.lines.next_line()?.ok_or_else(truncated)?;
        if !separator.starts_with('+') {
            return Err(Error::parse("FASTQ", self.lines.line_num, "Expected a separator line"));
        }
        let qual = self.lines.next_line()?.ok_or_else(truncated)?;
        if qual.len() != seq.len() {
            return Err(Error::parse(
                "FASTQ", self.lines.line_num,
                format!("Read {} has {} bases but {} qualities", name, seq.len(), qual.len())
            ));
        }

        Ok(Some(FastqRecord { name, seq: seq.to_ascii_uppercase().into_bytes(), qual: Some(qual.into_bytes()) }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<FastqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

//-----------------------------------------------------------------------------

/// An iterator over the variant records in a VCF file.
///
/// Header lines are skipped.
pub struct VcfReader<R: BufRead> {
    lines: LineReader<R>,
}

impl<R: BufRead> VcfReader<R> {
    pub fn new(input: R) -> Self {
        VcfReader { lines: LineReader::new(input) }
    }

    fn read_record(&mut self) -> Result<Option<Variant>> {
        while let Some(line) = self.lines.next_line()? {
            match Variant::from_vcf_line(&line) {
                Ok(Some(variant)) => return Ok(Some(variant)),
                Ok(None) => continue,
                Err(message) => return Err(Error::parse("VCF", self.lines.line_num, message)),
            }
        }
        Ok(None)
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<Variant>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Reads all variants from a possibly gzip-compressed VCF file.
///
/// Malformed records are skipped with a warning.
pub fn read_vcf_file<P: AsRef<Path>>(filename: P) -> Result<Vec<Variant>> {
    let input = utils::open_file(filename)?;
    let mut result = Vec::new();
    for variant in VcfReader::new(input) {
        match variant {
            Ok(variant) => result.push(variant),
            Err(Error::Io(err)) => return Err(Error::Io(err)),
            Err(err) => warn!("Skipping a variant: {}", err),
        }
    }
    Ok(result)
}

//-----------------------------------------------------------------------------

/// Returns `true` if the buffer contains a GIRAF header line.
///
/// A header line starts with `@`.
pub fn is_header_line(buf: &[u8]) -> bool {
    buf.first() == Some(&b'@')
}

/// Returns all successive header lines from the reader.
///
/// The returned lines do not contain the trailing newline character.
/// The reader position is advanced past the header lines.
pub fn read_header_lines<R: BufRead>(reader: &mut R) -> io::Result<Vec<String>> {
    let mut headers: Vec<String> = Vec::new();
    while is_header_line(reader.fill_buf()?) {
        let mut line: Vec<u8> = Vec::new();
        let bytes_read = reader.read_until(b'\n', &mut line)?;
        if bytes_read == 0 {
            break;
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        headers.push(String::from_utf8_lossy(&line).to_string());
    }
    Ok(headers)
}

/// Writes a GIRAF file header.
pub fn write_giraf_file_header<T: Write>(output: &mut T) -> io::Result<()> {
    output.write_all(b"@HD\tVN:Z:1.0\n")
}

//-----------------------------------------------------------------------------

/// Writes the GFA header line.
pub fn write_gfa_header<T: Write>(output: &mut T) -> io::Result<()> {
    output.write_all(b"H\tVN:Z:1.1\n")
}

/// Writes a GFA segment line with optional tags.
pub fn write_gfa_segment<T: Write>(name: usize, sequence: &[u8], tags: &[TypedField], output: &mut T) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    buffer.extend_from_slice(b"S\t");
    utils::append_usize(&mut buffer, name);
    buffer.push(b'\t');
    if sequence.is_empty() {
        buffer.push(b'*');
    } else {
        buffer.extend_from_slice(sequence);
    }
    for tag in tags {
        tag.append_to(&mut buffer, true);
    }
    buffer.push(b'\n');

    output.write_all(&buffer)
}

/// Writes a GFA link line for an edge between the forward orientations of two segments.
pub fn write_gfa_link<T: Write>(from: usize, to: usize, tags: &[TypedField], output: &mut T) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    buffer.extend_from_slice(b"L\t");
    utils::append_usize(&mut buffer, from);
    buffer.extend_from_slice(b"\t+\t");
    utils::append_usize(&mut buffer, to);
    buffer.extend_from_slice(b"\t+\t0M");
    for tag in tags {
        tag.append_to(&mut buffer, true);
    }
    buffer.push(b'\n');

    output.write_all(&buffer)
}

/// Writes a GFA walk line for a path visiting the forward orientations of the segments.
///
/// The walk covers the interval `0..len` of haplotype 0 of the contig in the sample.
pub fn write_gfa_walk<T: Write>(sample: &str, contig: &str, len: usize, path: &[usize], output: &mut T) -> io::Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    buffer.extend_from_slice(b"W\t");
    buffer.extend_from_slice(sample.as_bytes());
    buffer.extend_from_slice(b"\t0\t");
    buffer.extend_from_slice(contig.as_bytes());
    buffer.extend_from_slice(b"\t0\t");
    utils::append_usize(&mut buffer, len);
    buffer.push(b'\t');
    for id in path {
        buffer.push(b'>');
        utils::append_usize(&mut buffer, *id);
    }
    buffer.push(b'\n');

    output.write_all(&buffer)
}

//-----------------------------------------------------------------------------
