//! Projecting graph alignments to external records.
//!
//! A [`GraphAlignment`] is converted into a [`GirafRecord`]:
//!
//! * The read and its qualities are stored in the orientation of the alignment.
//! * Match runs in the CIGAR become explicit matches and mismatches by comparing the read with the path sequence.
//! * The starting position is resolved to reference coordinates using the annotation of the first node and stored in note `XO:Z:contig=pos`.
//! * Alternate alleles used by the path are listed in note `XV:Z:id=kind,...`.
//!
//! A GIRAF record can be further projected to a [`SamRecord`].
//! The SAM record has soft clips for the unaligned ends of the read, and it uses the standard SAM flags.
//! The graph path is stored in tag `GP:Z` and the alignment score in tag `AS:i`.

use crate::alignment::{Difference, GirafRecord, FLAG_FIRST_IN_PAIR, FLAG_FORWARD, FLAG_PAIRED, FLAG_PROPER_PAIR, FLAG_UNMAPPED};
use crate::formats::TypedField;
use crate::graph::Graph;
use crate::mapper::GraphAlignment;
use crate::{dna, utils, Error, Result};

use std::io::{self, Write};
use std::str;

use gbwt::Orientation;


//-----------------------------------------------------------------------------

/// Builds a GIRAF record for the read.
///
/// If there is no alignment, the record is unmapped.
/// Otherwise the record gets mapping quality 255, and it is flagged as unmapped if the score is below `min_score`.
/// Returns an error if the alignment is not consistent with the graph.
pub fn giraf_record(
    graph: &Graph, name: &str, seq: &[u8], qual: Option<&[u8]>,
    alignment: Option<&GraphAlignment>, min_score: i64
) -> Result<GirafRecord> {
    let alignment = match alignment {
        Some(alignment) => alignment,
        None => return Ok(GirafRecord::unmapped(name, seq, qual)),
    };

    let (seq, qual) = match alignment.orientation {
        Orientation::Forward => (seq.to_vec(), qual.map(|qual| qual.to_vec())),
        Orientation::Reverse => (
            dna::reverse_complement(seq),
            qual.map(|qual| qual.iter().rev().copied().collect()),
        ),
    };
    let interval = alignment.query_interval.clone();
    if interval.start > interval.end || interval.end > seq.len() {
        return Err(Error::Invariant(format!(
            "Query interval {}..{} is out of bounds for read {} of length {}", interval.start, interval.end, name, seq.len()
        )));
    }

    let target = graph.path_sequence(&alignment.path)?;
    let difference = Difference::from_alignment(&seq[interval.clone()], &target, &alignment.cigar).map_err(|err| {
        Error::Invariant(format!("Alignment of {}: {}", name, err))
    })?;

    let mut flag = 0;
    if alignment.orientation == Orientation::Forward {
        flag |= FLAG_FORWARD;
    }
    if alignment.score < min_score {
        flag |= FLAG_UNMAPPED;
    }

    let mut notes = Vec::new();
    if let Some(note) = origin_note(graph, alignment) {
        notes.push(note);
    }
    if let Some(note) = variant_note(graph, alignment) {
        notes.push(note);
    }

    Ok(GirafRecord {
        name: name.to_string(),
        query_interval: interval,
        flag,
        orientation: alignment.orientation,
        path: alignment.path.clone(),
        difference: Some(difference),
        score: alignment.score,
        mapq: 255,
        seq, qual, notes,
    })
}

// The origin note `contig=pos` for the first aligned base, if the first node is annotated.
// Offsets in alternate alleles are not reference offsets, so an alignment starting in one gets the anchor position.
fn origin_note(graph: &Graph, alignment: &GraphAlignment) -> Option<TypedField> {
    let first = alignment.path.first()?;
    let annotation = graph.node(first)?.annotation()?;
    let contig = graph.contig_of(first)?;
    let mut value = contig.name.as_bytes().to_vec();
    value.push(b'=');
    let pos = if annotation.is_alternate() { annotation.start } else { annotation.start + alignment.path.start };
    utils::append_usize(&mut value, pos);
    Some(TypedField::String(GirafRecord::ORIGIN_TAG, value))
}

// The variant note listing the alternate alleles used by the path.
fn variant_note(graph: &Graph, alignment: &GraphAlignment) -> Option<TypedField> {
    let mut value: Vec<u8> = Vec::new();
    for &id in alignment.path.nodes.iter() {
        let annotation = match graph.node(id).and_then(|node| node.annotation()) {
            Some(annotation) if annotation.is_alternate() => annotation,
            _ => continue,
        };
        if !value.is_empty() {
            value.push(b',');
        }
        utils::append_usize(&mut value, id as usize);
        value.push(b'=');
        value.extend_from_slice(annotation.kind.name().as_bytes());
    }
    if value.is_empty() {
        None
    } else {
        Some(TypedField::String(GirafRecord::VARIANT_TAG, value))
    }
}

/// Returns the contig name and the 1-based starting position from the origin note of the record.
///
/// Returns `None` if the note is missing, the read is unmapped, or the note cannot be parsed.
pub fn origin(record: &GirafRecord) -> Option<(&str, usize)> {
    let value = record.string_note(GirafRecord::ORIGIN_TAG)?;
    if value == GirafRecord::UNMAPPED_ORIGIN {
        return None;
    }
    let separator = value.iter().rposition(|&c| c == b'=')?;
    let contig = str::from_utf8(&value[..separator]).ok()?;
    let pos = str::from_utf8(&value[separator + 1..]).ok()?.parse::<usize>().ok()?;
    Some((contig, pos))
}

//-----------------------------------------------------------------------------

/// Template has multiple segments.
pub const SAM_PAIRED: u16 = 0x1;

/// Each segment is properly aligned.
pub const SAM_PROPER_PAIR: u16 = 0x2;

/// Segment is unmapped.
pub const SAM_UNMAPPED: u16 = 0x4;

/// Next segment is unmapped.
pub const SAM_MATE_UNMAPPED: u16 = 0x8;

/// Sequence is reverse complemented.
pub const SAM_REVERSE: u16 = 0x10;

/// Sequence of the next segment is reverse complemented.
pub const SAM_MATE_REVERSE: u16 = 0x20;

/// The first segment in the template.
pub const SAM_FIRST: u16 = 0x40;

/// The last segment in the template.
pub const SAM_LAST: u16 = 0x80;

/// A SAM alignment line.
#[derive(Clone, Debug, PartialEq)]
pub struct SamRecord {
    pub qname: String,
    pub flag: u16,
    /// Reference name or `*`.
    pub rname: String,
    /// 1-based position or 0.
    pub pos: usize,
    pub mapq: u8,
    /// CIGAR string or `*`.
    pub cigar: String,
    /// Reference name of the mate, `=`, or `*`.
    pub rnext: String,
    pub pnext: usize,
    pub seq: Vec<u8>,
    /// Base qualities or `None`.
    pub qual: Option<Vec<u8>>,
    pub tags: Vec<TypedField>,
}

impl SamRecord {
    // The field is empty and the value is missing.
    const MISSING_VALUE: &'static str = "*";

    /// Tag for the alignment score.
    pub const SCORE_TAG: [u8; 2] = [b'A', b'S'];

    /// Tag for the graph path.
    pub const PATH_TAG: [u8; 2] = [b'G', b'P'];

    /// Builds a SAM record for a single read.
    ///
    /// Reads without an origin are reported as unmapped with the notes of the GIRAF record.
    /// Reads flagged as unmapped in GIRAF keep their position but get the unmapped flag.
    pub fn from_giraf(record: &GirafRecord) -> Self {
        let mut result = SamRecord {
            qname: record.name.clone(),
            flag: SAM_UNMAPPED,
            rname: String::from(Self::MISSING_VALUE),
            pos: 0,
            mapq: record.mapq,
            cigar: String::from(Self::MISSING_VALUE),
            rnext: String::from(Self::MISSING_VALUE),
            pnext: 0,
            seq: record.seq.clone(),
            qual: record.qual.clone(),
            tags: Vec::new(),
        };

        let origin = if record.path.is_empty() { None } else { origin(record) };
        let (contig, pos) = match origin {
            Some(origin) => origin,
            None => {
                result.tags = record.notes.clone();
                return result;
            }
        };

        result.flag = 0;
        if record.orientation == Orientation::Reverse {
            result.flag |= SAM_REVERSE;
        }
        if record.has_flag(FLAG_UNMAPPED) {
            result.flag |= SAM_UNMAPPED;
        }
        result.rname = contig.to_string();
        result.pos = pos;
        result.cigar = Self::cigar_string(record);
        result.tags.push(TypedField::Int(Self::SCORE_TAG, record.score as isize));
        result.tags.push(TypedField::String(Self::PATH_TAG, record.path.to_string().into_bytes()));
        result.tags.extend(record.notes.iter().cloned());
        result
    }

    /// Builds SAM records for a pair of reads.
    ///
    /// The records get the segment flags, the proper pair flag from GIRAF, and the mate fields.
    pub fn from_giraf_pair(first: &GirafRecord, second: &GirafRecord) -> (Self, Self) {
        let mut first_sam = Self::from_giraf(first);
        let mut second_sam = Self::from_giraf(second);
        first_sam.flag |= SAM_PAIRED | SAM_FIRST;
        second_sam.flag |= SAM_PAIRED | SAM_LAST;
        if first.has_flag(FLAG_PROPER_PAIR) && second.has_flag(FLAG_PROPER_PAIR) {
            first_sam.flag |= SAM_PROPER_PAIR;
            second_sam.flag |= SAM_PROPER_PAIR;
        }
        first_sam.set_mate(&second_sam);
        second_sam.set_mate(&first_sam);
        (first_sam, second_sam)
    }

    // Sets the mate flags and fields.
    fn set_mate(&mut self, mate: &SamRecord) {
        if mate.flag & SAM_UNMAPPED != 0 {
            self.flag |= SAM_MATE_UNMAPPED;
        }
        if mate.flag & SAM_REVERSE != 0 {
            self.flag |= SAM_MATE_REVERSE;
        }
        if mate.rname != Self::MISSING_VALUE {
            self.rnext = if mate.rname == self.rname { String::from("=") } else { mate.rname.clone() };
            self.pnext = mate.pos;
        }
    }

    // CIGAR string with soft clips for the unaligned ends.
    fn cigar_string(record: &GirafRecord) -> String {
        let ops = match record.difference.as_ref() {
            Some(ops) => ops,
            None => return String::from(Self::MISSING_VALUE),
        };
        let mut result = String::new();
        if record.query_interval.start > 0 {
            result.push_str(&format!("{}S", record.query_interval.start));
        }
        let cigar = Difference::to_cigar(ops);
        if !cigar.is_empty() {
            result.push_str(&cigar.to_string());
        }
        let clip = record.seq.len().saturating_sub(record.query_interval.end);
        if clip > 0 {
            result.push_str(&format!("{}S", clip));
        }
        if result.is_empty() {
            result.push_str(Self::MISSING_VALUE);
        }
        result
    }

    /// Returns `true` if the segment is unmapped.
    pub fn is_unmapped(&self) -> bool {
        self.flag & SAM_UNMAPPED != 0
    }

    /// Writes the record as a SAM line without the endline character.
    pub fn to_line(&self) -> Vec<u8> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(self.qname.as_bytes());
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.flag as usize);
        buffer.push(b'\t');
        buffer.extend_from_slice(self.rname.as_bytes());
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.pos);
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.mapq as usize);
        buffer.push(b'\t');
        buffer.extend_from_slice(self.cigar.as_bytes());
        buffer.push(b'\t');
        buffer.extend_from_slice(self.rnext.as_bytes());
        buffer.push(b'\t');
        utils::append_usize(&mut buffer, self.pnext);
        buffer.extend_from_slice(b"\t0\t");
        if self.seq.is_empty() {
            buffer.extend_from_slice(Self::MISSING_VALUE.as_bytes());
        } else {
            buffer.extend_from_slice(&self.seq);
        }
        buffer.push(b'\t');
        match self.qual.as_ref() {
            Some(qual) if !qual.is_empty() => buffer.extend_from_slice(qual),
            _ => buffer.extend_from_slice(Self::MISSING_VALUE.as_bytes()),
        }
        for tag in self.tags.iter() {
            tag.append_to(&mut buffer, true);
        }
        buffer
    }
}

/// Writes the SAM header with a `@SQ` line for each contig of the graph.
pub fn write_sam_header<T: Write>(graph: &Graph, output: &mut T) -> io::Result<()> {
    writeln!(output, "@HD\tVN:1.6\tSO:unsorted")?;
    for contig in graph.contigs() {
        writeln!(output, "@SQ\tSN:{}\tLN:{}", contig.name, contig.len)?;
    }
    writeln!(output, "@PG\tID:{}\tPN:{}\tVN:{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

/// Returns `true` if the GIRAF record is the first mate of a pair.
pub fn is_first_mate(record: &GirafRecord) -> bool {
    record.has_flag(FLAG_PAIRED) && record.has_flag(FLAG_FIRST_IN_PAIR)
}

//-----------------------------------------------------------------------------
