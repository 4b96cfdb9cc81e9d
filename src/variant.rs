//! Variant records used for building graphs.
//!
//! The kind of a variant is decided once when the record is created.
//! Structural variants with symbolic alleles follow the VCF convention: `pos` is the padding base before the event, and `END` is the last affected base.

use crate::Result;
use crate::Error;

use std::collections::HashMap;
use std::fmt;

//-----------------------------------------------------------------------------

/// Kind of a variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariantKind {
    /// Single or multi-nucleotide substitution with equal-length alleles.
    Snp,
    /// Insertion after the padding base.
    Insertion,
    /// Deletion after the padding base.
    Deletion,
    /// Inversion of the bases after the padding base up to `END`.
    Inversion,
    /// Duplication or copy number variant of the bases after the padding base up to `END`.
    Duplication,
    /// Complex replacement of the reference allele with the alternate allele.
    Haplotype,
}

impl VariantKind {
    /// Parses a structural variant type (`SVTYPE` or a symbolic allele without the brackets).
    pub fn from_sv_type(value: &str) -> Option<Self> {
        match value {
            "SNP" | "SNV" | "MNP" => Some(VariantKind::Snp),
            "INS" => Some(VariantKind::Insertion),
            "DEL" => Some(VariantKind::Deletion),
            "INV" => Some(VariantKind::Inversion),
            "DUP" | "CNV" | "DUP:TANDEM" => Some(VariantKind::Duplication),
            "HAP" | "COMPLEX" | "SNP;INS" | "SNP;DEL" => Some(VariantKind::Haplotype),
            _ => None,
        }
    }

    /// Classifies a variant by its alleles.
    pub fn from_alleles(ref_allele: &[u8], alt_allele: &[u8]) -> Self {
        if ref_allele.len() == alt_allele.len() {
            VariantKind::Snp
        } else if ref_allele.len() == 1 && alt_allele.first() == ref_allele.first() {
            VariantKind::Insertion
        } else if alt_allele.len() == 1 && alt_allele.first() == ref_allele.first() {
            VariantKind::Deletion
        } else {
            VariantKind::Haplotype
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariantKind::Snp => "SNP",
            VariantKind::Insertion => "INS",
            VariantKind::Deletion => "DEL",
            VariantKind::Inversion => "INV",
            VariantKind::Duplication => "DUP",
            VariantKind::Haplotype => "HAP",
        };
        write!(f, "{}", name)
    }
}

//-----------------------------------------------------------------------------

/// A variant call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Contig name.
    pub chrom: String,
    /// 1-based position of the first base of the reference allele.
    pub pos: usize,
    /// Identifier, or `.` if missing.
    pub id: String,
    /// Reference allele.
    pub ref_allele: Vec<u8>,
    /// Alternate allele, or a symbolic allele such as `<INV>`.
    pub alt_allele: Vec<u8>,
    /// Kind of the variant.
    pub kind: VariantKind,
    /// Value of the `END` field, if present.
    pub end: Option<usize>,
}

impl Variant {
    /// Creates a variant classified by its alleles.
    ///
    /// Alleles are converted to upper case.
    pub fn new(chrom: &str, pos: usize, ref_allele: &[u8], alt_allele: &[u8]) -> Self {
        let ref_allele = ref_allele.to_ascii_uppercase();
        let alt_allele = alt_allele.to_ascii_uppercase();
        let kind = VariantKind::from_alleles(&ref_allele, &alt_allele);
        Variant { chrom: chrom.to_string(), pos, id: String::from("."), ref_allele, alt_allele, kind, end: None }
    }

    /// Creates a structural variant with an explicit kind and `END` position.
    pub fn structural(chrom: &str, pos: usize, ref_allele: &[u8], kind: VariantKind, end: usize) -> Self {
        let alt_allele = format!("<{}>", kind).into_bytes();
        Variant {
            chrom: chrom.to_string(), pos, id: String::from("."),
            ref_allele: ref_allele.to_ascii_uppercase(), alt_allele, kind, end: Some(end),
        }
    }

    /// Returns `true` if the alternate allele is symbolic.
    pub fn is_symbolic(&self) -> bool {
        self.alt_allele.first() == Some(&b'<')
    }

    /// Parses a VCF data line.
    ///
    /// Returns `None` for header lines and empty lines.
    /// Only the first alternate allele is used.
    /// The kind is taken from `SVTYPE` in the INFO field, then from a symbolic allele, and finally from the allele lengths.
    /// `SVTYPE=SNP;INS` and `SVTYPE=SNP;DEL` denote haplotype blocks.
    /// A substitution with alleles of different lengths is classified by the alleles instead.
    pub fn from_vcf_line(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(format!("VCF line with {} fields", fields.len()));
        }
        let pos: usize = fields[1].parse().map_err(|_| format!("Invalid position: {}", fields[1]))?;
        if pos == 0 {
            return Err(String::from("Position 0 is not valid in VCF"));
        }
        let ref_allele = fields[3].as_bytes().to_ascii_uppercase();
        let alt = fields[4].split(',').next().unwrap_or_default();
        let alt_allele = alt.as_bytes().to_ascii_uppercase();
        if ref_allele.is_empty() || alt_allele.is_empty() {
            return Err(String::from("Empty allele"));
        }

        let info = Self::parse_info(fields.get(7).copied().unwrap_or("."));
        let end = match info.get("END") {
            Some(value) => Some(value.parse::<usize>().map_err(|_| format!("Invalid END: {}", value))?),
            None => None,
        };
        let symbolic = alt.strip_prefix('<').and_then(|x| x.strip_suffix('>'));
        let sv_type = info.get("SVTYPE").map(|&value| Self::combined_sv_type(value, &info));
        let mut kind = sv_type.and_then(VariantKind::from_sv_type)
            .or_else(|| symbolic.and_then(VariantKind::from_sv_type))
            .unwrap_or_else(|| VariantKind::from_alleles(&ref_allele, &alt_allele));
        if kind == VariantKind::Snp && symbolic.is_none() && ref_allele.len() != alt_allele.len() {
            kind = VariantKind::from_alleles(&ref_allele, &alt_allele);
        }
        if symbolic.is_some() && matches!(kind, VariantKind::Snp | VariantKind::Insertion | VariantKind::Haplotype) {
            return Err(format!("Symbolic allele {} is not supported for {}", alt, kind));
        }

        Ok(Some(Variant {
            chrom: fields[0].to_string(),
            pos,
            id: fields[2].to_string(),
            ref_allele,
            alt_allele,
            kind,
            end,
        }))
    }

    // `SVTYPE=SNP;INS` is split into two INFO keys.
    fn combined_sv_type<'a>(value: &'a str, info: &HashMap<&str, &str>) -> &'a str {
        match value {
            "SNP" if info.get("INS") == Some(&"") => "SNP;INS",
            "SNP" if info.get("DEL") == Some(&"") => "SNP;DEL",
            _ => value,
        }
    }

    fn parse_info(info: &str) -> HashMap<&str, &str> {
        let mut result = HashMap::new();
        if info == "." {
            return result;
        }
        for field in info.split(';') {
            match field.split_once('=') {
                Some((key, value)) => { result.insert(key, value); },
                None => { result.insert(field, ""); },
            }
        }
        result
    }
}

//-----------------------------------------------------------------------------

/// Splits variants by contig in the order of the reference contigs.
///
/// The order of the variants within each contig is preserved.
/// Returns an error if a variant refers to a contig that is not in the reference.
pub fn split_variants_by_contig(contigs: &[&str], variants: Vec<Variant>) -> Result<Vec<Vec<Variant>>> {
    let index: HashMap<&str, usize> = contigs.iter().enumerate().map(|(i, name)| (*name, i)).collect();
    let mut result: Vec<Vec<Variant>> = vec![Vec::new(); contigs.len()];
    for variant in variants {
        let contig = *index.get(variant.chrom.as_str()).ok_or_else(|| {
            Error::Config(format!("Variant at {}:{} is on a contig that is not in the reference", variant.chrom, variant.pos))
        })?;
        result[contig].push(variant);
    }
    Ok(result)
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
