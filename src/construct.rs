//! Building a genome graph from a reference and variant calls.
//!
//! The builder scans the variants of each contig from left to right and maintains a *frontier*: the nodes whose outgoing edges are not final yet.
//! Reference bases between variants become match nodes.
//! A variant either opens a bubble (SNPs, haplotype blocks, inversions) that replaces the frontier with a reference node and an alternate node, or adds a detour node (insertions, deletions, duplications) that joins the frontier.
//! When a node leaves the frontier, its outgoing edges are renormalized with [`Graph::set_even_weights`].
//!
//! If there are no reference bases between the previous variant and the current one, no match node is created.
//! The nodes of the current variant are attached directly to the nodes of the previous variant.
//! Adjacent SNPs are coalesced into a single multi-base bubble.
//!
//! Variants that overlap an earlier variant or fall outside the reference are skipped with a warning and counted as missed.
//!
//! # Coordinates
//!
//! With a 1-based VCF position `pos`:
//!
//! * SNPs and haplotype blocks replace reference bases `pos..pos + len(REF)`.
//! * Insertions and deletions use the first base of the alleles as padding; the inserted or deleted bases come after it.
//! * Inversions and duplications cover reference bases `pos + 1..=END`.
//!   The variant must have an `END` field.
//! * The end of a deletion depends on [`DeletionEnd`].

use crate::formats::{self, FastaRecord};
use crate::graph::{Annotation, Graph, NodeId, NodeKind, ALT_ALLELE, REF_ALLELE};
use crate::variant::{self, Variant, VariantKind};
use crate::{dna, Error, Result};

use std::path::Path;

use log::{debug, info, warn};


//-----------------------------------------------------------------------------

/// How far a deletion extends past its padding base.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeletionEnd {
    /// The deleted bases are the reference allele without the padding base.
    ///
    /// Symbolic deletions such as `<DEL>` use the `END` field instead.
    #[default]
    RefAllele,
    /// The deletion ends at the `END` field if present, and at the end of the reference allele otherwise.
    ///
    /// This is the convention used by long-read structural variant callers.
    InfoEnd,
    /// As [`DeletionEnd::RefAllele`], but the deletion is truncated before the next variant on the same contig.
    ClampToNext,
}

/// Parameters for graph construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildParams {
    /// Deletion end resolution strategy.
    pub deletion_end: DeletionEnd,
}

/// Statistics from graph construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of contigs.
    pub contigs: usize,
    /// Number of variants added to the graph.
    pub added: usize,
    /// Number of variants skipped because of overlaps or invalid coordinates.
    pub missed: usize,
    /// Number of adjacent SNPs merged into the previous bubble.
    pub coalesced: usize,
}

//-----------------------------------------------------------------------------

// Shape of the subgraph created for a variant.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Shape {
    // Replaces the frontier with a reference node and an alternate node.
    Bubble { reference: Vec<u8>, alternate: Vec<u8> },
    // Adds a single node to the frontier.
    Detour { seq: Vec<u8>, allele: u8 },
}

// A variant resolved to 0-based reference coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Site {
    // First reference base the variant needs; must not be in the graph already.
    start: usize,
    // Reference bases before this are covered by match nodes.
    match_end: usize,
    // Reference index after the variant.
    next_index: usize,
    kind: NodeKind,
    // 1-based position for the annotations.
    annotation_start: usize,
    shape: Shape,
}

//-----------------------------------------------------------------------------

/// A graph builder that adds one contig at a time.
///
/// # Examples
///
/// ```
/// use gengraph::construct::{BuildParams, GraphBuilder};
/// use gengraph::variant::Variant;
///
/// let variants = vec![Variant::new("chr1", 5, b"G", b"C")];
/// let mut builder = GraphBuilder::new(BuildParams::default());
/// builder.add_contig("chr1", b"ATGCGTAACG", &variants).unwrap();
/// let (graph, stats) = builder.finish().unwrap();
///
/// assert_eq!(graph.len(), 4);
/// assert_eq!(stats.added, 1);
/// assert_eq!(graph.node(3).unwrap().seq(), b"TAACG");
/// ```
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    params: BuildParams,
    graph: Graph,
    stats: BuildStats,

    // Nodes with outgoing edges that are not final yet.
    frontier: Vec<NodeId>,
    // Next reference base (0-based) that is not in the graph.
    index: usize,
    // Reference and alternate nodes of the last bubble if it was a SNP with nothing after it.
    last_snp: Option<(NodeId, NodeId)>,
}

impl GraphBuilder {
    /// Creates a builder for an empty graph.
    pub fn new(params: BuildParams) -> Self {
        GraphBuilder {
            params,
            graph: Graph::new(),
            stats: BuildStats::default(),
            frontier: Vec::new(),
            index: 0,
            last_snp: None,
        }
    }

    /// Returns the statistics so far.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Adds a contig with its variants, which must be sorted by position.
    ///
    /// Returns an error if a variant is on another contig, or if an inversion or a duplication has no `END` field.
    pub fn add_contig(&mut self, name: &str, reference: &[u8], variants: &[Variant]) -> Result<()> {
        let first = self.graph.len() as NodeId;
        self.frontier.clear();
        self.index = 0;
        self.last_snp = None;

        let (mut added, mut missed) = (0, 0);
        for (i, variant) in variants.iter().enumerate() {
            if variant.chrom != name {
                return Err(Error::Config(format!(
                    "Variant at {}:{} was given for contig {}", variant.chrom, variant.pos, name
                )));
            }
            let Some(site) = self.resolve(variant, variants.get(i + 1), reference)? else {
                warn!("Skipping {} variant {} at {}:{}: outside the reference or empty", variant.kind, variant.id, name, variant.pos);
                missed += 1;
                continue;
            };
            if site.start < self.index {
                warn!("Skipping {} variant {} at {}:{}: overlaps the previous variant", variant.kind, variant.id, name, variant.pos);
                missed += 1;
                continue;
            }
            self.add_site(reference, site)?;
            added += 1;
        }

        if self.index < reference.len() {
            self.add_match(reference, reference.len())?;
        }
        for id in std::mem::take(&mut self.frontier) {
            self.graph.set_even_weights(id)?;
        }
        self.last_snp = None;
        self.graph.add_contig(name, first..self.graph.len() as NodeId, reference.len())?;

        info!(
            "Contig {}: {} bp, {} nodes, {} variants added, {} missed",
            name, reference.len(), self.graph.len() - first as usize, added, missed
        );
        self.stats.contigs += 1;
        self.stats.added += added;
        self.stats.missed += missed;
        Ok(())
    }

    /// Validates and returns the graph with the statistics.
    pub fn finish(self) -> Result<(Graph, BuildStats)> {
        self.graph.validate()?;
        Ok((self.graph, self.stats))
    }

    // Resolves the variant to reference coordinates.
    // Returns `None` if the variant is empty or outside the reference.
    fn resolve(&self, variant: &Variant, next: Option<&Variant>, reference: &[u8]) -> Result<Option<Site>> {
        if variant.pos == 0 {
            return Ok(None);
        }
        let pos = variant.pos;
        let len = reference.len();
        let kind = NodeKind::from(variant.kind);

        let site = match variant.kind {
            VariantKind::Snp | VariantKind::Haplotype => {
                let start = pos - 1;
                let end = start + variant.ref_allele.len();
                if end > len {
                    return Ok(None);
                }
                if reference[start..end] != variant.ref_allele[..] {
                    warn!(
                        "Reference allele of variant {} at {}:{} does not match the reference",
                        variant.id, variant.chrom, pos
                    );
                }
                Site {
                    start, match_end: start, next_index: end, kind,
                    annotation_start: pos,
                    shape: Shape::Bubble { reference: reference[start..end].to_vec(), alternate: variant.alt_allele.clone() },
                }
            },
            VariantKind::Insertion => {
                let inserted = variant.alt_allele.get(1..).unwrap_or_default();
                if pos > len || inserted.is_empty() {
                    return Ok(None);
                }
                Site {
                    start: pos, match_end: pos, next_index: pos, kind,
                    annotation_start: pos + 1,
                    shape: Shape::Detour { seq: inserted.to_vec(), allele: ALT_ALLELE },
                }
            },
            VariantKind::Deletion => {
                let end = self.deletion_end(variant, next)?;
                if end > len || end <= pos {
                    return Ok(None);
                }
                Site {
                    start: pos, match_end: pos, next_index: end, kind,
                    annotation_start: pos + 1,
                    shape: Shape::Detour { seq: reference[pos..end].to_vec(), allele: REF_ALLELE },
                }
            },
            VariantKind::Inversion => {
                let end = Self::required_end(variant)?;
                if end > len || end <= pos {
                    return Ok(None);
                }
                let span = &reference[pos..end];
                Site {
                    start: pos, match_end: pos, next_index: end, kind,
                    annotation_start: pos + 1,
                    shape: Shape::Bubble { reference: span.to_vec(), alternate: dna::reverse_complement(span) },
                }
            },
            VariantKind::Duplication => {
                let end = Self::required_end(variant)?;
                if end > len || end <= pos {
                    return Ok(None);
                }
                // The copy follows the duplicated span, which is in the preceding match node.
                Site {
                    start: pos, match_end: end, next_index: end, kind,
                    annotation_start: pos + 1,
                    shape: Shape::Detour { seq: reference[pos..end].to_vec(), allele: ALT_ALLELE },
                }
            },
        };
        Ok(Some(site))
    }

    // Returns the exclusive 0-based end of the deleted bases.
    fn deletion_end(&self, variant: &Variant, next: Option<&Variant>) -> Result<usize> {
        let allele_end = if variant.is_symbolic() {
            Self::required_end(variant)?
        } else {
            variant.pos - 1 + variant.ref_allele.len()
        };
        let end = match self.params.deletion_end {
            DeletionEnd::RefAllele => allele_end,
            DeletionEnd::InfoEnd => variant.end.unwrap_or(allele_end),
            DeletionEnd::ClampToNext => match next {
                Some(next) => allele_end.min(next.pos.saturating_sub(1)),
                None => allele_end,
            },
        };
        Ok(end)
    }

    fn required_end(variant: &Variant) -> Result<usize> {
        variant.end.ok_or_else(|| Error::Config(format!(
            "{} variant {} at {}:{} has no END field", variant.kind, variant.id, variant.chrom, variant.pos
        )))
    }

    // Adds the nodes for a resolved variant.
    fn add_site(&mut self, reference: &[u8], site: Site) -> Result<()> {
        if site.match_end > self.index {
            self.add_match(reference, site.match_end)?;
        }

        match site.shape {
            Shape::Bubble { reference: ref_seq, alternate } => {
                if let (NodeKind::Snp, Some((ref_node, alt_node))) = (site.kind, self.last_snp) {
                    debug!("Coalescing a SNP at position {} with the previous bubble", site.annotation_start);
                    self.graph.extend_sequence(ref_node, &ref_seq)?;
                    self.graph.extend_sequence(alt_node, &alternate)?;
                    self.stats.coalesced += 1;
                } else {
                    let ref_node = self.graph.add_node(ref_seq, Some(Annotation::new(REF_ALLELE, site.annotation_start, site.kind)));
                    let alt_node = self.graph.add_node(alternate, Some(Annotation::new(ALT_ALLELE, site.annotation_start, site.kind)));
                    self.replace_frontier(&[ref_node, alt_node], 0.5)?;
                    self.last_snp = if site.kind == NodeKind::Snp { Some((ref_node, alt_node)) } else { None };
                }
            },
            Shape::Detour { seq, allele } => {
                let id = self.graph.add_node(seq, Some(Annotation::new(allele, site.annotation_start, site.kind)));
                for &from in self.frontier.iter() {
                    self.graph.add_edge(from, id, 1.0)?;
                }
                self.frontier.push(id);
                self.last_snp = None;
            },
        }

        self.index = site.next_index;
        Ok(())
    }

    // Adds a match node for reference bases from the current index to `end`.
    fn add_match(&mut self, reference: &[u8], end: usize) -> Result<()> {
        let seq = reference[self.index..end].to_vec();
        let id = self.graph.add_node(seq, Some(Annotation::new(REF_ALLELE, self.index + 1, NodeKind::Match)));
        self.replace_frontier(&[id], 1.0)?;
        self.index = end;
        self.last_snp = None;
        Ok(())
    }

    // Connects the frontier to the new nodes, finalizes the old frontier, and makes the new nodes the frontier.
    fn replace_frontier(&mut self, nodes: &[NodeId], prob: f32) -> Result<()> {
        for &from in self.frontier.iter() {
            for &to in nodes {
                self.graph.add_edge(from, to, prob)?;
            }
            self.graph.set_even_weights(from)?;
        }
        self.frontier.clear();
        self.frontier.extend_from_slice(nodes);
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Builds a graph from reference contigs and per-contig variant lists.
///
/// `variants[i]` must contain the variants for `reference[i]` sorted by position.
/// Returns an error if the number of variant lists does not match the number of contigs.
pub fn build_graph(reference: &[FastaRecord], variants: &[Vec<Variant>], params: &BuildParams) -> Result<(Graph, BuildStats)> {
    if reference.len() != variants.len() {
        return Err(Error::Config(format!(
            "The reference has {} contigs but variants were given for {} contigs", reference.len(), variants.len()
        )));
    }
    let mut builder = GraphBuilder::new(params.clone());
    for (record, contig_variants) in reference.iter().zip(variants.iter()) {
        builder.add_contig(&record.name, &record.seq, contig_variants)?;
    }
    builder.finish()
}

/// Builds a graph from a FASTA reference and a VCF file.
///
/// Both files may be gzip-compressed.
/// Malformed VCF records are skipped with a warning.
pub fn build_graph_from_files<P: AsRef<Path>, Q: AsRef<Path>>(fasta: P, vcf: Q, params: &BuildParams) -> Result<(Graph, BuildStats)> {
    let reference = formats::read_fasta_file(fasta)?;
    info!("Read {} reference contigs", reference.len());
    let variants = formats::read_vcf_file(vcf)?;
    info!("Read {} variants", variants.len());
    let names: Vec<&str> = reference.iter().map(|record| record.name.as_str()).collect();
    let variants = variant::split_variants_by_contig(&names, variants)?;
    build_graph(&reference, &variants, params)
}

//-----------------------------------------------------------------------------
