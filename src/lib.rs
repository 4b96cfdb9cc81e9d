//! # GenGraph: variant-aware genome graphs and graph read alignment.
//!
//! This crate builds a genome graph from a linear reference and a set of variants, and aligns sequencing reads to the graph.
//!
//! # Graph construction
//!
//! A reference contig becomes a linear chain of nodes, with branch points inserted at the variant sites.
//! SNPs, MNPs, inversions, and haplotype blocks become bubbles with a reference allele and an alternate allele.
//! Insertions and deletions become detours, and duplications become a copy of the duplicated span placed right after it.
//! Nodes carry an annotation with the contig position and the allele they represent.
//! Walking any source-to-sink path within a contig reconstructs a haplotype consistent with a subset of the variants.
//!
//! See [`Graph`] for the graph and its text format, and [`construct`] for the builder.
//!
//! # Alignment
//!
//! The pairwise engine in [`align`] computes global alignments with affine gap penalties (Gotoh).
//! It also has variants that use less memory, align chunks of bases, align blocks of aligned sequences, or leave one end free.
//! Scores come from a substitution matrix over `A, C, G, T, N`; see [`Scoring`].
//!
//! Reads are aligned to the graph with a seed-and-extend [`Aligner`]:
//!
//! * Exact-match seeds are found with a [`KmerIndex`] over the node sequences.
//! * Each seed is extended to the left and to the right through the graph (see [`extend`]).
//! * The best alignment is reported as a [`GirafRecord`], and it can be projected to a SAM line (see [`projection`]).
//!
//! [`pipeline`] maps a stream of reads or read pairs with a pool of worker threads.
//!
//! ### Basic concepts
//!
//! Nodes are identified by their indexes in the graph.
//! An alignment covers a [`GraphPath`]: a walk through the graph with an offset into the first node and a past-the-end offset into the last node.
//! Positions in the annotations and in the output are 1-based reference coordinates, while offsets within nodes are 0-based.

pub mod align;
pub mod alignment;
pub mod cigar;
pub mod construct;
pub mod dna;
pub mod error;
pub mod extend;
pub mod formats;
pub mod graph;
pub mod mapper;
pub mod pipeline;
pub mod projection;
pub mod scoring;
pub mod seed;
pub mod utils;
pub mod variant;

pub use alignment::{Difference, GirafRecord, GraphPath};
pub use cigar::{Cigar, Op};
pub use construct::{build_graph, BuildParams, GraphBuilder};
pub use error::{Error, Result};
pub use extend::{extend_left, extend_right, Extension};
pub use formats::{FastaRecord, FastqRecord};
pub use graph::{Annotation, Contig, Graph, Node, NodeId, NodeKind};
pub use mapper::{Aligner, AlignerParams, GraphAlignment, Workspace};
pub use pipeline::{OutputFormat, PipelineParams, PipelineStats};
pub use projection::SamRecord;
pub use scoring::{ScoreMatrix, Scoring};
pub use seed::{KmerIndex, Seed};
pub use variant::{Variant, VariantKind};

#[cfg(test)]
mod internal;
