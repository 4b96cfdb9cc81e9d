//! Genome graph: sequence nodes connected by weighted edges.
//!
//! All nodes are stored in an arena owned by [`Graph`], and a node is identified by its index in the arena.
//! Each node stores its outgoing edges in `next` and mirrored copies of its incoming edges in `prev`.
//! Edges can only be added through [`Graph::add_edge`], which maintains the invariant that every edge `(u -> v, w)` in `u.next` has exactly one mirror `(u, w)` in `v.prev`.
//!
//! ### Text format
//!
//! The file starts with a line `@name<TAB>first<TAB>end<TAB>len` for each contig, where `first..end` is the node range and `len` is the length of the reference sequence.
//! The next section has a header line `>id` for each node, followed by the sequence wrapped to lines of at most 50 bases.
//! The header may also carry an annotation as tab-separated fields `contig`, `start`, `allele`, and `kind`, with contig `*` for nodes outside contigs.
//! The last section has a line for each node, listing the weight and the destination of every outgoing edge: `id<TAB>weight<TAB>dest...`.
//! Node identifiers must be `0, 1, 2, ...` in order.
//!
//! Without contig lines, contigs are rebuilt from runs of annotated nodes with the same contig name.
//!
//! ```text
//! @chr1	0	4	10
//! >0	chr1	1	0	match
//! ATGC
//! >1	chr1	5	0	snp
//! G
//! >2	chr1	5	1	snp
//! C
//! >3	chr1	6	0	match
//! TAACG
//! 0	0.5	1	0.5	2
//! 1	1	3
//! 2	1	3
//! 3
//! ```

use crate::alignment::GraphPath;
use crate::formats::{self, TypedField};
use crate::variant::VariantKind;
use crate::{utils, Error, Result};

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;


//-----------------------------------------------------------------------------

/// Node identifier: the index of the node in the graph.
pub type NodeId = u32;

/// A weighted edge.
///
/// In `next`, the edge points to the destination node.
/// In `prev`, the mirrored edge points back to the source node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub dest: NodeId,
    pub prob: f32,
}

/// Kind of the variant that produced a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Reference sequence between variants.
    Match,
    /// Single or multi-nucleotide substitution.
    Snp,
    /// Inserted sequence.
    Insertion,
    /// Deleted reference sequence.
    Deletion,
    /// Inversion.
    Inversion,
    /// Duplication or copy number variant.
    Duplication,
    /// Complex haplotype block.
    Haplotype,
}

impl NodeKind {
    /// Returns the name used in the graph file and in alignment notes.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Match => "match",
            NodeKind::Snp => "snp",
            NodeKind::Insertion => "ins",
            NodeKind::Deletion => "del",
            NodeKind::Inversion => "inv",
            NodeKind::Duplication => "dup",
            NodeKind::Haplotype => "hap",
        }
    }
}

impl From<VariantKind> for NodeKind {
    fn from(kind: VariantKind) -> Self {
        match kind {
            VariantKind::Snp => NodeKind::Snp,
            VariantKind::Insertion => NodeKind::Insertion,
            VariantKind::Deletion => NodeKind::Deletion,
            VariantKind::Inversion => NodeKind::Inversion,
            VariantKind::Duplication => NodeKind::Duplication,
            VariantKind::Haplotype => NodeKind::Haplotype,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "match" => Ok(NodeKind::Match),
            "snp" => Ok(NodeKind::Snp),
            "ins" => Ok(NodeKind::Insertion),
            "del" => Ok(NodeKind::Deletion),
            "inv" => Ok(NodeKind::Inversion),
            "dup" => Ok(NodeKind::Duplication),
            "hap" => Ok(NodeKind::Haplotype),
            _ => Err(format!("Unknown node kind: {}", s)),
        }
    }
}

/// Reference allele.
pub const REF_ALLELE: u8 = 0;

/// Alternate allele.
pub const ALT_ALLELE: u8 = 1;

/// Origin of a node in the reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Annotation {
    /// [`REF_ALLELE`] or [`ALT_ALLELE`].
    pub allele: u8,
    /// 1-based position of the first base of the node in the reference contig.
    pub start: usize,
    /// Kind of the variant that produced the node.
    pub kind: NodeKind,
}

impl Annotation {
    pub fn new(allele: u8, start: usize, kind: NodeKind) -> Self {
        Annotation { allele, start, kind }
    }

    /// Returns `true` if the node is an alternate allele of a variant.
    pub fn is_alternate(&self) -> bool {
        self.allele == ALT_ALLELE && self.kind != NodeKind::Match
    }

    // Returns the past-the-end 1-based position of the node in the reference, if it covers reference bases.
    fn reference_end(&self, len: usize) -> Option<usize> {
        let reference_bases = self.allele == REF_ALLELE || matches!(
            self.kind, NodeKind::Deletion | NodeKind::Inversion | NodeKind::Duplication
        );
        if reference_bases { Some(self.start + len) } else { None }
    }
}

/// A node in the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    id: NodeId,
    seq: Vec<u8>,
    next: Vec<Edge>,
    prev: Vec<Edge>,
    annotation: Option<Annotation>,
}

impl Node {
    /// Returns the identifier of the node.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the sequence of the node.
    #[inline]
    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    /// Returns the length of the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// Returns `true` if the sequence is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Returns the outgoing edges.
    #[inline]
    pub fn next(&self) -> &[Edge] {
        &self.next
    }

    /// Returns the mirrored incoming edges.
    #[inline]
    pub fn prev(&self) -> &[Edge] {
        &self.prev
    }

    /// Returns the annotation, if present.
    #[inline]
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }
}

/// A reference contig and the contiguous range of nodes built from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contig {
    /// Name of the contig.
    pub name: String,
    /// Nodes built from the contig.
    pub nodes: Range<NodeId>,
    /// Length of the reference sequence.
    pub len: usize,
}

//-----------------------------------------------------------------------------

/// A genome graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    contigs: Vec<Contig>,
}

/// Construction.
impl Graph {
    /// Maximum number of bases per sequence line in the text format.
    pub const LINE_WIDTH: usize = 50;

    // Contig name for annotated nodes outside contigs in the text format.
    const NO_CONTIG: u8 = b'*';

    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node without edges and returns its identifier.
    pub fn add_node(&mut self, seq: Vec<u8>, annotation: Option<Annotation>) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node { id, seq, next: Vec::new(), prev: Vec::new(), annotation });
        id
    }

    /// Adds an edge and its mirror.
    ///
    /// Returns an error if either node does not exist.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, prob: f32) -> Result<()> {
        self.check_node(from)?;
        self.check_node(to)?;
        self.nodes[from as usize].next.push(Edge { dest: to, prob });
        self.nodes[to as usize].prev.push(Edge { dest: from, prob });
        Ok(())
    }

    /// Appends bases to the sequence of a node.
    pub fn extend_sequence(&mut self, id: NodeId, bases: &[u8]) -> Result<()> {
        self.check_node(id)?;
        self.nodes[id as usize].seq.extend_from_slice(bases);
        Ok(())
    }

    /// Sets the weights of the outgoing edges of the node to `1 / out-degree`.
    ///
    /// The mirrored edges are updated as well.
    /// Applying this twice has the same effect as applying it once.
    pub fn set_even_weights(&mut self, id: NodeId) -> Result<()> {
        self.check_node(id)?;
        let degree = self.nodes[id as usize].next.len();
        if degree == 0 {
            return Ok(());
        }
        let prob = 1.0 / degree as f32;
        let successors: Vec<NodeId> = self.nodes[id as usize].next.iter().map(|edge| edge.dest).collect();
        for edge in self.nodes[id as usize].next.iter_mut() {
            edge.prob = prob;
        }
        for dest in successors {
            for edge in self.nodes[dest as usize].prev.iter_mut().filter(|edge| edge.dest == id) {
                edge.prob = prob;
            }
        }
        Ok(())
    }

    /// Applies [`Graph::set_even_weights`] to every node.
    pub fn set_all_even_weights(&mut self) {
        for id in 0..self.nodes.len() {
            // The identifier is always valid.
            let _ = self.set_even_weights(id as NodeId);
        }
    }

    /// Adds a contig covering the given node range.
    pub fn add_contig(&mut self, name: &str, nodes: Range<NodeId>, len: usize) -> Result<()> {
        if nodes.end as usize > self.nodes.len() || nodes.start > nodes.end {
            return Err(Error::Invariant(format!("Contig {} has an invalid node range {:?}", name, nodes)));
        }
        if self.contigs.iter().any(|contig| contig.name == name) {
            return Err(Error::Config(format!("Duplicate contig name {}", name)));
        }
        self.contigs.push(Contig { name: name.to_string(), nodes, len });
        Ok(())
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if (id as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::Invariant(format!("Node {} does not exist in a graph with {} nodes", id, self.nodes.len())))
        }
    }
}

/// Queries.
impl Graph {
    /// Returns the number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node with the given identifier.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Returns all nodes.
    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the contigs.
    #[inline]
    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// Returns the contig the node was built from.
    pub fn contig_of(&self, id: NodeId) -> Option<&Contig> {
        self.contigs.iter().find(|contig| contig.nodes.contains(&id))
    }

    /// Returns the total number of bases in the nodes.
    pub fn total_bases(&self) -> usize {
        self.nodes.iter().map(|node| node.len()).sum()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.next.len()).sum()
    }

    /// Returns all edges as `(source, destination, weight)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, f32)> + '_ {
        self.nodes.iter().flat_map(|node| node.next.iter().map(move |edge| (node.id, edge.dest, edge.prob)))
    }

    /// Returns `true` if there is an edge from `from` to `to`.
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.node(from).map_or(false, |node| node.next.iter().any(|edge| edge.dest == to))
    }

    /// Returns the sequence covered by the path.
    ///
    /// Returns an error if a node does not exist, consecutive nodes are not connected, or the offsets are out of bounds.
    pub fn path_sequence(&self, path: &GraphPath) -> Result<Vec<u8>> {
        let mut result = Vec::new();
        let last = path.nodes.len().saturating_sub(1);
        for (i, &id) in path.nodes.iter().enumerate() {
            let node = self.node(id).ok_or_else(|| Error::Invariant(format!("Path node {} does not exist", id)))?;
            if i > 0 && !self.has_edge(path.nodes[i - 1], id) {
                return Err(Error::Invariant(format!("Path nodes {} and {} are not connected", path.nodes[i - 1], id)));
            }
            let start = if i == 0 { path.start } else { 0 };
            let end = if i == last { path.end } else { node.len() };
            if start > end || end > node.len() {
                return Err(Error::Invariant(format!("Path interval {}..{} is out of bounds for node {}", start, end, id)));
            }
            result.extend_from_slice(&node.seq[start..end]);
        }
        Ok(result)
    }

    /// Checks the structural invariants of the graph.
    ///
    /// * Node identifiers match their indexes.
    /// * Every edge points to an existing node.
    /// * Every edge has exactly one mirror, and every mirror corresponds to an edge.
    /// * Contig node ranges are valid.
    pub fn validate(&self) -> Result<()> {
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id as usize != index {
                return Err(Error::Invariant(format!("Node at index {} has identifier {}", index, node.id)));
            }
        }

        // Count the edges and the mirrors as (source, destination, weight bits) triples.
        let mut balance: HashMap<(NodeId, NodeId, u32), isize> = HashMap::new();
        for node in self.nodes.iter() {
            for edge in node.next.iter() {
                self.check_node(edge.dest)?;
                *balance.entry((node.id, edge.dest, edge.prob.to_bits())).or_default() += 1;
            }
            for edge in node.prev.iter() {
                self.check_node(edge.dest)?;
                *balance.entry((edge.dest, node.id, edge.prob.to_bits())).or_default() -= 1;
            }
        }
        if let Some(((from, to, prob), count)) = balance.into_iter().find(|(_, count)| *count != 0) {
            let what = if count > 0 { "without a mirror" } else { "mirror without an edge" };
            return Err(Error::Invariant(format!("Edge {} -> {} with weight {} {}", from, to, f32::from_bits(prob), what)));
        }

        for contig in self.contigs.iter() {
            if contig.nodes.end as usize > self.nodes.len() {
                return Err(Error::Invariant(format!("Contig {} extends past the last node", contig.name)));
            }
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Serialization.
impl Graph {
    /// Writes the graph in the text format.
    pub fn write<T: Write>(&self, output: &mut T) -> io::Result<()> {
        let mut buffer: Vec<u8> = Vec::new();
        for contig in self.contigs.iter() {
            buffer.clear();
            buffer.push(b'@');
            buffer.extend_from_slice(contig.name.as_bytes());
            for value in [contig.nodes.start as usize, contig.nodes.end as usize, contig.len] {
                buffer.push(b'\t');
                utils::append_usize(&mut buffer, value);
            }
            buffer.push(b'\n');
            output.write_all(&buffer)?;
        }

        for node in self.nodes.iter() {
            buffer.clear();
            buffer.push(b'>');
            utils::append_usize(&mut buffer, node.id as usize);
            if let Some(annotation) = node.annotation.as_ref() {
                buffer.push(b'\t');
                match self.contig_of(node.id) {
                    Some(contig) => buffer.extend_from_slice(contig.name.as_bytes()),
                    None => buffer.push(Self::NO_CONTIG),
                }
                buffer.push(b'\t');
                utils::append_usize(&mut buffer, annotation.start);
                buffer.push(b'\t');
                utils::append_usize(&mut buffer, annotation.allele as usize);
                buffer.push(b'\t');
                buffer.extend_from_slice(annotation.kind.name().as_bytes());
            }
            buffer.push(b'\n');
            for line in node.seq.chunks(Self::LINE_WIDTH) {
                buffer.extend_from_slice(line);
                buffer.push(b'\n');
            }
            output.write_all(&buffer)?;
        }

        for node in self.nodes.iter() {
            buffer.clear();
            utils::append_usize(&mut buffer, node.id as usize);
            for edge in node.next.iter() {
                buffer.push(b'\t');
                buffer.extend_from_slice(edge.prob.to_string().as_bytes());
                buffer.push(b'\t');
                utils::append_usize(&mut buffer, edge.dest as usize);
            }
            buffer.push(b'\n');
            output.write_all(&buffer)?;
        }

        Ok(())
    }

    /// Writes the graph to a file in the text format.
    pub fn write_file<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let file = std::fs::File::create(filename)?;
        let mut output = io::BufWriter::new(file);
        self.write(&mut output)?;
        output.flush()?;
        Ok(())
    }

    /// Reads a graph in the text format.
    ///
    /// Returns an error if the file is malformed, the node identifiers are not consecutive, or an edge refers to a missing node.
    pub fn read<R: BufRead>(input: R) -> Result<Self> {
        let mut graph = Graph::new();
        let mut contigs: Vec<(usize, Contig)> = Vec::new();
        let mut contig_of_node: Vec<Option<String>> = Vec::new();
        let mut in_edges = false;

        for (index, line) in input.lines().enumerate() {
            let line_num = index + 1;
            let line = line?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(fields) = line.strip_prefix('@') {
                if in_edges || !graph.is_empty() {
                    return Err(Error::graph_format(line_num, "Contig line after the node headers"));
                }
                contigs.push((line_num, Self::parse_contig(fields, line_num)?));
            } else if let Some(header) = line.strip_prefix('>') {
                if in_edges {
                    return Err(Error::graph_format(line_num, "Node header after the edge section"));
                }
                let (id, contig, annotation) = Self::parse_header(header, line_num)?;
                if id as usize != graph.len() {
                    return Err(Error::graph_format(line_num, format!("Expected node {}, found node {}", graph.len(), id)));
                }
                graph.add_node(Vec::new(), annotation);
                contig_of_node.push(contig);
            } else if line.as_bytes()[0].is_ascii_digit() {
                in_edges = true;
                graph.parse_edges(line, line_num)?;
            } else {
                if in_edges || graph.is_empty() {
                    return Err(Error::graph_format(line_num, "Sequence line outside a node"));
                }
                let mut bases = line.as_bytes().to_vec();
                bases.make_ascii_uppercase();
                let id = graph.len() as NodeId - 1;
                graph.extend_sequence(id, &bases)?;
            }
        }

        if contigs.is_empty() {
            graph.rebuild_contigs(&contig_of_node)?;
        } else {
            graph.add_contigs(contigs, &contig_of_node)?;
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Reads a graph from a file in the text format.
    ///
    /// The file may be gzip-compressed.
    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let input = utils::open_file(filename)?;
        Self::read(input)
    }

    // Parses `name<TAB>first<TAB>end<TAB>len`.
    fn parse_contig(fields: &str, line: usize) -> Result<Contig> {
        let fields: Vec<&str> = fields.split('\t').collect();
        if fields.len() != 4 || fields[0].is_empty() {
            return Err(Error::graph_format(line, "Contig line must have fields name, first, end, and length"));
        }
        let mut values = [0; 3];
        for (value, field) in values.iter_mut().zip(fields[1..].iter()) {
            *value = field.parse().map_err(|_| Error::graph_format(line, format!("Invalid contig field: {}", field)))?;
        }
        Ok(Contig {
            name: fields[0].to_string(),
            nodes: values[0] as NodeId..values[1] as NodeId,
            len: values[2],
        })
    }

    // Parses `id` or `id<TAB>contig<TAB>start<TAB>allele<TAB>kind`.
    fn parse_header(header: &str, line: usize) -> Result<(NodeId, Option<String>, Option<Annotation>)> {
        let fields: Vec<&str> = header.split('\t').collect();
        let id: NodeId = fields[0].parse().map_err(|_| {
            Error::graph_format(line, format!("Invalid node identifier: {}", fields[0]))
        })?;
        match fields.len() {
            1 => Ok((id, None, None)),
            5 => {
                let start = fields[2].parse().map_err(|_| Error::graph_format(line, format!("Invalid start: {}", fields[2])))?;
                let allele = fields[3].parse().map_err(|_| Error::graph_format(line, format!("Invalid allele: {}", fields[3])))?;
                if allele != REF_ALLELE && allele != ALT_ALLELE {
                    return Err(Error::graph_format(line, format!("Invalid allele: {}", allele)));
                }
                let kind = fields[4].parse().map_err(|err: String| Error::graph_format(line, err))?;
                let contig = if fields[1].as_bytes() == [Self::NO_CONTIG] { None } else { Some(fields[1].to_string()) };
                Ok((id, contig, Some(Annotation::new(allele, start, kind))))
            },
            n => Err(Error::graph_format(line, format!("Node header has {} fields", n))),
        }
    }

    // Parses an edge line and adds the edges.
    fn parse_edges(&mut self, line: &str, line_num: usize) -> Result<()> {
        let mut fields = line.split('\t');
        let from = fields.next().unwrap_or_default();
        let from: NodeId = from.parse().map_err(|_| Error::graph_format(line_num, format!("Invalid node identifier: {}", from)))?;
        if from as usize >= self.len() {
            return Err(Error::graph_format(line_num, format!("Edges for missing node {}", from)));
        }
        while let Some(prob) = fields.next() {
            let dest = fields.next().ok_or_else(|| Error::graph_format(line_num, "Edge weight without a destination"))?;
            let prob: f32 = prob.parse().map_err(|_| Error::graph_format(line_num, format!("Invalid edge weight: {}", prob)))?;
            let dest: NodeId = dest.parse().map_err(|_| Error::graph_format(line_num, format!("Invalid destination: {}", dest)))?;
            if dest as usize >= self.len() {
                return Err(Error::graph_format(line_num, format!("Edge {} -> {} points to a missing node", from, dest)));
            }
            self.add_edge(from, dest, prob)?;
        }
        Ok(())
    }

    // Adds the contigs from the contig lines and checks that the node headers agree with them.
    fn add_contigs(&mut self, contigs: Vec<(usize, Contig)>, contig_of_node: &[Option<String>]) -> Result<()> {
        for (line_num, contig) in contigs {
            self.add_contig(&contig.name, contig.nodes, contig.len).map_err(|err| Error::graph_format(line_num, err.to_string()))?;
        }
        for (id, name) in contig_of_node.iter().enumerate() {
            let Some(name) = name else {
                continue;
            };
            let actual = self.contig_of(id as NodeId).map(|contig| contig.name.as_str());
            if actual != Some(name.as_str()) {
                return Err(Error::Invariant(format!("Node {} is annotated with contig {} but belongs to {:?}", id, name, actual)));
            }
        }
        Ok(())
    }

    // Rebuilds the contig table from runs of nodes with the same contig name.
    fn rebuild_contigs(&mut self, contig_of_node: &[Option<String>]) -> Result<()> {
        let mut start = 0;
        while start < contig_of_node.len() {
            let Some(name) = contig_of_node[start].as_ref() else {
                start += 1;
                continue;
            };
            let mut end = start + 1;
            while end < contig_of_node.len() && contig_of_node[end].as_ref() == Some(name) {
                end += 1;
            }
            let len = self.nodes[start..end].iter().filter_map(|node| {
                node.annotation.as_ref().and_then(|annotation| annotation.reference_end(node.len()))
            }).max().map_or(0, |end| end - 1);
            self.add_contig(name, start as NodeId..end as NodeId, len).map_err(|_| {
                Error::Invariant(format!("Nodes of contig {} are not contiguous", name))
            })?;
            start = end;
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// Exports.
impl Graph {
    /// Writes the node sequences in FASTA format.
    ///
    /// Annotated nodes are named `contig_id_allele_kind_start` and other nodes by their identifiers.
    pub fn write_fasta<T: Write>(&self, output: &mut T) -> io::Result<()> {
        for node in self.nodes.iter() {
            match (node.annotation.as_ref(), self.contig_of(node.id)) {
                (Some(annotation), Some(contig)) => writeln!(
                    output, ">{}_{}_{}_{}_{}", contig.name, node.id, annotation.allele, annotation.kind, annotation.start
                )?,
                _ => writeln!(output, ">{}", node.id)?,
            }
            for line in node.seq.chunks(Self::LINE_WIDTH) {
                output.write_all(line)?;
                output.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Writes the graph in GFA 1.1 format.
    ///
    /// Annotated segments carry rGFA-style tags `SN:Z` (contig), `SO:i` (0-based offset), and `SR:i` (allele).
    /// Edge weights are stored as tag `WT:f` in the links.
    /// Each contig gets a walk through its reference-allele nodes with sample name `ref`.
    pub fn write_gfa<T: Write>(&self, output: &mut T) -> io::Result<()> {
        formats::write_gfa_header(output)?;
        for node in self.nodes.iter() {
            let mut tags = Vec::new();
            if let (Some(annotation), Some(contig)) = (node.annotation.as_ref(), self.contig_of(node.id)) {
                tags.push(TypedField::String([b'S', b'N'], contig.name.as_bytes().to_vec()));
                tags.push(TypedField::Int([b'S', b'O'], annotation.start as isize - 1));
                tags.push(TypedField::Int([b'S', b'R'], annotation.allele as isize));
            }
            formats::write_gfa_segment(node.id as usize, &node.seq, &tags, output)?;
        }
        for (from, to, prob) in self.edges() {
            let tags = [TypedField::Float([b'W', b'T'], prob as f64)];
            formats::write_gfa_link(from as usize, to as usize, &tags, output)?;
        }
        for contig in self.contigs.iter() {
            let path: Vec<usize> = self.reference_nodes(contig).into_iter().map(|id| id as usize).collect();
            formats::write_gfa_walk("ref", &contig.name, contig.len, &path, output)?;
        }
        Ok(())
    }

    /// Returns the reference-allele nodes of the contig in order.
    ///
    /// For a graph built from a reference and variants, the nodes form a path that spells the reference.
    pub fn reference_nodes(&self, contig: &Contig) -> Vec<NodeId> {
        contig.nodes.clone().filter(|&id| {
            self.nodes[id as usize].annotation.map_or(false, |annotation| annotation.allele == REF_ALLELE)
        }).collect()
    }
}

//-----------------------------------------------------------------------------
