//! Extending seeds through the graph.
//!
//! An extension starts next to a seed and walks the graph to the right (along outgoing edges) or to the left (along incoming edges).
//! The walk is a depth-first search that concatenates node sequences until it reaches a node without further edges or the concatenated sequence reaches the budget.
//! At that point the concatenated sequence is aligned with the unaligned end of the query using a one-sided local alignment.
//! Every branch is explored without memoization, and the caller gets the best branch.
//! When several branches have the same score, the first one in edge order wins.
//!
//! Left extensions work on reversed sequences and reverse the resulting CIGAR, so the results are always in forward order.

use crate::align::{right_local, Workspace};
use crate::cigar::Cigar;
use crate::graph::{Graph, NodeId};
use crate::scoring::Scoring;


//-----------------------------------------------------------------------------

/// Result of a graph extension.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extension {
    /// Alignment score. Never negative.
    pub score: i64,
    /// Alignment operations in forward order.
    pub cigar: Cigar,
    /// Nodes used by the alignment beyond the starting node, in path order.
    pub nodes: Vec<NodeId>,
    /// Offset where the aligned region stops.
    ///
    /// For right extensions, this is the past-the-end offset in the last node of the path.
    /// For left extensions, this is the starting offset in the first node of the path.
    /// If `nodes` is empty, the offset is in the starting node.
    pub offset: usize,
    /// Number of aligned query bases.
    pub query_len: usize,
    /// Number of aligned target bases.
    pub target_len: usize,
}

/// Extends an alignment to the right of `node[offset]`.
///
/// The query is the unaligned suffix of the read.
/// The search stops descending once the concatenated graph sequence is at least `budget` bases long.
///
/// # Examples
///
/// ```
/// use gengraph::{extend_right, Graph, Scoring, Workspace};
///
/// let mut graph = Graph::new();
/// let a = graph.add_node(b"GATTACA".to_vec(), None);
/// let b = graph.add_node(b"TTT".to_vec(), None);
/// let c = graph.add_node(b"CCC".to_vec(), None);
/// graph.add_edge(a, b, 0.5).unwrap();
/// graph.add_edge(a, c, 0.5).unwrap();
///
/// let scoring = Scoring::default();
/// let mut workspace = Workspace::new();
/// let extension = extend_right(&graph, a, 4, b"ACACC", 10, &scoring, &mut workspace);
/// assert_eq!(extension.nodes, vec![c]);
/// assert_eq!(extension.offset, 2);
/// assert_eq!(extension.query_len, 5);
/// ```
pub fn extend_right(
    graph: &Graph, node: NodeId, offset: usize, query: &[u8], budget: usize,
    scoring: &Scoring, workspace: &mut Workspace
) -> Extension {
    extend(graph, node, offset, query, budget, scoring, workspace, Direction::Forward)
}

/// Extends an alignment to the left of `node[offset]`.
///
/// The query is the unaligned prefix of the read.
/// The search stops descending once the concatenated graph sequence is at least `budget` bases long.
pub fn extend_left(
    graph: &Graph, node: NodeId, offset: usize, query: &[u8], budget: usize,
    scoring: &Scoring, workspace: &mut Workspace
) -> Extension {
    extend(graph, node, offset, query, budget, scoring, workspace, Direction::Backward)
}

//-----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// A node visited by the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    node: NodeId,
    // Forward: first used offset in the node. Backward: past-the-end offset in the node.
    node_offset: usize,
    // Offset of the segment in the concatenated sequence.
    seq_start: usize,
}

/// Best branch found so far.
#[derive(Clone, Debug, Default)]
struct Candidate {
    score: i64,
    cigar: Cigar,
    target_len: usize,
    query_len: usize,
    segments: Vec<Segment>,
}

struct Search<'a> {
    graph: &'a Graph,
    query: Vec<u8>,
    budget: usize,
    scoring: &'a Scoring,
    direction: Direction,
    sequence: Vec<u8>,
    segments: Vec<Segment>,
}

#[allow(clippy::too_many_arguments)]
fn extend(
    graph: &Graph, node: NodeId, offset: usize, query: &[u8], budget: usize,
    scoring: &Scoring, workspace: &mut Workspace, direction: Direction
) -> Extension {
    let mut result = Extension { offset, ..Extension::default() };
    let start = match graph.node(node) {
        Some(start) => start,
        None => return result,
    };
    if query.is_empty() {
        return result;
    }

    let offset = offset.min(start.len());
    let (query, sequence) = match direction {
        Direction::Forward => (query.to_vec(), start.seq()[offset..].to_vec()),
        Direction::Backward => (
            query.iter().rev().copied().collect(),
            start.seq()[..offset].iter().rev().copied().collect(),
        ),
    };
    let mut search = Search {
        graph, query, budget, scoring, direction, sequence,
        segments: vec![Segment { node, node_offset: offset, seq_start: 0 }],
    };
    let best = search.descend(node, workspace);

    // The last segment that contributes at least one target base.
    let used = best.segments.iter().rposition(|segment| segment.seq_start < best.target_len).unwrap_or(0);
    if best.target_len > 0 {
        let last = best.segments[used];
        let consumed = best.target_len - last.seq_start;
        result.offset = match direction {
            Direction::Forward => last.node_offset + consumed,
            Direction::Backward => last.node_offset - consumed,
        };
        result.nodes = best.segments[1..=used].iter().map(|segment| segment.node).collect();
        if direction == Direction::Backward {
            result.nodes.reverse();
        }
    }

    result.score = best.score;
    result.cigar = best.cigar;
    if direction == Direction::Backward {
        result.cigar.reverse();
    }
    result.query_len = best.query_len;
    result.target_len = best.target_len;
    result
}

impl<'a> Search<'a> {
    fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        match self.graph.node(node) {
            Some(node) => {
                let edges = match self.direction {
                    Direction::Forward => node.next(),
                    Direction::Backward => node.prev(),
                };
                edges.iter().map(|edge| edge.dest).collect()
            },
            None => Vec::new(),
        }
    }

    fn descend(&mut self, node: NodeId, workspace: &mut Workspace) -> Candidate {
        let neighbors = self.neighbors(node);
        if neighbors.is_empty() || self.sequence.len() >= self.budget {
            return self.align_leaf(workspace);
        }

        let graph = self.graph;
        let mut best: Option<Candidate> = None;
        for next in neighbors {
            let seq = match graph.node(next) {
                Some(next) => next.seq(),
                None => continue,
            };
            let restore = self.sequence.len();
            match self.direction {
                Direction::Forward => self.sequence.extend_from_slice(seq),
                Direction::Backward => self.sequence.extend(seq.iter().rev()),
            }
            let node_offset = match self.direction {
                Direction::Forward => 0,
                Direction::Backward => seq.len(),
            };
            self.segments.push(Segment { node: next, node_offset, seq_start: restore });
            let candidate = self.descend(next, workspace);
            self.segments.pop();
            self.sequence.truncate(restore);
            if best.as_ref().map_or(true, |best| candidate.score > best.score) {
                best = Some(candidate);
            }
        }

        match best {
            Some(best) => best,
            None => self.align_leaf(workspace),
        }
    }

    fn align_leaf(&self, workspace: &mut Workspace) -> Candidate {
        let len = self.sequence.len().min(self.budget);
        let alignment = right_local(&self.sequence[..len], &self.query, self.scoring, workspace);
        Candidate {
            score: alignment.score,
            cigar: alignment.cigar,
            target_len: alignment.target_len,
            query_len: alignment.query_len,
            segments: self.segments.clone(),
        }
    }
}

//-----------------------------------------------------------------------------
