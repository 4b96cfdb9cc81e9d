//! Exact-match seeds between a query and the node sequences of a graph.
//!
//! [`KmerIndex`] stores the positions of the k-mers of every node, sampled at a fixed step.
//! Seeds are found by looking up every k-mer of the query.
//! Each hit is then extended to a maximal exact match within the node and chained to the right across the edges of the graph.
//! A hit that falls on a diagonal already covered by an earlier seed is skipped.
//!
//! With step size `s`, every exact match of length at least `k + s - 1` contained in a single node is found.

use crate::dna;
use crate::graph::{Graph, NodeId};
use crate::{Error, Result};

use gbwt::Orientation;
use rustc_hash::FxHashMap;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// A part of a seed contained in a single node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedPart {
    /// Node identifier.
    pub node: NodeId,
    /// Offset of the first matching base in the node.
    pub target_start: usize,
    /// Offset of the first matching base in the oriented query.
    pub query_start: usize,
    /// Length of the match.
    pub len: usize,
}

impl SeedPart {
    /// Returns the past-the-end offset in the node.
    #[inline]
    pub fn target_end(&self) -> usize {
        self.target_start + self.len
    }

    /// Returns the past-the-end offset in the query.
    #[inline]
    pub fn query_end(&self) -> usize {
        self.query_start + self.len
    }
}

/// An exact match between the query and a path in the graph.
///
/// Consecutive parts are in consecutive query positions, and the nodes of consecutive parts are connected by edges.
/// All parts except the last end at the end of the node, and all parts except the first start at offset 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seed {
    /// Orientation of the query.
    pub orientation: Orientation,
    /// Parts of the match in path order.
    pub parts: Vec<SeedPart>,
    /// Total length of the match.
    pub total_len: usize,
}

impl Seed {
    /// Returns the offset of the first matching base in the oriented query.
    pub fn query_start(&self) -> usize {
        self.parts.first().map_or(0, |part| part.query_start)
    }

    /// Returns the past-the-end offset in the oriented query.
    pub fn query_end(&self) -> usize {
        self.query_start() + self.total_len
    }

    /// Returns the nodes visited by the seed.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.parts.iter().map(|part| part.node).collect()
    }
}

//-----------------------------------------------------------------------------

/// An index of the k-mers in node sequences.
///
/// The index maps 2-bit encoded k-mers to `(node, offset)` occurrences.
/// K-mers containing symbols other than `ACGT` are not indexed, and k-mers never cross node boundaries.
///
/// # Examples
///
/// ```
/// use gengraph::{Graph, KmerIndex};
/// use gbwt::Orientation;
///
/// let mut graph = Graph::new();
/// let node = graph.add_node(b"GATTACAGATTACA".to_vec(), None);
/// let index = KmerIndex::new(&graph, 4, 1).unwrap();
/// assert_eq!(index.occurrences(b"GATT"), &[(node, 0), (node, 7)]);
///
/// let seeds = index.find_seeds(&graph, b"TTACAG", Orientation::Forward);
/// assert_eq!(seeds.len(), 2);
/// assert_eq!(seeds[0].total_len, 6);
/// ```
#[derive(Clone, Debug)]
pub struct KmerIndex {
    k: usize,
    step: usize,
    len: usize,
    index: FxHashMap<u64, Vec<(NodeId, u32)>>,
}

impl KmerIndex {
    /// Largest supported k-mer length.
    pub const MAX_K: usize = 32;

    /// Builds an index of the k-mers starting at node offsets divisible by `step`.
    ///
    /// Returns an error if `k` is not in `1..=32` or `step` is 0.
    pub fn new(graph: &Graph, k: usize, step: usize) -> Result<Self> {
        if k == 0 || k > Self::MAX_K {
            return Err(Error::Config(format!("K-mer length must be between 1 and {}, got {}", Self::MAX_K, k)));
        }
        if step == 0 {
            return Err(Error::Config(String::from("Step size must be positive")));
        }

        let mut index: FxHashMap<u64, Vec<(NodeId, u32)>> = FxHashMap::default();
        let mut len = 0;
        for node in graph.nodes() {
            for (offset, code) in Kmers::new(node.seq(), k) {
                if offset % step == 0 {
                    index.entry(code).or_default().push((node.id(), offset as u32));
                    len += 1;
                }
            }
        }

        Ok(KmerIndex { k, step, len, index })
    }

    /// Returns the k-mer length.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the step size.
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Returns the number of indexed occurrences.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of distinct k-mers.
    pub fn distinct_kmers(&self) -> usize {
        self.index.len()
    }

    /// Returns the occurrences of the k-mer.
    ///
    /// Returns an empty slice if the k-mer has the wrong length, contains other symbols than `ACGT`, or does not occur in the graph.
    pub fn occurrences(&self, kmer: &[u8]) -> &[(NodeId, u32)] {
        if kmer.len() != self.k {
            return &[];
        }
        match Kmers::new(kmer, self.k).next() {
            Some((_, code)) => self.index.get(&code).map_or(&[][..], |hits| hits.as_slice()),
            None => &[][..],
        }
    }

    /// Finds the seeds for the query, which is assumed to be in the given orientation.
    ///
    /// Seeds are returned in the order of their first hit in the query.
    pub fn find_seeds(&self, graph: &Graph, query: &[u8], orientation: Orientation) -> Vec<Seed> {
        let mut result = Vec::new();
        if query.len() < self.k {
            return result;
        }

        // (node, target offset - query offset) -> past-the-end query offset of the last seed on the diagonal.
        let mut covered: FxHashMap<(NodeId, isize), usize> = FxHashMap::default();
        for (query_offset, code) in Kmers::new(query, self.k) {
            let hits = match self.index.get(&code) {
                Some(hits) => hits,
                None => continue,
            };
            for &(node_id, target_offset) in hits.iter() {
                let target_offset = target_offset as usize;
                let diagonal = target_offset as isize - query_offset as isize;
                if covered.get(&(node_id, diagonal)).map_or(false, |&end| query_offset < end) {
                    continue;
                }
                let seed = self.extend_hit(graph, query, node_id, target_offset, query_offset, orientation);
                for part in seed.parts.iter() {
                    let diagonal = part.target_start as isize - part.query_start as isize;
                    covered.insert((part.node, diagonal), part.query_end());
                }
                result.push(seed);
            }
        }

        result
    }

    // Extends the hit to a maximal match in the node and chains it across edges to the right.
    fn extend_hit(&self, graph: &Graph, query: &[u8], node_id: NodeId, target_offset: usize, query_offset: usize, orientation: Orientation) -> Seed {
        let seq = graph.node(node_id).map_or(&[][..], |node| node.seq());
        let (mut target_start, mut query_start) = (target_offset, query_offset);
        while target_start > 0 && query_start > 0 && same_base(seq[target_start - 1], query[query_start - 1]) {
            target_start -= 1;
            query_start -= 1;
        }
        let len = self.k + common_prefix(&seq[target_offset + self.k..], &query[query_offset + self.k..]);
        let mut parts = vec![SeedPart {
            node: node_id,
            target_start,
            query_start,
            len: len + (query_offset - query_start),
        }];

        loop {
            let last = parts[parts.len() - 1];
            let node = match graph.node(last.node) {
                Some(node) => node,
                None => break,
            };
            if last.target_end() < node.len() || last.query_end() >= query.len() {
                break;
            }
            let rest = &query[last.query_end()..];
            let mut best: Option<(NodeId, usize)> = None;
            for edge in node.next() {
                let successor = graph.node(edge.dest).map_or(&[][..], |next| next.seq());
                let len = common_prefix(successor, rest);
                if len > 0 && best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((edge.dest, len));
                }
            }
            match best {
                Some((next, len)) => parts.push(SeedPart { node: next, target_start: 0, query_start: last.query_end(), len }),
                None => break,
            }
        }

        let total_len = parts.iter().map(|part| part.len).sum();
        Seed { orientation, parts, total_len }
    }
}

//-----------------------------------------------------------------------------

#[inline]
fn same_base(a: u8, b: u8) -> bool {
    dna::is_acgt(a) && dna::base_index(a) == dna::base_index(b)
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(&x, &y)| same_base(x, y)).count()
}

/// An iterator over the `(offset, encoding)` pairs of the valid k-mers in a sequence.
struct Kmers<'a> {
    seq: &'a [u8],
    k: usize,
    mask: u64,
    offset: usize,
    valid: usize,
    code: u64,
}

impl<'a> Kmers<'a> {
    fn new(seq: &'a [u8], k: usize) -> Self {
        let mask = if k >= 32 { u64::MAX } else { (1u64 << (2 * k)) - 1 };
        Kmers { seq, k, mask, offset: 0, valid: 0, code: 0 }
    }
}

impl<'a> Iterator for Kmers<'a> {
    type Item = (usize, u64);

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.seq.len() {
            let base = self.seq[self.offset];
            self.offset += 1;
            if !dna::is_acgt(base) {
                self.valid = 0;
                self.code = 0;
                continue;
            }
            self.code = ((self.code << 2) | dna::base_index(base) as u64) & self.mask;
            self.valid += 1;
            if self.valid >= self.k {
                return Some((self.offset - self.k, self.code));
            }
        }
        None
    }
}

//-----------------------------------------------------------------------------
