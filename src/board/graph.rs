//! Undirected adjacency graph.
//!
//! A small set-based graph used for the land graph, the coast-qualified sea
//! graph, and the bare graph derived from both. Vertices are kept in ordered
//! sets so every query returns deterministic results.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

/// Distance reported for vertices that cannot be reached.
pub const UNREACHABLE: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph<V: Ord> {
    adj: BTreeMap<V, BTreeSet<V>>,
}

impl<V: Ord> Default for Graph<V> {
    fn default() -> Self {
        Graph {
            adj: BTreeMap::new(),
        }
    }
}

impl<V: Copy + Ord + Debug> Graph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, v: V) {
        self.adj.entry(v).or_default();
    }

    /// Adds an undirected edge, creating either endpoint if needed.
    pub fn add_edge(&mut self, a: V, b: V) {
        self.adj.entry(a).or_default().insert(b);
        self.adj.entry(b).or_default().insert(a);
    }

    pub fn contains(&self, v: V) -> bool {
        self.adj.contains_key(&v)
    }

    pub fn vertices(&self) -> impl Iterator<Item = V> + '_ {
        self.adj.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// Each undirected edge once, smaller endpoint first.
    pub fn edges(&self) -> impl Iterator<Item = (V, V)> + '_ {
        self.adj
            .iter()
            .flat_map(|(a, ns)| ns.iter().filter(move |b| a < *b).map(move |b| (*a, *b)))
    }

    fn adjacent(&self, v: V) -> &BTreeSet<V> {
        match self.adj.get(&v) {
            Some(ns) => ns,
            None => panic!("{v:?} is not a vertex of this graph"),
        }
    }

    /// Union of the neighbors of every input vertex, minus the inputs.
    ///
    /// Panics if any input is not a vertex.
    pub fn neighbors<I>(&self, vs: I) -> BTreeSet<V>
    where
        I: IntoIterator<Item = V>,
    {
        let inputs: BTreeSet<V> = vs.into_iter().collect();
        let mut out = BTreeSet::new();
        for v in &inputs {
            out.extend(self.adjacent(*v).iter().copied());
        }
        &out - &inputs
    }

    /// Vertices adjacent to every input vertex.
    pub fn shared_neighbors<I>(&self, vs: I) -> BTreeSet<V>
    where
        I: IntoIterator<Item = V>,
    {
        let mut iter = vs.into_iter();
        let Some(first) = iter.next() else {
            return BTreeSet::new();
        };
        let mut out = self.neighbors([first]);
        for v in iter {
            out = &out & &self.neighbors([v]);
        }
        out
    }

    /// Breadth-first hop counts from `from`; unreachable vertices map to
    /// [`UNREACHABLE`].
    pub fn distances(&self, from: V) -> BTreeMap<V, u32> {
        let mut dist: BTreeMap<V, u32> = self.adj.keys().map(|v| (*v, UNREACHABLE)).collect();
        self.adjacent(from);
        dist.insert(from, 0);

        let mut queue = VecDeque::from([from]);
        while let Some(cur) = queue.pop_front() {
            let next = dist[&cur] + 1;
            for n in self.adjacent(cur) {
                let d = dist.get_mut(n).expect("neighbor is a vertex");
                if *d == UNREACHABLE {
                    *d = next;
                    queue.push_back(*n);
                }
            }
        }
        dist
    }

    /// Partitions the vertices into connected components.
    pub fn components(&self) -> Vec<BTreeSet<V>> {
        let mut remaining: BTreeSet<V> = self.adj.keys().copied().collect();
        let mut out = Vec::new();

        while let Some(seed) = remaining.pop_first() {
            let mut component = BTreeSet::from([seed]);
            let mut frontier = self.neighbors([seed]);
            while !frontier.is_empty() {
                remaining = &remaining - &frontier;
                component.extend(frontier.iter().copied());
                frontier = &self.neighbors(component.iter().copied()) - &component;
            }
            out.push(component);
        }
        out
    }

    /// Keeps only the vertices accepted by `keep` and the edges between them.
    pub fn subgraph(&self, keep: impl Fn(V) -> bool) -> Graph<V> {
        let mut out = Graph::new();
        for (v, ns) in &self.adj {
            if !keep(*v) {
                continue;
            }
            out.add_vertex(*v);
            for n in ns.iter().filter(|n| keep(**n)) {
                out.add_edge(*v, *n);
            }
        }
        out
    }
}
