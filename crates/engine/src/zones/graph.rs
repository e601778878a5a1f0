use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::definition::ZoneId;

/// Adjacency between zones. Edges are only ever added.
#[derive(Debug, Clone, Default)]
pub struct ZoneGraph {
    edges: BTreeMap<ZoneId, BTreeSet<ZoneId>>,
}

impl ZoneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if at least one new edge was recorded.
    pub fn add_connection(&mut self, from: &ZoneId, to: &ZoneId, bidirectional: bool) -> bool {
        if from == to {
            return false;
        }
        let mut added = self
            .edges
            .entry(from.clone())
            .or_default()
            .insert(to.clone());
        if bidirectional {
            added |= self
                .edges
                .entry(to.clone())
                .or_default()
                .insert(from.clone());
        }
        added
    }

    pub fn connections(&self, zone: &ZoneId) -> impl Iterator<Item = &ZoneId> {
        self.edges.get(zone).into_iter().flat_map(|set| set.iter())
    }

    pub fn is_connected(&self, from: &ZoneId, to: &ZoneId) -> bool {
        self.edges.get(from).is_some_and(|set| set.contains(to))
    }

    /// Either direction counts; used by eviction to protect the neighborhood
    /// of the zone being loaded.
    pub fn is_adjacent(&self, a: &ZoneId, b: &ZoneId) -> bool {
        self.is_connected(a, b) || self.is_connected(b, a)
    }

    /// Zones reachable from `origin` in `1..=max_hops` outgoing edges, nearest
    /// first, ties in id order.
    pub fn neighbors_within(&self, origin: &ZoneId, max_hops: u32) -> Vec<ZoneId> {
        let mut visited = BTreeSet::from([origin.clone()]);
        let mut frontier = VecDeque::from([(origin.clone(), 0u32)]);
        let mut found = Vec::new();

        while let Some((zone, depth)) = frontier.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for next in self.connections(&zone) {
                if visited.insert(next.clone()) {
                    found.push(next.clone());
                    frontier.push_back((next.clone(), depth + 1));
                }
            }
        }
        found
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}
