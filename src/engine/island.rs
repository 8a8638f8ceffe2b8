use std::collections::HashMap;

use crate::engine::BodyHandle;

/// A group of dynamic bodies connected through contacts or constraints
#[derive(Debug, Default, Clone)]
pub(crate) struct Island {
    /// The bodies in the island, in the order they were first seen
    pub bodies: Vec<BodyHandle>,
}

/// Builds islands with a union-find over body handles
#[derive(Debug, Default)]
pub(crate) struct IslandBuilder {
    index: HashMap<BodyHandle, usize>,
    handles: Vec<BodyHandle>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl IslandBuilder {
    /// Creates a new empty island builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a body as its own island
    pub fn add_body(&mut self, body: BodyHandle) {
        self.slot(body);
    }

    /// Joins the islands of two bodies
    pub fn add_connection(&mut self, a: BodyHandle, b: BodyHandle) {
        let a = self.slot(a);
        let b = self.slot(b);
        self.union(a, b);
    }

    /// Consumes the builder and returns the islands
    pub fn build(mut self) -> Vec<Island> {
        let mut islands: Vec<Island> = Vec::new();
        let mut root_to_island: HashMap<usize, usize> = HashMap::new();

        for i in 0..self.handles.len() {
            let root = self.find(i);
            let idx = *root_to_island.entry(root).or_insert_with(|| {
                islands.push(Island::default());
                islands.len() - 1
            });
            islands[idx].bodies.push(self.handles[i]);
        }

        islands
    }

    fn slot(&mut self, body: BodyHandle) -> usize {
        if let Some(&i) = self.index.get(&body) {
            return i;
        }

        let i = self.handles.len();
        self.index.insert(body, i);
        self.handles.push(body);
        self.parent.push(i);
        self.rank.push(0);
        i
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            // Path halving
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }

        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_bodies_share_an_island() {
        let h: Vec<BodyHandle> = (0..5).map(|_| BodyHandle::next()).collect();

        let mut builder = IslandBuilder::new();
        for &b in &h {
            builder.add_body(b);
        }
        builder.add_connection(h[0], h[1]);
        builder.add_connection(h[2], h[1]);
        builder.add_connection(h[3], h[4]);

        let islands = builder.build();
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0].bodies, vec![h[0], h[1], h[2]]);
        assert_eq!(islands[1].bodies, vec![h[3], h[4]]);
    }
}
