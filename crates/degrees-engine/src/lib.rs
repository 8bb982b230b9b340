pub mod topology {
    use crate::error::{Result, SearchError};
    use crate::oracle::NodeId;
    use serde::{Deserialize, Serialize};
    use std::collections::{HashMap, HashSet, VecDeque};

    /// Undirected, unweighted graph grown one co-occurrence group at a time.
    /// Node ids are interned to dense indices; edges live in an adjacency list.
    #[derive(Debug, Clone, Default)]
    pub struct GraphTopology {
        ids: Vec<NodeId>,
        index: HashMap<NodeId, u32>,
        /// Adjacency list: node index -> neighbor indices, in insertion order.
        adj: Vec<Vec<u32>>,
        /// Each undirected edge once, as (low, high).
        edges: HashSet<(u32, u32)>,
    }

    impl GraphTopology {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn num_nodes(&self) -> usize {
            self.ids.len()
        }

        pub fn num_edges(&self) -> usize {
            self.edges.len()
        }

        pub fn contains(&self, id: &NodeId) -> bool {
            self.index.contains_key(id)
        }

        /// Nodes in insertion order.
        pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
            self.ids.iter()
        }

        pub fn neighbors<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
            self.index
                .get(id)
                .and_then(|&i| self.adj.get(i as usize))
                .into_iter()
                .flatten()
                .map(move |&n| &self.ids[n as usize])
        }

        pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
            self.adj.iter().enumerate().flat_map(move |(i, neighbors)| {
                neighbors
                    .iter()
                    .filter(move |&&n| (i as u32) < n)
                    .map(move |&n| (&self.ids[i], &self.ids[n as usize]))
            })
        }

        /// Idempotent; returns the node's dense index.
        pub fn add_node(&mut self, id: &NodeId) -> u32 {
            if let Some(&i) = self.index.get(id) {
                return i;
            }
            let i = self.ids.len() as u32;
            self.ids.push(id.clone());
            self.index.insert(id.clone(), i);
            self.adj.push(Vec::new());
            i
        }

        /// Adds both endpoints if needed. Existing edges and self-loops are
        /// ignored; returns whether a new edge was inserted.
        pub fn add_edge(&mut self, a: &NodeId, b: &NodeId) -> bool {
            let (a, b) = (self.add_node(a), self.add_node(b));
            if a == b {
                return false;
            }
            if !self.edges.insert((a.min(b), a.max(b))) {
                return false;
            }
            self.adj[a as usize].push(b);
            self.adj[b as usize].push(a);
            true
        }

        /// Connect every pair in `ids`. A group of one only adds the node.
        pub fn add_clique(&mut self, ids: &[NodeId]) -> usize {
            for id in ids {
                self.add_node(id);
            }
            let mut added = 0;
            for (i, a) in ids.iter().enumerate() {
                for b in &ids[i + 1..] {
                    if self.add_edge(a, b) {
                        added += 1;
                    }
                }
            }
            added
        }

        pub fn connected(&self, a: &NodeId, b: &NodeId) -> bool {
            self.bfs(a, b).is_some()
        }

        /// Breadth-first shortest path; `NoPath` when disconnected or either
        /// endpoint is missing.
        pub fn shortest_path(&self, a: &NodeId, b: &NodeId) -> Result<Path> {
            self.bfs(a, b).ok_or_else(|| SearchError::NoPath {
                source_id: a.to_string(),
                target_id: b.to_string(),
            })
        }

        /// Present nodes not in `visited`, in insertion order.
        pub fn unvisited_nodes(&self, visited: &HashSet<NodeId>) -> Vec<NodeId> {
            self.ids
                .iter()
                .filter(|id| !visited.contains(*id))
                .cloned()
                .collect()
        }

        fn bfs(&self, a: &NodeId, b: &NodeId) -> Option<Path> {
            let start = *self.index.get(a)?;
            let goal = *self.index.get(b)?;

            let mut parent: Vec<Option<u32>> = vec![None; self.ids.len()];
            let mut seen = vec![false; self.ids.len()];
            let mut queue = VecDeque::new();
            seen[start as usize] = true;
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                if current == goal {
                    let mut path = vec![self.ids[goal as usize].clone()];
                    let mut cursor = current;
                    while let Some(prev) = parent[cursor as usize] {
                        path.push(self.ids[prev as usize].clone());
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(Path(path));
                }
                for &next in &self.adj[current as usize] {
                    if !seen[next as usize] {
                        seen[next as usize] = true;
                        parent[next as usize] = Some(current);
                        queue.push_back(next);
                    }
                }
            }
            None
        }
    }

    /// Source-to-target node sequence; `len() == edges + 1`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Path(pub Vec<NodeId>);

    impl Path {
        pub fn nodes(&self) -> &[NodeId] {
            &self.0
        }

        pub fn len(&self) -> usize {
            self.0.len()
        }

        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }

        /// Degrees of separation, i.e. the number of edges.
        pub fn degrees(&self) -> usize {
            self.0.len().saturating_sub(1)
        }

        pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> + '_ {
            self.0.iter().zip(self.0.iter().skip(1))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn ids(names: &[&str]) -> Vec<NodeId> {
            names.iter().map(|n| NodeId::from(*n)).collect()
        }

        #[test]
        fn clique_insertion_is_idempotent() {
            let mut once = GraphTopology::new();
            once.add_clique(&ids(&["a", "b", "c"]));

            let mut twice = GraphTopology::new();
            twice.add_clique(&ids(&["a", "b", "c"]));
            assert_eq!(twice.add_clique(&ids(&["a", "b", "c"])), 0);

            assert_eq!(once.num_nodes(), twice.num_nodes());
            assert_eq!(once.num_edges(), 3);
            assert_eq!(twice.num_edges(), 3);
        }

        #[test]
        fn singleton_group_adds_no_edges() {
            let mut g = GraphTopology::new();
            g.add_clique(&ids(&["x"]));
            assert_eq!(g.num_nodes(), 1);
            assert_eq!(g.num_edges(), 0);

            g.add_clique(&ids(&["x", "x"]));
            assert_eq!(g.num_edges(), 0);
        }

        #[test]
        fn bfs_prefers_fewer_edges() {
            let mut g = GraphTopology::new();
            let [a, b, c, d, e]: [NodeId; 5] = ["A", "B", "C", "D", "E"].map(NodeId::from);
            g.add_edge(&a, &b);
            g.add_edge(&b, &c);
            g.add_edge(&c, &d);
            g.add_edge(&a, &e);
            g.add_edge(&e, &d);

            let path = g.shortest_path(&a, &d).unwrap();
            assert_eq!(path.nodes(), &[a.clone(), e, d.clone()]);
            assert_eq!(path.degrees(), 2);
            assert_eq!(path.edges().count(), 2);
        }

        #[test]
        fn disconnected_is_no_path() {
            let mut g = GraphTopology::new();
            g.add_clique(&ids(&["a", "b"]));
            g.add_clique(&ids(&["c", "d"]));
            assert!(!g.connected(&"a".into(), &"d".into()));
            assert!(matches!(
                g.shortest_path(&"a".into(), &"d".into()),
                Err(SearchError::NoPath { .. })
            ));
            assert!(g.shortest_path(&"a".into(), &"zzz".into()).is_err());
        }

        #[test]
        fn path_to_self_has_zero_degrees() {
            let mut g = GraphTopology::new();
            g.add_node(&"a".into());
            let path = g.shortest_path(&"a".into(), &"a".into()).unwrap();
            assert_eq!(path.len(), 1);
            assert_eq!(path.degrees(), 0);
        }

        #[test]
        fn unvisited_excludes_visited() {
            let mut g = GraphTopology::new();
            g.add_clique(&ids(&["a", "b", "c"]));
            let visited: HashSet<NodeId> = ids(&["b"]).into_iter().collect();
            assert_eq!(g.unvisited_nodes(&visited), ids(&["a", "c"]));
            assert_eq!(g.edges().count(), 3);
            assert_eq!(g.neighbors(&"a".into()).count(), 2);
        }
    }
}

pub mod client;
pub mod config;
pub mod error;
pub mod expansion;
pub mod oracle;
pub mod persistence;
pub mod report;
pub mod search;

pub use error::{OracleError, SearchError};
pub use oracle::NodeId;
pub use topology::{GraphTopology, Path};
