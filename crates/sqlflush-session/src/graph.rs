//! Dependency graph with topological sorting.

use sqlflush_core::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Directed graph where an edge `from -> to` means `from` must come after
/// `to`.
///
/// Vertices keep their insertion order, which makes sorting deterministic.
#[derive(Debug, Clone)]
pub struct DbRowOpGraph<V> {
    vertices: Vec<V>,
    index: HashMap<V, usize>,
    edges: Vec<Vec<usize>>,
}

impl<V> Default for DbRowOpGraph<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
        }
    }
}

impl<V: Eq + Hash + Clone + Debug> DbRowOpGraph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex if missing and return its position.
    pub fn add_vertex(&mut self, vertex: V) -> usize {
        if let Some(&i) = self.index.get(&vertex) {
            return i;
        }
        let i = self.vertices.len();
        self.index.insert(vertex.clone(), i);
        self.vertices.push(vertex);
        self.edges.push(Vec::new());
        i
    }

    /// Record that `from` depends on `to`.
    pub fn add(&mut self, from: V, to: V) {
        let from = self.add_vertex(from);
        let to = self.add_vertex(to);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, vertex: &V) -> bool {
        self.index.contains_key(vertex)
    }

    /// Vertices `vertex` depends on, in edge insertion order.
    pub fn successors(&self, vertex: &V) -> impl Iterator<Item = &V> {
        self.index
            .get(vertex)
            .map(|&i| self.edges[i].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&j| &self.vertices[j])
    }

    /// Order vertices so every vertex comes after the vertices it depends on.
    pub fn top_sort(&self) -> Result<Vec<V>> {
        self.try_sort().map_err(|remaining| {
            Error::cycle(remaining.iter().map(|v| format!("{v:?}")).collect())
        })
    }

    /// Like [`DbRowOpGraph::top_sort`], but a cycle yields the vertices that
    /// could not be ordered.
    pub(crate) fn try_sort(&self) -> std::result::Result<Vec<V>, Vec<V>> {
        let n = self.vertices.len();
        // pending[i] counts unsorted dependencies of i
        let mut pending: Vec<usize> = self.edges.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); n];
        for (from, targets) in self.edges.iter().enumerate() {
            for &to in targets {
                dependents[to].push(from);
            }
        }

        // insertion order among independent vertices is kept
        let mut ready: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            for &from in &dependents[i] {
                pending[from] -= 1;
                if pending[from] == 0 {
                    ready.push_back(from);
                }
            }
        }

        if order.len() < n {
            let remaining: Vec<V> = (0..n)
                .filter(|&i| pending[i] > 0)
                .map(|i| self.vertices[i].clone())
                .collect();
            tracing::debug!(
                vertices = n,
                unsorted = remaining.len(),
                "Dependency cycle detected"
            );
            return Err(remaining);
        }
        Ok(order.into_iter().map(|i| self.vertices[i].clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_comes_first() {
        let mut graph = DbRowOpGraph::new();
        graph.add("A", "B");
        assert_eq!(graph.top_sort().unwrap(), vec!["B", "A"]);
    }

    #[test]
    fn test_chain() {
        let mut graph = DbRowOpGraph::new();
        graph.add("painting", "artist");
        graph.add("exhibit", "painting");
        graph.add("artist", "gallery");
        assert_eq!(
            graph.top_sort().unwrap(),
            vec!["gallery", "artist", "painting", "exhibit"]
        );
    }

    #[test]
    fn test_cycle_names_remaining_vertices() {
        let mut graph = DbRowOpGraph::new();
        graph.add_vertex("free");
        graph.add("A", "B");
        graph.add("B", "A");
        let err = graph.top_sort().unwrap_err();
        assert!(err.is_cycle());
        let message = err.to_string();
        assert!(message.contains("\"A\""));
        assert!(message.contains("\"B\""));
        assert!(!message.contains("free"));
    }

    #[test]
    fn test_duplicate_edges_and_vertices() {
        let mut graph = DbRowOpGraph::new();
        assert_eq!(graph.add_vertex(1), 0);
        assert_eq!(graph.add_vertex(1), 0);
        graph.add(2, 1);
        graph.add(2, 1);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.successors(&2).collect::<Vec<_>>(), vec![&1]);
        assert_eq!(graph.successors(&3).count(), 0);
        assert!(graph.contains(&2));
        assert_eq!(graph.top_sort().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_independent_vertices_keep_insertion_order() {
        let mut graph = DbRowOpGraph::new();
        graph.add_vertex("x");
        graph.add_vertex("y");
        graph.add("z", "y");
        graph.add_vertex("w");
        assert_eq!(graph.top_sort().unwrap(), vec!["x", "y", "w", "z"]);
    }

    #[test]
    fn test_empty_graph() {
        let graph: DbRowOpGraph<String> = DbRowOpGraph::new();
        assert!(graph.is_empty());
        assert!(graph.top_sort().unwrap().is_empty());
    }
}
