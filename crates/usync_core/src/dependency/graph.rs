//! Topological ordering of a directed graph.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

/// Orders `nodes` so that for every edge `(a, b)`, `a` comes before `b`.
///
/// Uses Kahn's algorithm. Nodes that are ready at the same time keep their
/// input order, so the result is deterministic. Duplicate nodes and edges are
/// ignored, as are edges that mention a node not in `nodes`.
///
/// Returns `None` if the graph has a cycle, including a self loop.
pub fn topological_sort<T>(nodes: &[T], edges: &[(T, T)]) -> Option<Vec<T>>
where
    T: Clone + Eq + Hash,
{
    let mut index: HashMap<&T, usize> = HashMap::with_capacity(nodes.len());
    let mut unique: Vec<&T> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !index.contains_key(node) {
            index.insert(node, unique.len());
            unique.push(node);
        }
    }

    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); unique.len()];
    let mut in_degree = vec![0usize; unique.len()];

    for (from, to) in edges {
        let (Some(&from), Some(&to)) = (index.get(from), index.get(to)) else {
            continue;
        };
        if seen.insert((from, to)) {
            outgoing[from].push(to);
            in_degree[to] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..unique.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(unique.len());

    while let Some(current) = queue.pop_front() {
        sorted.push(unique[current].clone());
        for &next in &outgoing[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if sorted.len() == unique.len() {
        Some(sorted)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn position<T: PartialEq>(items: &[T], item: &T) -> usize {
        items.iter().position(|i| i == item).unwrap()
    }

    #[test]
    fn cycle_returns_none() {
        let nodes: Vec<i32> = (1..=10).collect();
        let edges = [(2, 4), (4, 7), (5, 8), (6, 9), (7, 2)];
        assert_eq!(topological_sort(&nodes, &edges), None);
    }

    #[test]
    fn dag_is_ordered() {
        let nodes: Vec<i32> = (1..=10).collect();
        let edges = [(2, 4), (4, 7), (5, 8), (6, 9), (9, 1)];
        let sorted = topological_sort(&nodes, &edges).unwrap();

        assert_eq!(sorted.len(), 10);
        for (a, b) in edges {
            assert!(position(&sorted, &a) < position(&sorted, &b));
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        assert_eq!(topological_sort(&["a", "b"], &[("a", "a")]), None);
    }

    #[test]
    fn duplicate_edges_and_nodes() {
        let sorted = topological_sort(&["b", "a", "b"], &[("a", "b"), ("a", "b")]).unwrap();
        assert_eq!(sorted, vec!["a", "b"]);
    }

    #[test]
    fn unknown_nodes_are_ignored() {
        let sorted = topological_sort(&["a", "b"], &[("z", "a"), ("b", "a")]).unwrap();
        assert_eq!(sorted, vec!["b", "a"]);
    }

    #[test]
    fn independent_nodes_keep_input_order() {
        assert_eq!(
            topological_sort(&[3, 1, 2], &[]).unwrap(),
            vec![3, 1, 2]
        );
    }

    proptest! {
        #[test]
        fn forward_edges_give_linear_extension(
            size in 1usize..30,
            raw_edges in proptest::collection::vec((0usize..30, 0usize..30), 0..60),
        ) {
            // Edges always point from a lower to a higher number, so the graph is acyclic.
            let nodes: Vec<usize> = (0..size).rev().collect();
            let edges: Vec<(usize, usize)> = raw_edges
                .into_iter()
                .filter(|(a, b)| a < b && *b < size)
                .collect();

            let sorted = topological_sort(&nodes, &edges).unwrap();
            prop_assert_eq!(sorted.len(), size);
            for (a, b) in &edges {
                prop_assert!(position(&sorted, a) < position(&sorted, b));
            }
        }

        #[test]
        fn back_edge_is_detected(size in 2usize..20) {
            let nodes: Vec<usize> = (0..size).collect();
            let mut edges: Vec<(usize, usize)> = (0..size - 1).map(|i| (i, i + 1)).collect();
            edges.push((size - 1, 0));
            prop_assert!(topological_sort(&nodes, &edges).is_none());
        }
    }
}
