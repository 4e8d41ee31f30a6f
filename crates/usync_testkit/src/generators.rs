//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use proptest::prelude::*;
use usync_xml::XElement;
use uuid::Uuid;

/// Strategy for generating item keys.
pub fn key_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating valid aliases.
pub fn alias_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9]{0,23}").expect("Invalid regex")
}

/// Strategy for generating free text values, including XML special characters.
pub fn value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 <>&\"'/.,:;-]{0,40}").expect("Invalid regex")
}

/// Strategy for a directed acyclic graph over `0..size` nodes.
///
/// Every edge `(a, b)` has `a < b`, so the numeric order is always a valid
/// linear extension.
pub fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
    (1..=max_nodes.max(1)).prop_flat_map(|size| {
        let nodes: Vec<usize> = (0..size).collect();
        let edges = prop::collection::vec((0..size, 0..size), 0..size * 2).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect::<Vec<_>>()
        });
        (Just(nodes), edges)
    })
}

/// Strategy for a graph that contains at least one cycle.
pub fn cyclic_graph_strategy(max_nodes: usize) -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
    dag_strategy(max_nodes.max(2))
        .prop_filter("need two nodes", |(nodes, _)| nodes.len() >= 2)
        .prop_flat_map(|(nodes, edges)| {
            let size = nodes.len();
            (Just(nodes), Just(edges), 0..size - 1)
        })
        .prop_map(|(nodes, mut edges, start)| {
            let end = nodes.len() - 1;
            for step in start..end {
                edges.push((step, step + 1));
            }
            edges.push((end, start));
            (nodes, edges)
        })
}

/// Strategy for a flat sync file with a key, alias and a few text children.
pub fn sync_node_strategy(item_type: &'static str) -> impl Strategy<Value = XElement> {
    (
        key_strategy(),
        alias_strategy(),
        prop::collection::btree_map(alias_strategy(), value_strategy(), 0..6),
    )
        .prop_map(move |(key, alias, values)| {
            XElement::new(item_type)
                .with_attr("Key", key.to_string())
                .with_attr("Alias", alias)
                .with_attr("Level", "1")
                .with_child(
                    XElement::new("Info")
                        .with_children(values.into_iter().map(|(name, value)| XElement::text(name, value))),
                )
        })
}
