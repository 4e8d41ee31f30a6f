//! Benchmark utilities.

use usync_core::entity::{ContentType, ContentTypeKind, PropertyType};
use usync_xml::XElement;
use uuid::Uuid;

/// A document type with `properties` generic properties.
pub fn content_type(properties: usize) -> ContentType {
    let mut item = ContentType::new(ContentTypeKind::Document, Uuid::new_v4(), "page", "Page");
    let data_type = Uuid::new_v4();
    for i in 0..properties {
        item.properties.push(PropertyType::new(
            Uuid::new_v4(),
            format!("property{i}"),
            format!("Property {i}"),
            data_type,
        ));
    }
    item
}

/// A sync node with `width` text children, each holding a value with
/// characters that need escaping.
pub fn wide_node(width: usize) -> XElement {
    XElement::new("Content")
        .with_attr("Key", Uuid::new_v4().to_string())
        .with_attr("Alias", "Home")
        .with_attr("Level", "1")
        .with_child(XElement::new("Properties").with_children((0..width).map(|i| {
            XElement::new(format!("p{i}")).with_child(XElement::cdata("Value", format!("<p>value {i} &amp; more</p>")))
        })))
}

/// A chain of `count` keys where each key depends on the previous one,
/// listed in reverse so the sort has to reorder everything.
pub fn chain(count: usize) -> (Vec<Uuid>, Vec<(Uuid, Uuid)>) {
    let keys: Vec<Uuid> = (0..count).map(|_| Uuid::new_v4()).collect();
    let edges = keys.windows(2).map(|w| (w[0], w[1])).collect();
    (keys.into_iter().rev().collect(), edges)
}

/// A layered graph: `layers` layers of `width` keys, each key depending on
/// every key in the layer before.
pub fn layered(layers: usize, width: usize) -> (Vec<Uuid>, Vec<(Uuid, Uuid)>) {
    let grid: Vec<Vec<Uuid>> = (0..layers)
        .map(|_| (0..width).map(|_| Uuid::new_v4()).collect())
        .collect();
    let mut edges = Vec::new();
    for pair in grid.windows(2) {
        for before in &pair[0] {
            for after in &pair[1] {
                edges.push((*before, *after));
            }
        }
    }
    (grid.into_iter().flatten().collect(), edges)
}
