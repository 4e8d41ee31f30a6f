//! Change tracking.
//!
//! A tracker compares a new node against the existing one and lists what an
//! import would change, without touching either document. What to compare is
//! described by a [`TrackingItem`] schema per item type, so one generic
//! [`SyncXmlTracker`] serves every entity kind.

mod schemas;
mod tracker;

pub use schemas::{schema_for, tracker_for};
pub use tracker::{SyncXmlTracker, TrackerOptions};

use usync_xml::XElement;

/// Picks a string out of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// An attribute of the element.
    Attribute(&'static str),
    /// The value of a child element, by relative path.
    Element(&'static str),
    /// Values of several child elements joined with `:`.
    Elements(&'static [&'static str]),
    /// The element's own value.
    Value,
    /// The element's name.
    Name,
}

impl Selector {
    /// Applies the selector.
    pub fn select(&self, element: &XElement) -> String {
        match self {
            Selector::Attribute(name) => element.attr(name).unwrap_or("").to_string(),
            Selector::Element(path) => element.path(path).map(XElement::value).unwrap_or("").to_string(),
            Selector::Elements(paths) => paths
                .iter()
                .map(|p| element.path(p).map(XElement::value).unwrap_or(""))
                .collect::<Vec<_>>()
                .join(":"),
            Selector::Value => element.value().to_string(),
            Selector::Name => element.name().to_string(),
        }
    }
}

/// How a tracked path is compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingKind {
    /// The text value at the path.
    Single,
    /// An attribute of the element at the path.
    Attribute(&'static str),
    /// Repeating elements matched by key.
    ///
    /// Without child items, matched elements are compared whole.
    Many {
        /// Identifies an element across versions.
        key: Selector,
        /// Display name of an element.
        name: Selector,
        /// Items tracked inside each element, relative to it.
        children: Vec<TrackingItem>,
    },
}

/// One entry in a tracking schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingItem {
    /// Display name, also the path segment in reported changes.
    pub name: &'static str,
    /// Slash delimited element path. A final `*` selects every child.
    pub path: &'static str,
    /// How to compare.
    pub kind: TrackingKind,
}

impl TrackingItem {
    /// A scalar value.
    pub const fn single(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            kind: TrackingKind::Single,
        }
    }

    /// An attribute value.
    pub const fn attribute(name: &'static str, path: &'static str, attribute: &'static str) -> Self {
        Self {
            name,
            path,
            kind: TrackingKind::Attribute(attribute),
        }
    }

    /// Repeating elements.
    pub fn many(
        name: &'static str,
        path: &'static str,
        key: Selector,
        display: Selector,
        children: Vec<TrackingItem>,
    ) -> Self {
        Self {
            name,
            path,
            kind: TrackingKind::Many {
                key,
                name: display,
                children,
            },
        }
    }
}
