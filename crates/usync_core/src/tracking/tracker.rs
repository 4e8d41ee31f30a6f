//! The schema driven tracker.

use super::{TrackingItem, TrackingKind};
use crate::model::{ChangeDetailType, SyncChange};
use usync_xml::{same_xml, to_compact_string, XElement};

/// Tracker options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Also report values that did not change.
    pub include_no_change: bool,
}

/// Computes property level changes between two versions of a node.
#[derive(Debug, Clone)]
pub struct SyncXmlTracker {
    item_type: String,
    items: Vec<TrackingItem>,
}

fn select<'a>(element: &'a XElement, path: &str) -> Vec<&'a XElement> {
    match path.strip_suffix('*') {
        Some(parent) => element
            .path(parent.trim_end_matches('/'))
            .map(|p| p.elements().iter().collect())
            .unwrap_or_default(),
        None => element.path_all(path),
    }
}

fn value_at<'a>(element: Option<&'a XElement>, path: &str) -> Option<&'a str> {
    element.and_then(|e| e.path(path)).map(XElement::value)
}

fn attribute_at<'a>(element: Option<&'a XElement>, path: &str, attribute: &str) -> Option<&'a str> {
    element.and_then(|e| e.path(path)).and_then(|e| e.attr(attribute))
}

fn display(element: &XElement) -> String {
    if element.elements().is_empty() {
        element.value().to_string()
    } else {
        to_compact_string(element).unwrap_or_default()
    }
}

fn join(prefix: &str, segment: &str) -> String {
    if segment.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{segment}")
    }
}

struct Walk<'o> {
    options: &'o TrackerOptions,
    changes: Vec<SyncChange>,
}

impl Walk<'_> {
    fn scalar(&mut self, path: String, name: &str, old: Option<&str>, new: Option<&str>) {
        let change = match (old, new) {
            (None, None) => return,
            (None, Some(n)) if n.is_empty() => return,
            (Some(o), None) if o.is_empty() => return,
            (None, Some(n)) => SyncChange::create(path, name, n),
            (Some(o), None) => SyncChange::delete(path, name, o),
            (Some(o), Some(n)) if o == n => {
                if !self.options.include_no_change {
                    return;
                }
                SyncChange::no_change(path, name, n)
            }
            (Some(o), Some(n)) => SyncChange::update(path, name, o, n),
        };
        self.changes.push(change);
    }

    fn items(&mut self, prefix: &str, items: &[TrackingItem], old: Option<&XElement>, new: Option<&XElement>) {
        for item in items {
            self.item(prefix, item, old, new);
        }
    }

    fn item(&mut self, prefix: &str, item: &TrackingItem, old: Option<&XElement>, new: Option<&XElement>) {
        let path = join(prefix, item.name);
        match &item.kind {
            TrackingKind::Single => {
                self.scalar(path, item.name, value_at(old, item.path), value_at(new, item.path));
            }
            TrackingKind::Attribute(attribute) => self.scalar(
                path,
                item.name,
                attribute_at(old, item.path, attribute),
                attribute_at(new, item.path, attribute),
            ),
            TrackingKind::Many {
                key,
                name,
                children,
            } => {
                let old_items = old.map(|e| select(e, item.path)).unwrap_or_default();
                let new_items = new.map(|e| select(e, item.path)).unwrap_or_default();

                for &new_item in &new_items {
                    let new_key = key.select(new_item);
                    let label = name.select(new_item);
                    let item_path = join(&path, &label);
                    match old_items.iter().copied().find(|o| key.select(o) == new_key) {
                        None if children.is_empty() => {
                            self.changes.push(SyncChange::create(
                                item_path,
                                label_or(&label, item.name),
                                &display(new_item),
                            ));
                        }
                        None => {
                            self.changes.push(SyncChange::create(item_path.clone(), label_or(&label, item.name), &label));
                            self.items(&item_path, children, None, Some(new_item));
                        }
                        Some(old_item) if children.is_empty() => {
                            self.scalar(
                                item_path,
                                label_or(&label, item.name),
                                Some(display(old_item).as_str()),
                                Some(display(new_item).as_str()),
                            );
                        }
                        Some(old_item) => self.items(&item_path, children, Some(old_item), Some(new_item)),
                    }
                }

                for &old_item in &old_items {
                    let old_key = key.select(old_item);
                    if !new_items.iter().any(|n| key.select(n) == old_key) {
                        let label = name.select(old_item);
                        self.changes.push(SyncChange::delete(
                            join(&path, &label),
                            label_or(&label, item.name),
                            label_or(&label, &display(old_item)),
                        ));
                    }
                }
            }
        }
    }
}

fn label_or<'a>(label: &'a str, fallback: &'a str) -> &'a str {
    if label.is_empty() {
        fallback
    } else {
        label
    }
}

impl SyncXmlTracker {
    /// Creates a tracker for an item type.
    pub fn new(item_type: impl Into<String>, items: Vec<TrackingItem>) -> Self {
        Self {
            item_type: item_type.into(),
            items,
        }
    }

    /// Item type tracked.
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// The schema.
    pub fn items(&self) -> &[TrackingItem] {
        &self.items
    }

    /// Changes importing `new` would make over `existing`.
    ///
    /// Both documents are only read. With no existing node every non-empty
    /// value is a create; a tombstone is a single delete.
    pub fn get_changes(
        &self,
        new: &XElement,
        existing: Option<&XElement>,
        options: &TrackerOptions,
    ) -> Vec<SyncChange> {
        let existing = existing.filter(|e| !e.is_empty_item());

        if new.is_empty_item() {
            return existing
                .map(|e| vec![SyncChange::delete(self.item_type.as_str(), e.alias(), e.alias())])
                .unwrap_or_default();
        }

        let identical = existing.is_some_and(|e| same_xml(e, new));
        if identical && !options.include_no_change {
            return Vec::new();
        }

        let mut walk = Walk {
            options,
            changes: Vec::new(),
        };
        walk.items(&self.item_type, &self.items, existing, Some(new));
        let mut changes = walk.changes;

        let any_change = changes.iter().any(|c| c.change() != ChangeDetailType::NoChange);
        if existing.is_some() && !identical && !any_change {
            changes.push(SyncChange::update(
                self.item_type.as_str(),
                new.alias(),
                "",
                "changes outside tracked values",
            ));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::Selector;

    fn tracker() -> SyncXmlTracker {
        SyncXmlTracker::new(
            "ContentType",
            vec![
                TrackingItem::attribute("Alias", "", "Alias"),
                TrackingItem::single("Name", "Info/Name"),
                TrackingItem::many(
                    "GenericProperties",
                    "GenericProperties/GenericProperty",
                    Selector::Element("Key"),
                    Selector::Element("Alias"),
                    vec![
                        TrackingItem::single("Name", "Name"),
                        TrackingItem::single("Mandatory", "Mandatory"),
                    ],
                ),
            ],
        )
    }

    fn property(key: &str, alias: &str, name: &str) -> XElement {
        XElement::new("GenericProperty")
            .with_child(XElement::text("Key", key))
            .with_child(XElement::text("Alias", alias))
            .with_child(XElement::text("Name", name))
            .with_child(XElement::text("Mandatory", "false"))
    }

    fn node(name: &str, properties: Vec<XElement>) -> XElement {
        XElement::new("ContentType")
            .with_attr("Alias", "page")
            .with_child(XElement::new("Info").with_child(XElement::text("Name", name)))
            .with_child(XElement::new("GenericProperties").with_children(properties))
    }

    #[test]
    fn identical_is_empty() {
        let a = node("Page", vec![property("1", "title", "Title")]);
        assert!(tracker().get_changes(&a, Some(&a), &TrackerOptions::default()).is_empty());

        let all = tracker().get_changes(&a, Some(&a), &TrackerOptions { include_no_change: true });
        assert!(!all.is_empty());
        assert!(all.iter().all(|c| c.change() == ChangeDetailType::NoChange));
    }

    #[test]
    fn nested_property_update_path() {
        let old = node("Page", vec![property("1", "title", "Title")]);
        let new = node("Page", vec![property("1", "title", "Heading")]);
        let changes = tracker().get_changes(&new, Some(&old), &TrackerOptions::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "ContentType/GenericProperties/title/Name");
        assert_eq!(changes[0].old_value(), "Title");
        assert_eq!(changes[0].new_value(), "Heading");
        assert_eq!(changes[0].change(), ChangeDetailType::Update);
    }

    #[test]
    fn keyed_create_and_delete() {
        let old = node("Page", vec![property("1", "title", "Title")]);
        let new = node("Page", vec![property("2", "body", "Body")]);
        let changes = tracker().get_changes(&new, Some(&old), &TrackerOptions::default());

        let kinds: Vec<(ChangeDetailType, &str)> = changes.iter().map(|c| (c.change(), c.path())).collect();
        assert!(kinds.contains(&(ChangeDetailType::Create, "ContentType/GenericProperties/body")));
        assert!(kinds.contains(&(ChangeDetailType::Delete, "ContentType/GenericProperties/title")));
    }

    #[test]
    fn no_existing_is_all_creates() {
        let new = node("Page", vec![property("1", "title", "Title")]);
        let changes = tracker().get_changes(&new, None, &TrackerOptions::default());
        assert!(!changes.is_empty());
        assert!(changes.iter().all(|c| c.change() == ChangeDetailType::Create));
    }

    #[test]
    fn tombstone_is_delete() {
        let old = node("Page", vec![]);
        let tombstone = XElement::empty(usync_xml::EmptyAction::Delete, "page", uuid::Uuid::new_v4());
        let changes = tracker().get_changes(&tombstone, Some(&old), &TrackerOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change(), ChangeDetailType::Delete);
    }

    #[test]
    fn untracked_difference_is_caught() {
        let old = node("Page", vec![]);
        let new = node("Page", vec![]).with_child(XElement::text("Untracked", "x"));
        let changes = tracker().get_changes(&new, Some(&old), &TrackerOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change(), ChangeDetailType::Update);
        assert_eq!(changes[0].path(), "ContentType");
    }

    #[test]
    fn documents_are_not_modified() {
        let old = node("Page", vec![property("1", "title", "Title")]);
        let new = node("Other", vec![]);
        let (old_copy, new_copy) = (old.clone(), new.clone());
        let _ = tracker().get_changes(&new, Some(&old), &TrackerOptions { include_no_change: true });
        assert_eq!(old, old_copy);
        assert_eq!(new, new_copy);
    }
}
