//! Tracking schemas for the built in item types.

use super::{Selector, SyncXmlTracker, TrackingItem};

fn content_type() -> Vec<TrackingItem> {
    let reference = |name, path| TrackingItem::many(name, path, Selector::Attribute("Key"), Selector::Value, vec![]);
    vec![
        TrackingItem::attribute("Alias", "", "Alias"),
        TrackingItem::single("Name", "Info/Name"),
        TrackingItem::single("Icon", "Info/Icon"),
        TrackingItem::single("Description", "Info/Description"),
        TrackingItem::single("AllowAtRoot", "Info/AllowAtRoot"),
        TrackingItem::single("IsElement", "Info/IsElement"),
        TrackingItem::single("Variations", "Info/Variations"),
        TrackingItem::single("Folder", "Info/Folder"),
        TrackingItem::attribute("Parent", "Info/Parent", "Key"),
        reference("Compositions", "Info/Compositions/Composition"),
        TrackingItem::single("DefaultTemplate", "Info/DefaultTemplate"),
        reference("AllowedTemplates", "Info/AllowedTemplates/Template"),
        reference("Structure", "Structure/*"),
        TrackingItem::many(
            "GenericProperties",
            "GenericProperties/GenericProperty",
            Selector::Element("Key"),
            Selector::Element("Alias"),
            vec![
                TrackingItem::single("Name", "Name"),
                TrackingItem::single("Alias", "Alias"),
                TrackingItem::single("Definition", "Definition"),
                TrackingItem::single("Type", "Type"),
                TrackingItem::single("Mandatory", "Mandatory"),
                TrackingItem::single("Validation", "Validation"),
                TrackingItem::single("Description", "Description"),
                TrackingItem::single("SortOrder", "SortOrder"),
                TrackingItem::single("Tab", "Tab"),
                TrackingItem::single("Variations", "Variations"),
                TrackingItem::single("LabelOnTop", "LabelOnTop"),
            ],
        ),
        TrackingItem::many(
            "Tabs",
            "Tabs/Tab",
            Selector::Element("Key"),
            Selector::Element("Alias"),
            vec![
                TrackingItem::single("Caption", "Caption"),
                TrackingItem::single("Alias", "Alias"),
                TrackingItem::single("Type", "Type"),
                TrackingItem::single("SortOrder", "SortOrder"),
            ],
        ),
    ]
}

fn data_type() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Name", "", "Alias"),
        TrackingItem::single("EditorAlias", "Info/EditorAlias"),
        TrackingItem::single("DatabaseType", "Info/DatabaseType"),
        TrackingItem::single("Folder", "Info/Folder"),
        TrackingItem::single("Config", "Config"),
        TrackingItem::attribute("Root", "Config", "Root"),
    ]
}

fn template() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Alias", "", "Alias"),
        TrackingItem::single("Name", "Name"),
        TrackingItem::attribute("Parent", "Parent", "Key"),
        TrackingItem::single("Contents", "Contents"),
    ]
}

fn content() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Name", "", "Alias"),
        TrackingItem::attribute("Parent", "Info/Parent", "Key"),
        TrackingItem::single("Trashed", "Info/Trashed"),
        TrackingItem::single("ContentType", "Info/ContentType"),
        TrackingItem::single("SortOrder", "Info/SortOrder"),
        TrackingItem::single("Published", "Info/Published"),
        TrackingItem::attribute("Template", "Info/Template", "Key"),
        TrackingItem::many(
            "Properties",
            "Properties/*",
            Selector::Name,
            Selector::Name,
            vec![TrackingItem::many(
                "Value",
                "Value",
                Selector::Attribute("Culture"),
                Selector::Attribute("Culture"),
                vec![],
            )],
        ),
    ]
}

fn dictionary() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Key", "", "Alias"),
        TrackingItem::attribute("Parent", "Info/Parent", "Key"),
        TrackingItem::many(
            "Translations",
            "Translations/Translation",
            Selector::Attribute("Language"),
            Selector::Attribute("Language"),
            vec![],
        ),
    ]
}

fn language() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("IsoCode", "", "Alias"),
        TrackingItem::single("Name", "Name"),
        TrackingItem::single("IsDefault", "IsDefault"),
        TrackingItem::single("IsMandatory", "IsMandatory"),
        TrackingItem::single("Fallback", "Fallback"),
    ]
}

fn domain() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Name", "", "Alias"),
        TrackingItem::single("IsWildcard", "Info/IsWildcard"),
        TrackingItem::single("Language", "Info/Language"),
        TrackingItem::attribute("Root", "Info/Root", "Key"),
        TrackingItem::single("SortOrder", "Info/SortOrder"),
    ]
}

fn macros() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Alias", "", "Alias"),
        TrackingItem::single("Name", "Name"),
        TrackingItem::single("MacroSource", "MacroSource"),
        TrackingItem::single("UseInEditor", "UseInEditor"),
        TrackingItem::single("RenderInEditor", "RenderInEditor"),
        TrackingItem::single("CachedDuration", "CachedDuration"),
        TrackingItem::single("CachedByPage", "CachedByPage"),
        TrackingItem::single("CachedByMember", "CachedByMember"),
        TrackingItem::many(
            "Properties",
            "Properties/Property",
            Selector::Element("Alias"),
            Selector::Element("Alias"),
            vec![
                TrackingItem::single("Name", "Name"),
                TrackingItem::single("SortOrder", "SortOrder"),
                TrackingItem::single("EditorAlias", "EditorAlias"),
            ],
        ),
    ]
}

fn relation_type() -> Vec<TrackingItem> {
    vec![
        TrackingItem::attribute("Alias", "", "Alias"),
        TrackingItem::single("Name", "Info/Name"),
        TrackingItem::single("ParentType", "Info/ParentType"),
        TrackingItem::single("ChildType", "Info/ChildType"),
        TrackingItem::single("Bidirectional", "Info/Bidirectional"),
        TrackingItem::single("IsDependency", "Info/IsDependency"),
        TrackingItem::many(
            "Relations",
            "Relations/Relation",
            Selector::Elements(&["Parent", "Child"]),
            Selector::Elements(&["Parent", "Child"]),
            vec![TrackingItem::single("Comment", "Comment")],
        ),
    ]
}

/// The tracking schema for a root element name.
pub fn schema_for(item_type: &str) -> Option<Vec<TrackingItem>> {
    let items = match item_type {
        "ContentType" | "MediaType" | "MemberType" => content_type(),
        "DataType" => data_type(),
        "Template" => template(),
        "Content" | "Media" => content(),
        "Dictionary" => dictionary(),
        "Language" => language(),
        "Domain" => domain(),
        "Macro" => macros(),
        "RelationType" => relation_type(),
        _ => return None,
    };
    Some(items)
}

/// A tracker for a root element name.
pub fn tracker_for(item_type: &str) -> Option<SyncXmlTracker> {
    schema_for(item_type).map(|items| SyncXmlTracker::new(item_type, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Content, ContentKind, ContentType, ContentTypeKind, EntityKind, PropertyType, PropertyValue};
    use crate::model::ChangeDetailType;
    use crate::serialization::mappers::{ContentMapper, ContentTypeMapper};
    use crate::serialization::EntityMapper;
    use crate::tracking::TrackerOptions;
    use proptest::prelude::*;
    use uuid::Uuid;

    #[test]
    fn every_kind_has_a_schema() {
        for kind in EntityKind::ALL {
            assert!(tracker_for(kind.item_type()).is_some(), "{kind:?}");
        }
        assert!(tracker_for("Nope").is_none());
    }

    #[test]
    fn content_type_property_rename() {
        let mut page = ContentType::new(ContentTypeKind::Document, Uuid::new_v4(), "page", "Page");
        page.properties.push(PropertyType::new(Uuid::new_v4(), "title", "Title", Uuid::new_v4()));
        let mapper = ContentTypeMapper::new(ContentTypeKind::Document);
        let old = mapper.to_xml(&page).unwrap();
        page.properties[0].name = "Heading".into();
        let new = mapper.to_xml(&page).unwrap();

        let changes = tracker_for("ContentType")
            .unwrap()
            .get_changes(&new, Some(&old), &TrackerOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "ContentType/GenericProperties/title/Name");
    }

    #[test]
    fn culture_values_are_keyed() {
        let mut home = Content::new(ContentKind::Document, Uuid::new_v4(), "Home", "page");
        let mut english = PropertyValue::new("title", "Hello");
        english.culture = Some("en-US".into());
        let mut danish = PropertyValue::new("title", "Hej");
        danish.culture = Some("da-DK".into());
        home.properties = vec![english, danish];

        let mapper = ContentMapper::new(ContentKind::Document);
        let old = mapper.to_xml(&home).unwrap();
        home.properties[1].value = "Hejsa".into();
        let new = mapper.to_xml(&home).unwrap();

        let changes = tracker_for("Content")
            .unwrap()
            .get_changes(&new, Some(&old), &TrackerOptions::default());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path(), "Content/Properties/title/Value/da-DK");
        assert_eq!(changes[0].old_value(), "Hej");
        assert_eq!(changes[0].new_value(), "Hejsa");
    }

    proptest! {
        #[test]
        fn tracking_a_node_against_itself_finds_nothing(
            name in "[A-Za-z][A-Za-z ]{0,12}",
            values in proptest::collection::btree_map("[a-z]{1,8}", "[ -~]{0,20}", 0..6),
            sort_order in 0..50i32,
        ) {
            let mut item = Content::new(ContentKind::Document, Uuid::new_v4(), name.trim(), "page");
            item.sort_order = sort_order;
            item.properties = values.into_iter().map(|(a, v)| PropertyValue::new(a, v)).collect();
            let node = ContentMapper::new(ContentKind::Document).to_xml(&item).unwrap();
            let tracker = tracker_for("Content").unwrap();

            prop_assert!(tracker.get_changes(&node, Some(&node), &TrackerOptions::default()).is_empty());
            let all = tracker.get_changes(&node, Some(&node), &TrackerOptions { include_no_change: true });
            prop_assert!(all.iter().all(|c| c.change() == ChangeDetailType::NoChange));
        }
    }
}
