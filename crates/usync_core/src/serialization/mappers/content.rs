use crate::entity::{Content, ContentKind, EntityKind, PropertyValue};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{boolean, int, keep_missing, reference, reference_at, root, string, text};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use crate::udi::Udi;
use usync_xml::XElement;

/// Maps content and media nodes.
///
/// Property values are grouped by alias, one `<Value>` per culture and
/// segment, written as CDATA so JSON and HTML survive untouched.
#[derive(Debug, Clone, Copy)]
pub struct ContentMapper {
    kind: ContentKind,
}

impl ContentMapper {
    /// Creates a mapper for one tree.
    pub fn new(kind: ContentKind) -> Self {
        Self { kind }
    }

    fn properties_xml(properties: &[PropertyValue]) -> XElement {
        let mut aliases: Vec<&str> = Vec::new();
        for property in properties {
            if !aliases.contains(&property.alias.as_str()) {
                aliases.push(&property.alias);
            }
        }

        XElement::new("Properties").with_children(aliases.into_iter().map(|alias| {
            XElement::new(alias).with_children(properties.iter().filter(|p| p.alias == alias).map(
                |p| {
                    let mut value = XElement::cdata("Value", p.value.as_str());
                    if let Some(culture) = &p.culture {
                        value.set_attr("Culture", culture.as_str());
                    }
                    if let Some(segment) = &p.segment {
                        value.set_attr("Segment", segment.as_str());
                    }
                    value
                },
            ))
        }))
    }

    fn properties_from(node: &XElement) -> Vec<PropertyValue> {
        let Some(properties) = node.child("Properties") else {
            return Vec::new();
        };
        properties
            .elements()
            .iter()
            .flat_map(|property| {
                property.children_named("Value").map(|value| PropertyValue {
                    alias: property.name().to_string(),
                    culture: value.attr("Culture").filter(|c| !c.is_empty()).map(str::to_string),
                    segment: value.attr("Segment").filter(|s| !s.is_empty()).map(str::to_string),
                    value: value.value().to_string(),
                })
            })
            .collect()
    }
}

impl EntityMapper for ContentMapper {
    type Entity = Content;

    fn kind(&self) -> EntityKind {
        self.kind.entity_kind()
    }

    fn to_xml(&self, item: &Content) -> CoreResult<XElement> {
        let mut info = XElement::new("Info")
            .with_children(item.parent.as_ref().map(|p| reference("Parent", p)))
            .with_child(text("Trashed", item.trashed))
            .with_child(XElement::text("ContentType", item.content_type.as_str()))
            .with_child(text("SortOrder", item.sort_order));
        if self.kind == ContentKind::Document {
            info.add(text("Published", item.published));
            if let Some(template) = &item.template {
                info.add(reference("Template", template));
            }
        }

        Ok(root(self.item_type(), item.key, &item.name, item.level)
            .with_child(info)
            .with_child(Self::properties_xml(&item.properties)))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&Content>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<Content>> {
        let key = node.key()?;
        let name = node.alias().to_string();
        if name.is_empty() {
            return Err(CoreError::invalid_node("content without a name"));
        }

        let content_type = string(node, "Info/ContentType");
        if ctx.lookup().key_of(self.kind.type_kind(), &content_type).is_none() {
            return Err(CoreError::UnknownAlias {
                item_type: self.kind.type_kind().item_type().to_string(),
                alias: content_type,
            });
        }

        let mut pending = Vec::new();
        let template = match reference_at(node, "Info/Template")? {
            Some(template) if ctx.resolve(Udi::new(EntityKind::Template, template.key), &mut pending) => {
                Some(template)
            }
            _ => existing.and_then(|e| e.template.clone()),
        };

        let mut properties = Self::properties_from(node);
        if let Some(existing) = existing.filter(|_| ctx.no_remove()) {
            keep_missing(&mut properties, &existing.properties, |a, b| {
                a.alias == b.alias && a.culture == b.culture && a.segment == b.segment
            });
        }

        Ok(Mapped::new(Content {
            kind: self.kind,
            key,
            name,
            level: node.level().max(1),
            parent: reference_at(node, "Info/Parent")?,
            sort_order: int(node, "Info/SortOrder"),
            content_type,
            template,
            published: boolean(node, "Info/Published"),
            trashed: boolean(node, "Info/Trashed"),
            properties,
        })
        .with_pending(pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ContentType, ContentTypeKind, ItemRef, SyncEntity, Template};
    use crate::model::ChangeType;
    use crate::serialization::{SerializerFlags, SerializerOptions, SyncSerializer, XmlSerializer};
    use crate::services::{PlannedItems, SyncServices};
    use std::sync::Arc;
    use uuid::Uuid;

    fn setup() -> (SyncServices, XmlSerializer<ContentMapper>) {
        let services = SyncServices::in_memory();
        services
            .content_types
            .save(ContentType::new(ContentTypeKind::Document, Uuid::new_v4(), "page", "Page"))
            .unwrap();
        let serializer = XmlSerializer::new(
            ContentMapper::new(ContentKind::Document),
            services.content.clone(),
            Arc::new(services.clone()),
        );
        (services, serializer)
    }

    fn home() -> Content {
        let mut item = Content::new(ContentKind::Document, Uuid::new_v4(), "Home", "page");
        item.published = true;
        item.properties.push(PropertyValue::new("title", "Welcome"));
        item.properties.push(PropertyValue {
            culture: Some("en-US".into()),
            ..PropertyValue::new("body", "<p>Hello &amp; welcome</p>")
        });
        item.properties.push(PropertyValue {
            culture: Some("da-DK".into()),
            ..PropertyValue::new("body", "<p>Hej</p>")
        });
        item
    }

    #[test]
    fn roundtrip_through_text() {
        let (_services, serializer) = setup();
        let item = home();

        let node = serializer.serialize(&item).into_item().unwrap();
        let node = usync_xml::parse(&usync_xml::to_xml_string(&node).unwrap()).unwrap();
        let attempt = serializer.deserialize(&node, &SerializerOptions::default());
        assert_eq!(attempt.item(), Some(&item));
    }

    #[test]
    fn serialize_is_deterministic() {
        let (_services, serializer) = setup();
        let item = home();
        let a = usync_xml::to_xml_string(&serializer.serialize(&item).into_item().unwrap()).unwrap();
        let b = usync_xml::to_xml_string(&serializer.serialize(&item).into_item().unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_content_type_fails() {
        let (_services, serializer) = setup();
        let item = Content::new(ContentKind::Document, Uuid::new_v4(), "Orphan", "missingType");
        let node = serializer.serialize(&item).into_item().unwrap();
        let attempt = serializer.deserialize(&node, &SerializerOptions::default());
        assert_eq!(attempt.change(), ChangeType::Fail);
        assert!(attempt.message().unwrap().contains("missingType"));
    }

    #[test]
    fn template_is_resolved_in_second_pass() {
        let (services, serializer) = setup();
        let template = Template::new(Uuid::new_v4(), "home", "Home");
        let mut item = home();
        item.template = Some(ItemRef::new(template.key, "home"));
        let node = serializer.serialize(&item).into_item().unwrap();

        let options = SerializerOptions::new(SerializerFlags::ONE_PASS);
        let first = serializer.deserialize(&node, &options);
        assert_eq!(first.change(), ChangeType::Create);
        assert_eq!(first.item().unwrap().template, None);
        assert_eq!(first.details().len(), 1);

        services.templates.save(template).unwrap();
        let second = serializer.deserialize_second_pass(&node, &SerializerOptions::default());
        assert_eq!(second.change(), ChangeType::Update);
        assert_eq!(second.item().unwrap().template.as_ref().map(|t| t.key), item.template.map(|t| t.key));
    }

    #[test]
    fn tombstone_deletes_and_is_idempotent() {
        let (services, serializer) = setup();
        let item = home();
        services.content.save(item.clone()).unwrap();
        let tombstone = serializer.serialize_empty(&item, usync_xml::EmptyAction::Delete);

        assert_eq!(
            serializer.is_current(&tombstone, &SerializerOptions::default()),
            ChangeType::Delete
        );
        let deleted = serializer.deserialize(&tombstone, &SerializerOptions::default());
        assert_eq!(deleted.change(), ChangeType::Delete);
        assert!(services.content.get(item.key()).unwrap().is_none());

        let again = serializer.deserialize(&tombstone, &SerializerOptions::default());
        assert_eq!(again.change(), ChangeType::NoChange);
        assert!(again.success());
    }

    #[test]
    fn report_does_not_save() {
        let (services, serializer) = setup();
        let node = serializer.serialize(&home()).into_item().unwrap();
        let attempt = serializer.deserialize(&node, &SerializerOptions::new(SerializerFlags::DO_NOT_SAVE));
        assert_eq!(attempt.change(), ChangeType::Create);
        assert!(!attempt.saved());
        assert!(services.content.get_all().unwrap().is_empty());
    }

    #[test]
    fn planned_type_and_parent_resolve_without_the_host() {
        let (_services, serializer) = setup();
        let parent = Content::new(ContentKind::Document, Uuid::new_v4(), "Blog", "post");
        let item = Content::new(ContentKind::Document, Uuid::new_v4(), "First", "post").under(&parent);
        let node = serializer.serialize(&item).into_item().unwrap();

        let report = SerializerOptions::new(SerializerFlags::DO_NOT_SAVE);
        assert_eq!(serializer.deserialize(&node, &report).change(), ChangeType::Fail);

        let mut plan = PlannedItems::new();
        plan.add(Udi::new(EntityKind::DocumentType, Uuid::new_v4()), "post");
        plan.add(Udi::new(EntityKind::Document, parent.key), "Blog");
        let attempt = serializer.deserialize(&node, &report.with_planned(Arc::new(plan)));
        assert_eq!(attempt.change(), ChangeType::Create);
        assert!(attempt.details().iter().all(|d| !d.path().ends_with("/Parent")));
        assert_eq!(attempt.item().and_then(|i| i.parent.as_ref()).map(|p| p.key), Some(parent.key));
    }
}
