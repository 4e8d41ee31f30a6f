use crate::entity::{ContentType, ContentTypeKind, EntityKind, ItemRef, PropertyTab, PropertyType};
use crate::error::{CoreError, CoreResult};
use crate::model::SyncChange;
use crate::serialization::xml::{
    boolean, int, keep_missing, optional, optional_string, reference, reference_at, references,
    root, string, text, uuid,
};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use crate::udi::Udi;
use usync_xml::XElement;

/// Maps document, media and member types.
///
/// Compositions, structure, allowed templates and property data types are
/// references; any that do not exist yet are left out and reported as
/// pending so the second pass can add them.
#[derive(Debug, Clone, Copy)]
pub struct ContentTypeMapper {
    kind: ContentTypeKind,
}

impl ContentTypeMapper {
    /// Creates a mapper for one kind of content type.
    pub fn new(kind: ContentTypeKind) -> Self {
        Self { kind }
    }

    fn property_xml(property: &PropertyType) -> XElement {
        XElement::new("GenericProperty")
            .with_child(text("Key", property.key))
            .with_child(XElement::text("Name", property.name.as_str()))
            .with_child(XElement::text("Alias", property.alias.as_str()))
            .with_child(text("Definition", property.data_type))
            .with_child(XElement::text("Type", property.editor_alias.as_str()))
            .with_child(text("Mandatory", property.mandatory))
            .with_children(optional("Validation", property.validation.as_deref()))
            .with_children(
                property
                    .description
                    .as_deref()
                    .map(|d| XElement::cdata("Description", d)),
            )
            .with_child(text("SortOrder", property.sort_order))
            .with_children(optional("Tab", property.tab.as_deref()))
            .with_child(XElement::text("Variations", property.variations.as_str()))
            .with_child(text("LabelOnTop", property.label_on_top))
    }

    fn property_from(node: &XElement) -> CoreResult<PropertyType> {
        let alias = string(node, "Alias");
        if alias.is_empty() {
            return Err(CoreError::invalid_node("generic property without an alias"));
        }
        Ok(PropertyType {
            key: uuid(node, "Key")?,
            name: string(node, "Name"),
            data_type: uuid(node, "Definition")?,
            editor_alias: string(node, "Type"),
            tab: optional_string(node, "Tab"),
            mandatory: boolean(node, "Mandatory"),
            validation: optional_string(node, "Validation"),
            description: optional_string(node, "Description"),
            sort_order: int(node, "SortOrder"),
            variations: string(node, "Variations"),
            label_on_top: boolean(node, "LabelOnTop"),
            alias,
        })
    }

    fn tab_xml(tab: &PropertyTab) -> XElement {
        XElement::new("Tab")
            .with_child(text("Key", tab.key))
            .with_child(XElement::text("Caption", tab.caption.as_str()))
            .with_child(XElement::text("Alias", tab.alias.as_str()))
            .with_child(XElement::text("Type", tab.tab_type.as_str()))
            .with_child(text("SortOrder", tab.sort_order))
    }

    fn tab_from(node: &XElement) -> CoreResult<PropertyTab> {
        Ok(PropertyTab {
            key: uuid(node, "Key")?,
            alias: string(node, "Alias"),
            caption: string(node, "Caption"),
            tab_type: string(node, "Type"),
            sort_order: int(node, "SortOrder"),
        })
    }

    fn resolved(
        refs: Vec<ItemRef>,
        kind: EntityKind,
        ctx: &MapContext<'_>,
        pending: &mut Vec<Udi>,
    ) -> Vec<ItemRef> {
        refs.into_iter()
            .filter(|r| ctx.resolve(Udi::new(kind, r.key), pending))
            .collect()
    }
}

impl EntityMapper for ContentTypeMapper {
    type Entity = ContentType;

    fn kind(&self) -> EntityKind {
        self.kind.entity_kind()
    }

    fn to_xml(&self, item: &ContentType) -> CoreResult<XElement> {
        let item_type = self.item_type();

        let info = XElement::new("Info")
            .with_child(XElement::text("Name", item.name.as_str()))
            .with_child(XElement::text("Icon", item.icon.as_str()))
            .with_children(optional("Description", item.description.as_deref()))
            .with_child(text("AllowAtRoot", item.allow_at_root))
            .with_child(text("IsElement", item.is_element))
            .with_child(XElement::text("Variations", item.variations.as_str()))
            .with_children(optional("Folder", item.folder.as_deref()))
            .with_children(item.parent.as_ref().map(|p| reference("Parent", p)))
            .with_child(
                XElement::new("Compositions")
                    .with_children(item.compositions.iter().map(|c| reference("Composition", c))),
            )
            .with_children(optional("DefaultTemplate", item.default_template.as_deref()))
            .with_child(
                XElement::new("AllowedTemplates")
                    .with_children(item.allowed_templates.iter().map(|t| reference("Template", t))),
            );

        Ok(root(item_type, item.key, &item.alias, item.level)
            .with_child(info)
            .with_child(
                XElement::new("Structure")
                    .with_children(item.structure.iter().map(|s| reference(item_type, s))),
            )
            .with_child(
                XElement::new("GenericProperties")
                    .with_children(item.properties.iter().map(Self::property_xml)),
            )
            .with_child(XElement::new("Tabs").with_children(item.tabs.iter().map(Self::tab_xml))))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&ContentType>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<ContentType>> {
        let key = node.key()?;
        let alias = node.alias().to_string();
        if alias.is_empty() {
            return Err(CoreError::invalid_node("content type without an alias"));
        }

        let kind = self.kind.entity_kind();
        let mut pending = Vec::new();
        let mut details = Vec::new();

        let mut compositions =
            Self::resolved(references(node, "Info/Compositions/Composition")?, kind, ctx, &mut pending);
        let mut allowed_templates = Self::resolved(
            references(node, "Info/AllowedTemplates/Template")?,
            EntityKind::Template,
            ctx,
            &mut pending,
        );
        let mut structure =
            Self::resolved(references(node, &format!("Structure/{}", self.item_type()))?, kind, ctx, &mut pending);

        let mut properties = Vec::new();
        for element in node.path_all("GenericProperties/GenericProperty") {
            let property = Self::property_from(element)?;
            if ctx.resolve(Udi::new(EntityKind::DataType, property.data_type), &mut pending) {
                properties.push(property);
            } else if let Some(old) = existing
                .and_then(|e| e.properties.iter().find(|p| p.alias == property.alias))
            {
                properties.push(old.clone());
            } else {
                details.push(SyncChange::warning(
                    format!("{}/GenericProperties/{}", self.item_type(), property.alias),
                    property.alias.as_str(),
                    "data type not found yet",
                ));
            }
        }

        let mut tabs = node
            .path_all("Tabs/Tab")
            .into_iter()
            .map(Self::tab_from)
            .collect::<CoreResult<Vec<_>>>()?;

        if let Some(existing) = existing.filter(|_| ctx.no_remove()) {
            keep_missing(&mut properties, &existing.properties, |a, b| a.alias == b.alias);
            keep_missing(&mut tabs, &existing.tabs, |a, b| a.alias == b.alias);
            keep_missing(&mut compositions, &existing.compositions, |a, b| a.key == b.key);
            keep_missing(&mut allowed_templates, &existing.allowed_templates, |a, b| a.key == b.key);
            keep_missing(&mut structure, &existing.structure, |a, b| a.key == b.key);
        }

        Ok(Mapped::new(ContentType {
            kind: self.kind,
            key,
            name: string(node, "Info/Name"),
            icon: string(node, "Info/Icon"),
            description: optional_string(node, "Info/Description"),
            allow_at_root: boolean(node, "Info/AllowAtRoot"),
            is_element: boolean(node, "Info/IsElement"),
            variations: string(node, "Info/Variations"),
            level: node.level().max(1),
            parent: reference_at(node, "Info/Parent")?,
            folder: optional_string(node, "Info/Folder"),
            compositions,
            default_template: optional_string(node, "Info/DefaultTemplate"),
            allowed_templates,
            structure,
            properties,
            tabs,
            alias,
        })
        .with_pending(pending)
        .with_details(details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DataType, SyncEntity};
    use crate::model::ChangeType;
    use crate::serialization::{SerializerFlags, SerializerOptions, SyncSerializer, XmlSerializer};
    use crate::services::SyncServices;
    use std::sync::Arc;
    use uuid::Uuid;

    fn serializer(services: &SyncServices) -> XmlSerializer<ContentTypeMapper> {
        XmlSerializer::new(
            ContentTypeMapper::new(ContentTypeKind::Document),
            services.content_types.clone(),
            Arc::new(services.clone()),
        )
    }

    fn page(text: &DataType) -> ContentType {
        let mut item = ContentType::new(ContentTypeKind::Document, Uuid::new_v4(), "page", "Page");
        item.description = Some("A page".into());
        item.allow_at_root = true;
        item.properties.push(PropertyType {
            tab: Some("content".into()),
            mandatory: true,
            ..PropertyType::new(Uuid::new_v4(), "title", "Title", text.key)
        });
        item.tabs.push(PropertyTab {
            key: Uuid::new_v4(),
            alias: "content".into(),
            caption: "Content".into(),
            tab_type: "Group".into(),
            sort_order: 0,
        });
        item
    }

    #[test]
    fn roundtrip() {
        let services = SyncServices::in_memory();
        let text = DataType::new(Uuid::new_v4(), "Text", "Umbraco.TextBox");
        services.data_types.save(text.clone()).unwrap();
        let serializer = serializer(&services);
        let item = page(&text);

        let node = serializer.serialize(&item).into_item().unwrap();
        let parsed = usync_xml::parse(&usync_xml::to_xml_string(&node).unwrap()).unwrap();
        let attempt = serializer.deserialize(&parsed, &SerializerOptions::default());
        assert_eq!(attempt.change(), ChangeType::Create);
        assert_eq!(attempt.item(), Some(&item));
        assert!(!attempt.requires_second_pass());
    }

    #[test]
    fn missing_composition_needs_second_pass() {
        let services = SyncServices::in_memory();
        let text = DataType::new(Uuid::new_v4(), "Text", "Umbraco.TextBox");
        services.data_types.save(text.clone()).unwrap();
        let serializer = serializer(&services);

        let seo = ContentType::new(ContentTypeKind::Document, Uuid::new_v4(), "seo", "SEO");
        let mut item = page(&text);
        item.compositions.push(ItemRef::new(seo.key, "seo"));
        let node = serializer.serialize(&item).into_item().unwrap();

        let first = serializer.deserialize(&node, &SerializerOptions::default());
        assert!(first.requires_second_pass());
        assert!(first.item().unwrap().compositions.is_empty());

        services.content_types.save(seo).unwrap();
        let second = serializer.deserialize_second_pass(&node, &SerializerOptions::default());
        assert_eq!(second.change(), ChangeType::Update);
        assert_eq!(second.item().unwrap().compositions.len(), 1);
        assert!(!second.requires_second_pass());
    }

    #[test]
    fn no_remove_keeps_properties() {
        let services = SyncServices::in_memory();
        let text = DataType::new(Uuid::new_v4(), "Text", "Umbraco.TextBox");
        services.data_types.save(text.clone()).unwrap();
        let serializer = serializer(&services);

        let mut stored = page(&text);
        stored
            .properties
            .push(PropertyType::new(Uuid::new_v4(), "extra", "Extra", text.key));
        services.content_types.save(stored.clone()).unwrap();

        let mut incoming = stored.clone();
        incoming.properties.truncate(1);
        let node = serializer.serialize(&incoming).into_item().unwrap();

        let kept = serializer.deserialize(&node, &SerializerOptions::new(SerializerFlags::NO_REMOVE));
        assert_eq!(kept.change(), ChangeType::NoChange);

        let removed = serializer.deserialize(&node, &SerializerOptions::default());
        assert_eq!(removed.change(), ChangeType::Update);
        assert_eq!(removed.item().unwrap().properties.len(), 1);
    }

    #[test]
    fn missing_parent_policy() {
        let services = SyncServices::in_memory();
        let text = DataType::new(Uuid::new_v4(), "Text", "Umbraco.TextBox");
        services.data_types.save(text.clone()).unwrap();
        let serializer = serializer(&services);

        let mut item = page(&text);
        item.parent = Some(ItemRef::new(Uuid::new_v4(), "master"));
        item.level = 2;
        let node = serializer.serialize(&item).into_item().unwrap();

        let failed = serializer.deserialize(
            &node,
            &SerializerOptions::new(SerializerFlags::FAIL_MISSING_PARENT | SerializerFlags::DO_NOT_SAVE),
        );
        assert!(!failed.success());
        assert_eq!(failed.change(), ChangeType::ParentMissing);

        let placed = serializer.deserialize(&node, &SerializerOptions::default());
        assert!(placed.success());
        assert_eq!(placed.item().unwrap().parent_key(), None);
        assert_eq!(placed.details().len(), 1);
    }

    #[test]
    fn wrong_root_and_bad_key_fail() {
        let services = SyncServices::in_memory();
        let serializer = serializer(&services);

        let wrong = XElement::new("MediaType").with_attr("Key", Uuid::new_v4().to_string());
        assert_eq!(
            serializer.deserialize(&wrong, &SerializerOptions::default()).change(),
            ChangeType::Fail
        );

        let bad_key = XElement::new("ContentType").with_attr("Key", "not-a-key").with_attr("Alias", "x");
        let attempt = serializer.deserialize(&bad_key, &SerializerOptions::default());
        assert!(!attempt.success());
        assert_eq!(attempt.change(), ChangeType::Fail);
    }

    #[test]
    fn create_only_skips_existing() {
        let services = SyncServices::in_memory();
        let text = DataType::new(Uuid::new_v4(), "Text", "Umbraco.TextBox");
        services.data_types.save(text.clone()).unwrap();
        let serializer = serializer(&services);

        let stored = page(&text);
        services.content_types.save(stored.clone()).unwrap();
        let mut changed = stored.clone();
        changed.name = "Renamed".into();
        let node = serializer.serialize(&changed).into_item().unwrap();

        let attempt = serializer.deserialize(&node, &SerializerOptions::new(SerializerFlags::CREATE_ONLY));
        assert_eq!(attempt.change(), ChangeType::NoChange);
        assert_eq!(services.content_types.get(stored.key).unwrap().unwrap().name, "Page");
    }
}
