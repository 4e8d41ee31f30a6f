use crate::entity::{EntityKind, Template};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{optional_string, reference, reference_at, root, string};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use usync_xml::XElement;

/// Maps templates. The view source is only written when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMapper;

impl EntityMapper for TemplateMapper {
    type Entity = Template;

    fn kind(&self) -> EntityKind {
        EntityKind::Template
    }

    fn to_xml(&self, item: &Template) -> CoreResult<XElement> {
        Ok(root("Template", item.key, &item.alias, item.level)
            .with_child(XElement::text("Name", item.name.as_str()))
            .with_children(item.master.as_ref().map(|m| reference("Parent", m)))
            .with_children(item.contents.as_deref().map(|c| XElement::cdata("Contents", c))))
    }

    fn from_xml(
        &self,
        node: &XElement,
        _existing: Option<&Template>,
        _ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<Template>> {
        let alias = node.alias().to_string();
        if alias.is_empty() {
            return Err(CoreError::invalid_node("template without an alias"));
        }
        Ok(Mapped::new(Template {
            key: node.key()?,
            name: string(node, "Name"),
            level: node.level().max(1),
            master: reference_at(node, "Parent")?,
            contents: optional_string(node, "Contents"),
            alias,
        }))
    }
}
