use crate::entity::{EntityKind, Language};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{boolean, optional, optional_string, root, string, text};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use usync_xml::XElement;

/// Maps languages. The ISO code is the alias.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageMapper;

impl EntityMapper for LanguageMapper {
    type Entity = Language;

    fn kind(&self) -> EntityKind {
        EntityKind::Language
    }

    fn to_xml(&self, item: &Language) -> CoreResult<XElement> {
        Ok(root("Language", item.key, &item.iso_code, 1)
            .with_child(XElement::text("Name", item.name.as_str()))
            .with_child(text("IsDefault", item.is_default))
            .with_child(text("IsMandatory", item.is_mandatory))
            .with_children(optional("Fallback", item.fallback.as_deref())))
    }

    fn from_xml(
        &self,
        node: &XElement,
        _existing: Option<&Language>,
        _ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<Language>> {
        let iso_code = node.alias().to_string();
        if iso_code.is_empty() {
            return Err(CoreError::invalid_node("language without an iso code"));
        }
        Ok(Mapped::new(Language {
            key: node.key()?,
            name: string(node, "Name"),
            is_default: boolean(node, "IsDefault"),
            is_mandatory: boolean(node, "IsMandatory"),
            fallback: optional_string(node, "Fallback"),
            iso_code,
        }))
    }
}
