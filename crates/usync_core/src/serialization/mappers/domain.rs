use crate::entity::{Domain, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{boolean, int, optional, optional_string, reference, reference_at, root, text};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use crate::udi::Udi;
use usync_xml::XElement;

/// Maps domains. The root content node is a deferred reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainMapper;

impl EntityMapper for DomainMapper {
    type Entity = Domain;

    fn kind(&self) -> EntityKind {
        EntityKind::Domain
    }

    fn to_xml(&self, item: &Domain) -> CoreResult<XElement> {
        let info = XElement::new("Info")
            .with_child(text("IsWildcard", item.is_wildcard))
            .with_children(optional("Language", item.language.as_deref()))
            .with_children(item.root.as_ref().map(|r| reference("Root", r)))
            .with_child(text("SortOrder", item.sort_order));
        Ok(root("Domain", item.key, &item.name, 1).with_child(info))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&Domain>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<Domain>> {
        let name = node.alias().to_string();
        if name.is_empty() {
            return Err(CoreError::invalid_node("domain without a name"));
        }

        let mut pending = Vec::new();
        let root_node = match reference_at(node, "Info/Root")? {
            Some(r) if ctx.resolve(Udi::new(EntityKind::Document, r.key), &mut pending) => Some(r),
            _ => existing.and_then(|e| e.root.clone()),
        };

        Ok(Mapped::new(Domain {
            key: node.key()?,
            name,
            is_wildcard: boolean(node, "Info/IsWildcard"),
            language: optional_string(node, "Info/Language"),
            root: root_node,
            sort_order: int(node, "Info/SortOrder"),
        })
        .with_pending(pending))
    }
}
