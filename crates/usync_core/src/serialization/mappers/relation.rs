use crate::entity::{EntityKind, Relation, RelationType};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{boolean, keep_missing, optional, optional_string, root, string, text, uuid};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use usync_xml::XElement;

/// Maps relation types together with their relations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationTypeMapper;

impl EntityMapper for RelationTypeMapper {
    type Entity = RelationType;

    fn kind(&self) -> EntityKind {
        EntityKind::RelationType
    }

    fn to_xml(&self, item: &RelationType) -> CoreResult<XElement> {
        let info = XElement::new("Info")
            .with_child(XElement::text("Name", item.name.as_str()))
            .with_children(optional("ParentType", item.parent_type.as_deref()))
            .with_children(optional("ChildType", item.child_type.as_deref()))
            .with_child(text("Bidirectional", item.is_bidirectional))
            .with_child(text("IsDependency", item.is_dependency));
        let relations = item.relations.iter().map(|r| {
            XElement::new("Relation")
                .with_child(text("Parent", r.parent))
                .with_child(text("Child", r.child))
                .with_child(XElement::text("Comment", r.comment.as_str()))
        });

        Ok(root("RelationType", item.key, &item.alias, 1)
            .with_child(info)
            .with_child(XElement::new("Relations").with_children(relations)))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&RelationType>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<RelationType>> {
        let alias = node.alias().to_string();
        if alias.is_empty() {
            return Err(CoreError::invalid_node("relation type without an alias"));
        }

        let mut relations = node
            .path_all("Relations/Relation")
            .into_iter()
            .map(|r| {
                Ok(Relation {
                    parent: uuid(r, "Parent")?,
                    child: uuid(r, "Child")?,
                    comment: string(r, "Comment"),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        if let Some(existing) = existing.filter(|_| ctx.no_remove()) {
            keep_missing(&mut relations, &existing.relations, |a, b| {
                a.parent == b.parent && a.child == b.child
            });
        }

        Ok(Mapped::new(RelationType {
            key: node.key()?,
            name: string(node, "Info/Name"),
            is_bidirectional: boolean(node, "Info/Bidirectional"),
            is_dependency: boolean(node, "Info/IsDependency"),
            parent_type: optional_string(node, "Info/ParentType"),
            child_type: optional_string(node, "Info/ChildType"),
            relations,
            alias,
        }))
    }
}
