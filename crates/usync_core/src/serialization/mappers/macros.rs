use crate::entity::{EntityKind, Macro, MacroParameter};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{boolean, int, keep_missing, root, string, text};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use usync_xml::XElement;

/// Maps macros and their parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroMapper;

impl EntityMapper for MacroMapper {
    type Entity = Macro;

    fn kind(&self) -> EntityKind {
        EntityKind::Macro
    }

    fn to_xml(&self, item: &Macro) -> CoreResult<XElement> {
        let parameters = item.parameters.iter().map(|p| {
            XElement::new("Property")
                .with_child(XElement::text("Name", p.name.as_str()))
                .with_child(XElement::text("Alias", p.alias.as_str()))
                .with_child(text("SortOrder", p.sort_order))
                .with_child(XElement::text("EditorAlias", p.editor_alias.as_str()))
        });

        Ok(root("Macro", item.key, &item.alias, 1)
            .with_child(XElement::text("Name", item.name.as_str()))
            .with_child(XElement::text("MacroSource", item.source.as_str()))
            .with_child(text("UseInEditor", item.use_in_editor))
            .with_child(text("RenderInEditor", item.render_in_editor))
            .with_child(text("CachedDuration", item.cache_duration))
            .with_child(text("CachedByPage", item.cache_by_page))
            .with_child(text("CachedByMember", item.cache_by_member))
            .with_child(XElement::new("Properties").with_children(parameters)))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&Macro>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<Macro>> {
        let alias = node.alias().to_string();
        if alias.is_empty() {
            return Err(CoreError::invalid_node("macro without an alias"));
        }

        let mut parameters: Vec<MacroParameter> = node
            .path_all("Properties/Property")
            .into_iter()
            .map(|p| MacroParameter {
                alias: string(p, "Alias"),
                name: string(p, "Name"),
                sort_order: int(p, "SortOrder"),
                editor_alias: string(p, "EditorAlias"),
            })
            .collect();
        if let Some(existing) = existing.filter(|_| ctx.no_remove()) {
            keep_missing(&mut parameters, &existing.parameters, |a, b| a.alias == b.alias);
        }

        Ok(Mapped::new(Macro {
            key: node.key()?,
            name: string(node, "Name"),
            source: string(node, "MacroSource"),
            use_in_editor: boolean(node, "UseInEditor"),
            render_in_editor: boolean(node, "RenderInEditor"),
            cache_duration: int(node, "CachedDuration"),
            cache_by_page: boolean(node, "CachedByPage"),
            cache_by_member: boolean(node, "CachedByMember"),
            parameters,
            alias,
        }))
    }
}
