use crate::entity::{DictionaryItem, EntityKind, Translation};
use crate::error::{CoreError, CoreResult};
use crate::model::SyncChange;
use crate::serialization::xml::{keep_missing, reference, reference_at, root};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use usync_xml::XElement;

/// Maps dictionary items.
#[derive(Debug, Clone, Copy, Default)]
pub struct DictionaryMapper;

impl EntityMapper for DictionaryMapper {
    type Entity = DictionaryItem;

    fn kind(&self) -> EntityKind {
        EntityKind::DictionaryItem
    }

    fn to_xml(&self, item: &DictionaryItem) -> CoreResult<XElement> {
        let translations = item.translations.iter().map(|t| {
            XElement::text("Translation", t.value.as_str()).with_attr("Language", t.language.as_str())
        });
        Ok(root("Dictionary", item.key, &item.item_key, item.level)
            .with_child(
                XElement::new("Info").with_children(item.parent.as_ref().map(|p| reference("Parent", p))),
            )
            .with_child(XElement::new("Translations").with_children(translations)))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&DictionaryItem>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<DictionaryItem>> {
        let item_key = node.alias().to_string();
        if item_key.is_empty() {
            return Err(CoreError::invalid_node("dictionary item without a key"));
        }

        let mut details = Vec::new();
        let mut translations = Vec::new();
        for element in node.path_all("Translations/Translation") {
            let language = element.attr("Language").unwrap_or("").to_string();
            if ctx.lookup().key_of(EntityKind::Language, &language).is_none() {
                details.push(SyncChange::warning(
                    format!("Dictionary/Translations/{language}"),
                    language.as_str(),
                    "language not installed",
                ));
                continue;
            }
            translations.push(Translation {
                language,
                value: element.value().to_string(),
            });
        }
        if let Some(existing) = existing.filter(|_| ctx.no_remove()) {
            keep_missing(&mut translations, &existing.translations, |a, b| {
                a.language.eq_ignore_ascii_case(&b.language)
            });
        }

        Ok(Mapped::new(DictionaryItem {
            key: node.key()?,
            item_key,
            level: node.level().max(1),
            parent: reference_at(node, "Info/Parent")?,
            translations,
        })
        .with_details(details))
    }
}
