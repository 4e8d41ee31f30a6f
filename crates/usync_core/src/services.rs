//! Host CMS services.
//!
//! The engine never talks to a CMS directly. Everything it needs to read or
//! write entities goes through [`EntityService`], so a host plugs in by
//! implementing that trait per entity kind. [`MemoryEntityService`] is the
//! in-process implementation used by tools and tests.

use crate::entity::{
    Content, ContentType, DataType, DictionaryItem, Domain, EntityKind, Language, Macro,
    RelationType, SyncEntity, Template,
};
use crate::error::CoreResult;
use crate::udi::Udi;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use usync_xml::XElement;
use uuid::Uuid;

/// Storage operations for one kind of entity.
pub trait EntityService<E: SyncEntity>: Send + Sync {
    /// Gets an item by key.
    fn get(&self, key: Uuid) -> CoreResult<Option<E>>;

    /// Gets an item by alias (case insensitive).
    fn get_by_alias(&self, alias: &str) -> CoreResult<Option<E>>;

    /// All items, parents before children.
    fn get_all(&self) -> CoreResult<Vec<E>>;

    /// Direct children of an item, or root items when `parent` is `None`.
    fn children(&self, parent: Option<Uuid>) -> CoreResult<Vec<E>> {
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|item| item.parent_key() == parent)
            .collect())
    }

    /// Creates or replaces an item.
    fn save(&self, item: E) -> CoreResult<()>;

    /// Deletes an item. Returns false if it did not exist.
    fn delete(&self, key: Uuid) -> CoreResult<bool>;
}

/// In-memory entity storage.
#[derive(Debug)]
pub struct MemoryEntityService<E> {
    items: RwLock<BTreeMap<Uuid, E>>,
}

impl<E> Default for MemoryEntityService<E> {
    fn default() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E: SyncEntity> MemoryEntityService<E> {
    /// Creates an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service holding the given items.
    pub fn with_items(items: impl IntoIterator<Item = E>) -> Self {
        let service = Self::new();
        {
            let mut map = service.items.write();
            for item in items {
                map.insert(item.key(), item);
            }
        }
        service
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl<E: SyncEntity> EntityService<E> for MemoryEntityService<E> {
    fn get(&self, key: Uuid) -> CoreResult<Option<E>> {
        Ok(self.items.read().get(&key).cloned())
    }

    fn get_by_alias(&self, alias: &str) -> CoreResult<Option<E>> {
        Ok(self
            .items
            .read()
            .values()
            .find(|item| item.alias().eq_ignore_ascii_case(alias))
            .cloned())
    }

    fn get_all(&self) -> CoreResult<Vec<E>> {
        let mut all: Vec<E> = self.items.read().values().cloned().collect();
        all.sort_by(|a, b| {
            a.level()
                .cmp(&b.level())
                .then_with(|| a.alias().cmp(b.alias()))
        });
        Ok(all)
    }

    fn save(&self, item: E) -> CoreResult<()> {
        self.items.write().insert(item.key(), item);
        Ok(())
    }

    fn delete(&self, key: Uuid) -> CoreResult<bool> {
        Ok(self.items.write().remove(&key).is_some())
    }
}

/// Resolves whether a referenced item exists.
pub trait EntityLookup: Send + Sync {
    /// Returns true if the item identified by `udi` exists.
    fn exists(&self, udi: &Udi) -> bool;

    /// Display name of the item, if it exists.
    fn name_of(&self, udi: &Udi) -> Option<String>;

    /// Key of the item of `kind` with the given alias.
    fn key_of(&self, kind: EntityKind, alias: &str) -> Option<Uuid>;
}

/// One service per entity kind.
#[derive(Clone)]
pub struct SyncServices {
    /// Data types.
    pub data_types: Arc<dyn EntityService<DataType>>,
    /// Document, media and member types.
    pub content_types: Arc<dyn EntityService<ContentType>>,
    /// Templates.
    pub templates: Arc<dyn EntityService<Template>>,
    /// Content and media nodes.
    pub content: Arc<dyn EntityService<Content>>,
    /// Dictionary items.
    pub dictionary: Arc<dyn EntityService<DictionaryItem>>,
    /// Languages.
    pub languages: Arc<dyn EntityService<Language>>,
    /// Domains.
    pub domains: Arc<dyn EntityService<Domain>>,
    /// Macros.
    pub macros: Arc<dyn EntityService<Macro>>,
    /// Relation types.
    pub relation_types: Arc<dyn EntityService<RelationType>>,
}

impl std::fmt::Debug for SyncServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServices").finish_non_exhaustive()
    }
}

impl SyncServices {
    /// Creates a set of empty in-memory services.
    pub fn in_memory() -> Self {
        Self {
            data_types: Arc::new(MemoryEntityService::new()),
            content_types: Arc::new(MemoryEntityService::new()),
            templates: Arc::new(MemoryEntityService::new()),
            content: Arc::new(MemoryEntityService::new()),
            dictionary: Arc::new(MemoryEntityService::new()),
            languages: Arc::new(MemoryEntityService::new()),
            domains: Arc::new(MemoryEntityService::new()),
            macros: Arc::new(MemoryEntityService::new()),
            relation_types: Arc::new(MemoryEntityService::new()),
        }
    }

    fn find_key(&self, kind: EntityKind, alias: &str) -> CoreResult<Option<Uuid>> {
        fn first<E: SyncEntity>(items: Vec<E>, kind: EntityKind, alias: &str) -> Option<Uuid> {
            items
                .into_iter()
                .find(|i| i.kind() == kind && i.alias().eq_ignore_ascii_case(alias))
                .map(|i| i.key())
        }

        Ok(match kind {
            EntityKind::DataType => first(self.data_types.get_all()?, kind, alias),
            EntityKind::DocumentType | EntityKind::MediaType | EntityKind::MemberType => {
                first(self.content_types.get_all()?, kind, alias)
            }
            EntityKind::Template => first(self.templates.get_all()?, kind, alias),
            EntityKind::Document | EntityKind::Media => first(self.content.get_all()?, kind, alias),
            EntityKind::DictionaryItem => first(self.dictionary.get_all()?, kind, alias),
            EntityKind::Language => first(self.languages.get_all()?, kind, alias),
            EntityKind::Domain => first(self.domains.get_all()?, kind, alias),
            EntityKind::Macro => first(self.macros.get_all()?, kind, alias),
            EntityKind::RelationType => first(self.relation_types.get_all()?, kind, alias),
        })
    }

    fn find_name(&self, udi: &Udi) -> CoreResult<Option<String>> {
        let key = udi.key;
        Ok(match udi.kind {
            EntityKind::DataType => self.data_types.get(key)?.map(|i| i.name),
            EntityKind::DocumentType | EntityKind::MediaType | EntityKind::MemberType => self
                .content_types
                .get(key)?
                .filter(|i| i.kind() == udi.kind)
                .map(|i| i.name),
            EntityKind::Template => self.templates.get(key)?.map(|i| i.name),
            EntityKind::Document | EntityKind::Media => self
                .content
                .get(key)?
                .filter(|i| i.kind() == udi.kind)
                .map(|i| i.name),
            EntityKind::DictionaryItem => self.dictionary.get(key)?.map(|i| i.item_key),
            EntityKind::Language => self.languages.get(key)?.map(|i| i.name),
            EntityKind::Domain => self.domains.get(key)?.map(|i| i.name),
            EntityKind::Macro => self.macros.get(key)?.map(|i| i.name),
            EntityKind::RelationType => self.relation_types.get(key)?.map(|i| i.name),
        })
    }
}

impl EntityLookup for SyncServices {
    fn exists(&self, udi: &Udi) -> bool {
        self.name_of(udi).is_some()
    }

    fn name_of(&self, udi: &Udi) -> Option<String> {
        self.find_name(udi).ok().flatten()
    }

    fn key_of(&self, kind: EntityKind, alias: &str) -> Option<Uuid> {
        self.find_key(kind, alias).ok().flatten()
    }
}

/// Items a run is about to import, keyed by UDI with their aliases.
///
/// A report saves nothing, so references between the files it reads would
/// otherwise only resolve against what the host already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedItems {
    items: BTreeMap<Udi, String>,
}

impl PlannedItems {
    /// An empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item.
    pub fn add(&mut self, udi: Udi, alias: impl Into<String>) {
        self.items.insert(udi, alias.into());
    }

    /// Plans every node with a known root element. Tombstones and clean
    /// markers are skipped.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a XElement>) -> Self {
        let mut plan = Self::new();
        for node in nodes.into_iter().filter(|n| !n.is_empty_item()) {
            let (Some(kind), Ok(key)) = (EntityKind::from_item_type(node.name()), node.key()) else {
                continue;
            };
            plan.add(Udi::new(kind, key), node.alias());
        }
        plan
    }

    /// Number of planned items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true when nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A lookup that checks `base` first, then the plan.
    pub fn over<'a>(&'a self, base: &'a dyn EntityLookup) -> PlannedLookup<'a> {
        PlannedLookup { plan: self, base }
    }
}

/// [`EntityLookup`] over the host plus a [`PlannedItems`].
#[derive(Clone, Copy)]
pub struct PlannedLookup<'a> {
    plan: &'a PlannedItems,
    base: &'a dyn EntityLookup,
}

impl EntityLookup for PlannedLookup<'_> {
    fn exists(&self, udi: &Udi) -> bool {
        self.base.exists(udi) || self.plan.items.contains_key(udi)
    }

    fn name_of(&self, udi: &Udi) -> Option<String> {
        self.base.name_of(udi).or_else(|| self.plan.items.get(udi).cloned())
    }

    fn key_of(&self, kind: EntityKind, alias: &str) -> Option<Uuid> {
        self.base.key_of(kind, alias).or_else(|| {
            self.plan
                .items
                .iter()
                .find(|(udi, planned)| udi.kind == kind && planned.eq_ignore_ascii_case(alias))
                .map(|(udi, _)| udi.key)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ContentKind, ContentTypeKind};

    #[test]
    fn memory_service_crud() {
        let service = MemoryEntityService::new();
        let key = Uuid::new_v4();
        service.save(Language::new(key, "en-US", "English")).unwrap();

        assert_eq!(service.len(), 1);
        assert!(service.get(key).unwrap().is_some());
        assert!(service.get_by_alias("EN-us").unwrap().is_some());
        assert!(service.delete(key).unwrap());
        assert!(!service.delete(key).unwrap());
        assert!(service.is_empty());
    }

    #[test]
    fn get_all_is_parents_first() {
        let root = Content::new(ContentKind::Document, Uuid::new_v4(), "Home", "home");
        let child = Content::new(ContentKind::Document, Uuid::new_v4(), "About", "page").under(&root);
        let service = MemoryEntityService::with_items([child.clone(), root.clone()]);

        let all = service.get_all().unwrap();
        assert_eq!(all[0].key, root.key);
        assert_eq!(service.children(Some(root.key)).unwrap(), vec![child]);
        assert_eq!(service.children(None).unwrap(), vec![root]);
    }

    #[test]
    fn lookup_checks_kind() {
        let services = SyncServices::in_memory();
        let media_type = ContentType::new(ContentTypeKind::Media, Uuid::new_v4(), "image", "Image");
        services.content_types.save(media_type.clone()).unwrap();

        assert!(services.exists(&Udi::new(EntityKind::MediaType, media_type.key)));
        assert!(!services.exists(&Udi::new(EntityKind::DocumentType, media_type.key)));
        assert_eq!(
            services.name_of(&Udi::new(EntityKind::MediaType, media_type.key)),
            Some("Image".to_string())
        );
        assert_eq!(services.key_of(EntityKind::MediaType, "IMAGE"), Some(media_type.key));
        assert_eq!(services.key_of(EntityKind::DocumentType, "image"), None);
    }

    #[test]
    fn planned_items_extend_the_host() {
        let services = SyncServices::in_memory();
        let page = Uuid::new_v4();
        let nodes = [
            XElement::new("ContentType")
                .with_attr("Key", page.to_string())
                .with_attr("Alias", "page"),
            XElement::empty(usync_xml::EmptyAction::Delete, "gone", Uuid::new_v4()),
            XElement::new("Unknown").with_attr("Key", Uuid::new_v4().to_string()),
        ];
        let plan = PlannedItems::from_nodes(&nodes);
        assert_eq!(plan.len(), 1);

        let lookup = plan.over(&services);
        assert!(lookup.exists(&Udi::new(EntityKind::DocumentType, page)));
        assert!(!lookup.exists(&Udi::new(EntityKind::MediaType, page)));
        assert_eq!(lookup.key_of(EntityKind::DocumentType, "PAGE"), Some(page));
        assert_eq!(lookup.name_of(&Udi::new(EntityKind::DocumentType, page)), Some("page".to_string()));
        assert!(!services.exists(&Udi::new(EntityKind::DocumentType, page)));
    }
}
