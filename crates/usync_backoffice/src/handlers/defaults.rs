//! The built in handlers.

use super::entity::{EntityHandler, HandlerInfo};
use super::HandlerFactory;
use std::sync::Arc;
use tracing::warn;
use usync_core::configuration::{ConfigMergerRegistry, ConfigurationSerializerRegistry};
use usync_core::dependency::{orders, DependencyChecker, DependencyResolver};
use usync_core::entity::{ContentKind, ContentTypeKind};
use usync_core::serialization::mappers::{
    ContentMapper, ContentTypeMapper, DataTypeMapper, DictionaryMapper, DomainMapper, LanguageMapper,
    MacroMapper, RelationTypeMapper, TemplateMapper,
};
use usync_core::serialization::{EntityMapper, XmlSerializer};
use usync_core::services::{EntityLookup, EntityService, SyncServices};
use usync_xml::XElement;
use uuid::Uuid;

/// Handler group names.
pub mod groups {
    /// Schema and configuration handlers.
    pub const SETTINGS: &str = "Settings";
    /// Content and media handlers.
    pub const CONTENT: &str = "Content";
}

const fn info(
    alias: &'static str,
    name: &'static str,
    icon: &'static str,
    folder: &'static str,
    group: &'static str,
    priority: i32,
) -> HandlerInfo {
    HandlerInfo {
        alias,
        name,
        icon,
        folder,
        group,
        priority,
        two_pass: false,
        post_import: false,
        clean: false,
    }
}

const fn two_pass(mut info: HandlerInfo) -> HandlerInfo {
    info.two_pass = true;
    info
}

const fn post_import(mut info: HandlerInfo) -> HandlerInfo {
    info.post_import = true;
    info
}

const fn clean(mut info: HandlerInfo) -> HandlerInfo {
    info.clean = true;
    info
}

/// Keys of the compositions a content type file lists.
fn compositions(node: &XElement) -> Vec<Uuid> {
    node.path_all("Info/Compositions/Composition")
        .into_iter()
        .filter_map(|c| c.attr("Key"))
        .filter_map(|k| Uuid::parse_str(k).ok())
        .collect()
}

struct Builder<'a> {
    lookup: Arc<dyn EntityLookup>,
    resolver: Arc<DependencyResolver>,
    factory: &'a mut HandlerFactory,
}

impl Builder<'_> {
    fn handler<M>(&self, info: HandlerInfo, mapper: M, service: Arc<dyn EntityService<M::Entity>>) -> EntityHandler<M::Entity>
    where
        M: EntityMapper,
        DependencyResolver: DependencyChecker<M::Entity>,
    {
        let serializer = Arc::new(XmlSerializer::new(mapper, Arc::clone(&service), Arc::clone(&self.lookup)));
        let checker: Arc<dyn DependencyChecker<M::Entity> + Send + Sync> = self.resolver.clone();
        EntityHandler::new(info, serializer, service, checker)
    }

    fn add<M>(&mut self, info: HandlerInfo, mapper: M, service: Arc<dyn EntityService<M::Entity>>)
    where
        M: EntityMapper,
        DependencyResolver: DependencyChecker<M::Entity>,
    {
        let handler = self.handler(info, mapper, service);
        self.push(handler);
    }

    fn push<E: usync_core::entity::SyncEntity>(&mut self, handler: EntityHandler<E>) {
        if let Err(err) = self.factory.register(Arc::new(handler)) {
            warn!(error = %err, "built in handler skipped");
        }
    }
}

/// A factory holding every built in handler, wired to `services`.
pub fn default_handlers(services: &SyncServices) -> HandlerFactory {
    use groups::{CONTENT, SETTINGS};

    let mut factory = HandlerFactory::new();
    let mut builder = Builder {
        lookup: Arc::new(services.clone()),
        resolver: Arc::new(DependencyResolver::new(services.clone())),
        factory: &mut factory,
    };

    builder.add(
        info("languageHandler", "Languages", "icon-globe", "Languages", SETTINGS, orders::LANGUAGES),
        LanguageMapper,
        Arc::clone(&services.languages),
    );
    builder.add(
        post_import(two_pass(info(
            "dictionaryHandler",
            "Dictionary",
            "icon-book-alt",
            "Dictionary",
            SETTINGS,
            orders::DICTIONARY,
        ))),
        DictionaryMapper,
        Arc::clone(&services.dictionary),
    );
    builder.add(
        two_pass(info("dataTypeHandler", "Datatypes", "icon-autofill", "DataTypes", SETTINGS, orders::DATA_TYPES)),
        DataTypeMapper::new(
            Arc::new(ConfigurationSerializerRegistry::with_defaults()),
            Arc::new(ConfigMergerRegistry::with_defaults()),
            Arc::clone(&services.data_types),
        ),
        Arc::clone(&services.data_types),
    );

    let content_types = builder
        .handler(
            post_import(two_pass(info(
                "contentTypeHandler",
                "DocTypes",
                "icon-item-arrangement",
                "ContentTypes",
                SETTINGS,
                orders::CONTENT_TYPES,
            ))),
            ContentTypeMapper::new(ContentTypeKind::Document),
            Arc::clone(&services.content_types),
        )
        .with_ordering(compositions);
    builder.push(content_types);

    builder.add(
        two_pass(info("mediaTypeHandler", "Media Types", "icon-thumbnails", "MediaTypes", SETTINGS, orders::MEDIA_TYPES)),
        ContentTypeMapper::new(ContentTypeKind::Media),
        Arc::clone(&services.content_types),
    );
    builder.add(
        two_pass(info("memberTypeHandler", "Member Types", "icon-users", "MemberTypes", SETTINGS, orders::MEMBER_TYPES)),
        ContentTypeMapper::new(ContentTypeKind::Member),
        Arc::clone(&services.content_types),
    );
    builder.add(
        post_import(info("templateHandler", "Templates", "icon-layout", "Templates", SETTINGS, orders::TEMPLATES)),
        TemplateMapper,
        Arc::clone(&services.templates),
    );
    builder.add(
        info("macroHandler", "Macros", "icon-settings-alt", "Macros", SETTINGS, orders::MACROS),
        MacroMapper,
        Arc::clone(&services.macros),
    );
    builder.add(
        clean(post_import(two_pass(info(
            "contentHandler",
            "Content",
            "icon-document",
            "Content",
            CONTENT,
            orders::CONTENT,
        )))),
        ContentMapper::new(ContentKind::Document),
        Arc::clone(&services.content),
    );
    builder.add(
        clean(post_import(two_pass(info("mediaHandler", "Media", "icon-picture", "Media", CONTENT, orders::MEDIA)))),
        ContentMapper::new(ContentKind::Media),
        Arc::clone(&services.content),
    );
    builder.add(
        info("domainHandler", "Domains", "icon-home", "Domains", SETTINGS, orders::DOMAINS),
        DomainMapper,
        Arc::clone(&services.domains),
    );
    builder.add(
        info("relationTypeHandler", "Relations", "icon-traffic", "RelationTypes", SETTINGS, orders::RELATION_TYPES),
        RelationTypeMapper,
        Arc::clone(&services.relation_types),
    );

    factory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::SyncHandler;
    use usync_core::entity::EntityKind;

    #[test]
    fn one_handler_per_kind() {
        let factory = default_handlers(&SyncServices::in_memory());
        assert_eq!(factory.len(), EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            assert!(factory.for_item_type(kind.item_type()).is_some(), "{kind:?}");
        }
    }

    #[test]
    fn priorities_follow_order_bands() {
        let factory = default_handlers(&SyncServices::in_memory());
        for handler in factory.all() {
            let kind = EntityKind::from_item_type(handler.item_type()).unwrap();
            assert_eq!(handler.priority(), kind.order());
        }
        let all = factory.all();
        assert_eq!(all.first().map(|h| h.alias()), Some("languageHandler"));
        assert_eq!(all.last().map(|h| h.alias()), Some("relationTypeHandler"));
    }

    #[test]
    fn composition_keys_are_read() {
        let key = Uuid::new_v4();
        let node = XElement::new("ContentType").with_child(
            XElement::new("Info").with_child(
                XElement::new("Compositions")
                    .with_child(XElement::text("Composition", "seo").with_attr("Key", key.to_string()))
                    .with_child(XElement::text("Composition", "broken").with_attr("Key", "nope")),
            ),
        );
        assert_eq!(compositions(&node), vec![key]);
    }
}
