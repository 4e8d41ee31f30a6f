//! Test fixtures: a populated in-memory site and sync file helpers.

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use usync_core::entity::{
    Content, ContentKind, ContentType, ContentTypeKind, DataType, DictionaryItem, Domain, ItemRef, Language, Macro,
    PropertyType, PropertyValue, Relation, RelationType, Template, Translation,
};
use usync_core::services::{EntityService, SyncServices};
use usync_xml::{to_xml_string, XElement};
use uuid::Uuid;

/// Keys of the items in [`TestSite::populated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteKeys {
    /// `en-US`.
    pub english: Uuid,
    /// `da-DK`.
    pub danish: Uuid,
    /// Dictionary item `Home`.
    pub dictionary: Uuid,
    /// Text box data type.
    pub text_box: Uuid,
    /// Rich text data type.
    pub rich_text: Uuid,
    /// Element type used as a composition.
    pub seo: Uuid,
    /// Page document type composing `seo`.
    pub page: Uuid,
    /// Image media type.
    pub image: Uuid,
    /// Page template.
    pub layout: Uuid,
    /// Root content node.
    pub home: Uuid,
    /// Child of `home`.
    pub about: Uuid,
    /// Media item.
    pub logo: Uuid,
    /// Domain bound to `home`.
    pub domain: Uuid,
    /// Macro.
    pub latest_news: Uuid,
    /// Relation type.
    pub relate_on_copy: Uuid,
}

impl SiteKeys {
    fn generate() -> Self {
        Self {
            english: Uuid::new_v4(),
            danish: Uuid::new_v4(),
            dictionary: Uuid::new_v4(),
            text_box: Uuid::new_v4(),
            rich_text: Uuid::new_v4(),
            seo: Uuid::new_v4(),
            page: Uuid::new_v4(),
            image: Uuid::new_v4(),
            layout: Uuid::new_v4(),
            home: Uuid::new_v4(),
            about: Uuid::new_v4(),
            logo: Uuid::new_v4(),
            domain: Uuid::new_v4(),
            latest_news: Uuid::new_v4(),
            relate_on_copy: Uuid::new_v4(),
        }
    }
}

/// In-memory host services plus a temporary sync folder.
pub struct TestSite {
    /// The host services.
    pub services: SyncServices,
    /// Keys of the sample items; all nil for an empty site.
    pub keys: SiteKeys,
    _temp_dir: TempDir,
}

impl TestSite {
    /// A site with no items.
    pub fn empty() -> Self {
        Self {
            services: SyncServices::in_memory(),
            keys: SiteKeys {
                english: Uuid::nil(),
                danish: Uuid::nil(),
                dictionary: Uuid::nil(),
                text_box: Uuid::nil(),
                rich_text: Uuid::nil(),
                seo: Uuid::nil(),
                page: Uuid::nil(),
                image: Uuid::nil(),
                layout: Uuid::nil(),
                home: Uuid::nil(),
                about: Uuid::nil(),
                logo: Uuid::nil(),
                domain: Uuid::nil(),
                latest_news: Uuid::nil(),
                relate_on_copy: Uuid::nil(),
            },
            _temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// A small site with one or more items of every kind.
    pub fn populated() -> Self {
        let mut site = Self::empty();
        site.keys = SiteKeys::generate();
        populate(&site.services, &site.keys);
        site
    }

    /// The site's sync folder.
    pub fn folder(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Total number of items across every service.
    pub fn item_count(&self) -> usize {
        let s = &self.services;
        [
            s.data_types.get_all().map(|v| v.len()),
            s.content_types.get_all().map(|v| v.len()),
            s.templates.get_all().map(|v| v.len()),
            s.content.get_all().map(|v| v.len()),
            s.dictionary.get_all().map(|v| v.len()),
            s.languages.get_all().map(|v| v.len()),
            s.domains.get_all().map(|v| v.len()),
            s.macros.get_all().map(|v| v.len()),
            s.relation_types.get_all().map(|v| v.len()),
        ]
        .into_iter()
        .map(|count| count.expect("Failed to list items"))
        .sum()
    }
}

fn populate(services: &SyncServices, keys: &SiteKeys) {
    let save = "Failed to save fixture";

    services
        .languages
        .save(Language::new(keys.english, "en-US", "English (United States)"))
        .expect(save);
    services
        .languages
        .save(Language::new(keys.danish, "da-DK", "Danish"))
        .expect(save);

    let mut dictionary = DictionaryItem::new(keys.dictionary, "Home");
    dictionary.translations = vec![
        Translation {
            language: "en-US".into(),
            value: "Home".into(),
        },
        Translation {
            language: "da-DK".into(),
            value: "Hjem".into(),
        },
    ];
    services.dictionary.save(dictionary).expect(save);

    services
        .data_types
        .save(DataType::new(keys.text_box, "Textstring", "Umbraco.TextBox").with_config(json!({ "maxChars": 500 })))
        .expect(save);
    services
        .data_types
        .save(DataType::new(keys.rich_text, "Rich Text", "Umbraco.TinyMCE"))
        .expect(save);

    services
        .templates
        .save(Template::new(keys.layout, "layout", "Layout"))
        .expect(save);

    let mut seo = ContentType::new(ContentTypeKind::Document, keys.seo, "seo", "SEO");
    seo.is_element = true;
    seo.properties
        .push(PropertyType::new(Uuid::new_v4(), "metaTitle", "Meta title", keys.text_box));
    services.content_types.save(seo).expect(save);

    let mut page = ContentType::new(ContentTypeKind::Document, keys.page, "page", "Page");
    page.allow_at_root = true;
    page.compositions.push(ItemRef::new(keys.seo, "seo"));
    page.allowed_templates.push(ItemRef::new(keys.layout, "layout"));
    page.default_template = Some("layout".into());
    page.properties
        .push(PropertyType::new(Uuid::new_v4(), "title", "Title", keys.text_box));
    page.properties
        .push(PropertyType::new(Uuid::new_v4(), "bodyText", "#Home", keys.rich_text));
    page.structure.push(ItemRef::new(keys.page, "page"));
    services.content_types.save(page).expect(save);

    let image = ContentType::new(ContentTypeKind::Media, keys.image, "image", "Image");
    services.content_types.save(image).expect(save);

    let mut home = Content::new(ContentKind::Document, keys.home, "Home", "page");
    home.published = true;
    home.template = Some(ItemRef::new(keys.layout, "layout"));
    home.properties.push(PropertyValue::new("title", "Welcome"));
    let about = Content::new(ContentKind::Document, keys.about, "About", "page")
        .under(&home);
    services.content.save(home).expect(save);
    services.content.save(about).expect(save);

    services
        .content
        .save(Content::new(ContentKind::Media, keys.logo, "Logo", "image"))
        .expect(save);

    let mut domain = Domain::new(keys.domain, "example.com");
    domain.root = Some(ItemRef::new(keys.home, "Home"));
    domain.language = Some("en-US".into());
    services.domains.save(domain).expect(save);

    services
        .macros
        .save(Macro::new(keys.latest_news, "latestNews", "Latest news"))
        .expect(save);

    let mut relation = RelationType::new(keys.relate_on_copy, "relateDocumentOnCopy", "Relate Document On Copy");
    relation.relations.push(Relation {
        parent: keys.home,
        child: keys.about,
        comment: String::new(),
    });
    services.relation_types.save(relation).expect(save);
}

/// A minimal content type sync file with the given compositions.
pub fn content_type_node(key: Uuid, alias: &str, compositions: &[(Uuid, &str)]) -> XElement {
    XElement::new("ContentType")
        .with_attr("Key", key.to_string())
        .with_attr("Alias", alias)
        .with_attr("Level", "1")
        .with_child(
            XElement::new("Info")
                .with_child(XElement::text("Name", alias))
                .with_child(XElement::new("Compositions").with_children(compositions.iter().map(|(k, a)| {
                    XElement::text("Composition", *a).with_attr("Key", k.to_string())
                }))),
        )
}

/// Writes a node to `folder/relative`, creating directories.
pub fn write_node(folder: &Path, relative: &str, node: &XElement) -> PathBuf {
    let path = folder.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create folder");
    }
    fs::write(&path, to_xml_string(node).expect("Failed to write XML")).expect("Failed to write file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_site_has_every_kind() {
        let site = TestSite::populated();
        assert_eq!(site.item_count(), 15);
        assert!(site.folder().exists());
    }

    #[test]
    fn empty_site_is_empty() {
        let site = TestSite::empty();
        assert_eq!(site.item_count(), 0);
        assert!(site.keys.home.is_nil());
    }

    #[test]
    fn write_node_creates_folders() {
        let site = TestSite::empty();
        let node = content_type_node(Uuid::new_v4(), "a", &[]);
        let path = write_node(site.folder(), "ContentTypes/a.config", &node);
        assert!(path.exists());
    }
}
