//! Per-entity dependency checkers.

use super::{DependencyFlags, SyncDependency};
use crate::entity::{
    Content, ContentType, DataType, DictionaryItem, Domain, EntityKind, Language, Macro,
    RelationType, SyncEntity, Template,
};
use crate::error::CoreResult;
use crate::services::{EntityLookup, SyncServices};
use crate::udi::Udi;
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// Computes the items that must be synced alongside an item.
///
/// The result always starts with the item itself. It is not sorted; pass it
/// through [`sort_dependencies`](super::sort_dependencies) before use.
pub trait DependencyChecker<E> {
    /// Dependencies of `item`.
    fn get_dependencies(&self, item: &E, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>>;
}

/// Dependency checker backed by the host services.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    services: SyncServices,
}

fn dependency<E: SyncEntity>(item: &E, flags: DependencyFlags) -> SyncDependency {
    SyncDependency::new(item.name(), item.udi(), item.level(), flags)
}

fn include(flags: DependencyFlags, flag: DependencyFlags) -> bool {
    flags.contains(flag) && !flags.contains(DependencyFlags::NO_DEPENDENCIES)
}

impl DependencyResolver {
    /// Creates a resolver over the given services.
    pub fn new(services: SyncServices) -> Self {
        Self { services }
    }

    /// Data types used by the properties of a content type.
    fn data_types(&self, item: &ContentType, out: &mut Vec<SyncDependency>) -> CoreResult<()> {
        for property in &item.properties {
            if let Some(data_type) = self.services.data_types.get(property.data_type)? {
                out.push(dependency(&data_type, DependencyFlags::empty()));
            }
        }
        Ok(())
    }

    /// Compositions and parents of a content type, recursively.
    ///
    /// `visited` holds every content type already walked, so composition
    /// cycles terminate.
    fn compositions(
        &self,
        item: &ContentType,
        visited: &mut HashSet<Uuid>,
        out: &mut Vec<SyncDependency>,
    ) -> CoreResult<()> {
        for reference in item.compositions.iter().chain(item.parent.iter()) {
            if !visited.insert(reference.key) {
                continue;
            }
            if let Some(composition) = self.services.content_types.get(reference.key)? {
                out.push(dependency(&composition, DependencyFlags::empty()));
                self.data_types(&composition, out)?;
                self.compositions(&composition, visited, out)?;
            }
        }
        Ok(())
    }

    /// Dictionary items referenced by `#key` labels.
    fn dictionary_labels<'a>(
        &self,
        labels: impl Iterator<Item = &'a str>,
        out: &mut Vec<SyncDependency>,
    ) -> CoreResult<()> {
        for label in labels {
            if let Some(item_key) = label.strip_prefix('#') {
                if let Some(item) = self.services.dictionary.get_by_alias(item_key)? {
                    out.push(dependency(&item, DependencyFlags::empty()));
                }
            }
        }
        Ok(())
    }

    fn template_by_alias(&self, alias: &str, out: &mut Vec<SyncDependency>) -> CoreResult<()> {
        if let Some(template) = self.services.templates.get_by_alias(alias)? {
            out.push(dependency(&template, DependencyFlags::empty()));
        }
        Ok(())
    }

    fn content_type_of(&self, content: &Content) -> CoreResult<Option<ContentType>> {
        let kind = content.kind.type_kind();
        Ok(self
            .services
            .content_types
            .get_all()?
            .into_iter()
            .find(|t| t.kind() == kind && t.alias.eq_ignore_ascii_case(&content.content_type)))
    }

    fn content_ancestors(&self, content: &Content, out: &mut Vec<SyncDependency>) -> CoreResult<()> {
        let mut visited = HashSet::from([content.key]);
        let mut next = content.parent_key();
        while let Some(key) = next {
            if !visited.insert(key) {
                break;
            }
            match self.services.content.get(key)? {
                Some(parent) => {
                    out.push(dependency(&parent, DependencyFlags::empty()));
                    next = parent.parent_key();
                }
                None => break,
            }
        }
        Ok(())
    }

    fn content_descendants(
        &self,
        content: &Content,
        flags: DependencyFlags,
        visited: &mut HashSet<Uuid>,
        out: &mut Vec<SyncDependency>,
    ) -> CoreResult<()> {
        for child in self.services.content.children(Some(content.key))? {
            if visited.insert(child.key) {
                out.extend(self.get_dependencies(&child, flags - DependencyFlags::INCLUDE_CHILDREN)?);
                self.content_descendants(&child, flags, visited, out)?;
            }
        }
        Ok(())
    }

    /// Items referenced by UDI from property values.
    fn linked(&self, content: &Content, flags: DependencyFlags, out: &mut Vec<SyncDependency>) {
        for property in &content.properties {
            for udi in Udi::find_all(&property.value) {
                let wanted = match udi.kind {
                    EntityKind::Document => include(flags, DependencyFlags::INCLUDE_LINKED),
                    EntityKind::Media => include(flags, DependencyFlags::INCLUDE_MEDIA),
                    _ => false,
                };
                if !wanted || udi.key == content.key {
                    continue;
                }
                if let Some(name) = self.services.name_of(&udi) {
                    out.push(SyncDependency::new(name, udi, 1, DependencyFlags::empty()));
                }
            }
        }
    }
}

impl DependencyChecker<ContentType> for DependencyResolver {
    fn get_dependencies(
        &self,
        item: &ContentType,
        flags: DependencyFlags,
    ) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if flags.contains(DependencyFlags::NO_DEPENDENCIES) {
            return Ok(out);
        }

        self.data_types(item, &mut out)?;
        let mut visited = HashSet::from([item.key]);
        self.compositions(item, &mut visited, &mut out)?;

        let labels = item
            .properties
            .iter()
            .map(|p| p.name.as_str())
            .chain(item.tabs.iter().map(|t| t.caption.as_str()));
        self.dictionary_labels(labels, &mut out)?;

        if !flags.contains(DependencyFlags::NO_TEMPLATES) {
            for template in &item.allowed_templates {
                if let Some(template) = self.services.templates.get(template.key)? {
                    out.push(dependency(&template, DependencyFlags::empty()));
                }
            }
        }

        if flags.contains(DependencyFlags::INCLUDE_CHILDREN) {
            for child in self.services.content_types.children(Some(item.key))? {
                if visited.insert(child.key) {
                    out.extend(self.get_dependencies(&child, flags)?);
                }
            }
        }
        Ok(out)
    }
}

impl DependencyChecker<Content> for DependencyResolver {
    fn get_dependencies(&self, item: &Content, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if flags.contains(DependencyFlags::NO_DEPENDENCIES) {
            return Ok(out);
        }

        if flags.contains(DependencyFlags::INCLUDE_DEPENDENCIES) {
            if let Some(content_type) = self.content_type_of(item)? {
                out.extend(self.get_dependencies(
                    &content_type,
                    DependencyFlags::NO_TEMPLATES,
                )?);
            }
            if !flags.contains(DependencyFlags::NO_TEMPLATES) {
                if let Some(template) = &item.template {
                    self.template_by_alias(&template.alias, &mut out)?;
                }
            }
        }

        if flags.contains(DependencyFlags::INCLUDE_ANCESTORS) {
            self.content_ancestors(item, &mut out)?;
        }

        self.linked(item, flags, &mut out);

        if flags.contains(DependencyFlags::INCLUDE_CHILDREN) {
            let mut visited = HashSet::from([item.key]);
            self.content_descendants(item, flags, &mut visited, &mut out)?;
        }
        Ok(out)
    }
}

impl DependencyChecker<DataType> for DependencyResolver {
    fn get_dependencies(&self, item: &DataType, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if !include(flags, DependencyFlags::INCLUDE_CONFIG) {
            return Ok(out);
        }

        let mut keys = Vec::new();
        element_type_keys(&item.config, &mut keys);
        for key in keys {
            if let Some(element_type) = self.services.content_types.get(key)? {
                out.push(dependency(&element_type, DependencyFlags::empty()));
            }
        }
        for udi in Udi::find_all(&item.config.to_string()) {
            if let Some(name) = self.services.name_of(&udi) {
                out.push(SyncDependency::new(name, udi, 1, DependencyFlags::empty()));
            }
        }
        Ok(out)
    }
}

/// Collects `*ElementTypeKey` values from a block editor configuration.
fn element_type_keys(value: &Value, keys: &mut Vec<Uuid>) {
    match value {
        Value::Object(map) => {
            for (name, inner) in map {
                if name.ends_with("ElementTypeKey") {
                    if let Some(key) = inner.as_str().and_then(|s| Uuid::parse_str(s).ok()) {
                        keys.push(key);
                    }
                } else {
                    element_type_keys(inner, keys);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|i| element_type_keys(i, keys)),
        _ => {}
    }
}

impl DependencyChecker<Template> for DependencyResolver {
    fn get_dependencies(&self, item: &Template, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if flags.contains(DependencyFlags::NO_DEPENDENCIES) {
            return Ok(out);
        }

        let mut visited = HashSet::from([item.key]);
        let mut master = item.master.as_ref().map(|m| m.key);
        while let Some(key) = master {
            if !visited.insert(key) {
                break;
            }
            let Some(template) = self.services.templates.get(key)? else {
                break;
            };
            out.push(dependency(&template, DependencyFlags::empty()));
            master = template.parent_key();
        }

        if flags.contains(DependencyFlags::INCLUDE_CHILDREN) {
            for child in self.services.templates.children(Some(item.key))? {
                out.extend(self.get_dependencies(&child, flags)?);
            }
        }
        Ok(out)
    }
}

impl DependencyChecker<DictionaryItem> for DependencyResolver {
    fn get_dependencies(
        &self,
        item: &DictionaryItem,
        flags: DependencyFlags,
    ) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if flags.contains(DependencyFlags::NO_DEPENDENCIES) {
            return Ok(out);
        }

        for translation in &item.translations {
            if let Some(language) = self.services.languages.get_by_alias(&translation.language)? {
                out.push(dependency(&language, DependencyFlags::empty()));
            }
        }

        let mut visited = HashSet::from([item.key]);
        let mut parent = item.parent_key();
        while let Some(key) = parent {
            if !visited.insert(key) {
                break;
            }
            let Some(ancestor) = self.services.dictionary.get(key)? else {
                break;
            };
            out.push(dependency(&ancestor, DependencyFlags::empty()));
            parent = ancestor.parent_key();
        }

        if flags.contains(DependencyFlags::INCLUDE_CHILDREN) {
            for child in self.services.dictionary.children(Some(item.key))? {
                out.extend(self.get_dependencies(&child, flags)?);
            }
        }
        Ok(out)
    }
}

impl DependencyChecker<Language> for DependencyResolver {
    fn get_dependencies(&self, item: &Language, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if !flags.contains(DependencyFlags::NO_DEPENDENCIES) {
            if let Some(fallback) = &item.fallback {
                if let Some(language) = self.services.languages.get_by_alias(fallback)? {
                    out.push(dependency(&language, DependencyFlags::empty()));
                }
            }
        }
        Ok(out)
    }
}

impl DependencyChecker<Domain> for DependencyResolver {
    fn get_dependencies(&self, item: &Domain, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>> {
        let mut out = vec![dependency(item, flags)];
        if flags.contains(DependencyFlags::NO_DEPENDENCIES) {
            return Ok(out);
        }
        if let Some(language) = &item.language {
            if let Some(language) = self.services.languages.get_by_alias(language)? {
                out.push(dependency(&language, DependencyFlags::empty()));
            }
        }
        if let Some(root) = &item.root {
            if let Some(content) = self.services.content.get(root.key)? {
                out.push(dependency(&content, DependencyFlags::empty()));
            }
        }
        Ok(out)
    }
}

impl DependencyChecker<Macro> for DependencyResolver {
    fn get_dependencies(&self, item: &Macro, flags: DependencyFlags) -> CoreResult<Vec<SyncDependency>> {
        Ok(vec![dependency(item, flags)])
    }
}

impl DependencyChecker<RelationType> for DependencyResolver {
    fn get_dependencies(
        &self,
        item: &RelationType,
        flags: DependencyFlags,
    ) -> CoreResult<Vec<SyncDependency>> {
        Ok(vec![dependency(item, flags)])
    }
}
