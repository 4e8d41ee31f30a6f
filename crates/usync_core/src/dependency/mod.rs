//! Dependency calculation and ordering.
//!
//! Every entity kind has a fixed order band; a stable sort by band and then
//! tree level gives a broadly correct processing order. Where items of the
//! same kind depend on each other (content type compositions) the explicit
//! [`topological_sort`] is used instead.

mod checker;
mod graph;

pub use checker::{DependencyChecker, DependencyResolver};
pub use graph::topological_sort;

use crate::udi::Udi;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Order bands per entity kind. Lower bands are processed first.
pub mod orders {
    /// Languages.
    pub const LANGUAGES: i32 = 5;
    /// Dictionary items.
    pub const DICTIONARY: i32 = 8;
    /// Data types.
    pub const DATA_TYPES: i32 = 10;
    /// Document types.
    pub const CONTENT_TYPES: i32 = 20;
    /// Media types.
    pub const MEDIA_TYPES: i32 = 25;
    /// Member types.
    pub const MEMBER_TYPES: i32 = 30;
    /// Templates.
    pub const TEMPLATES: i32 = 40;
    /// Macros.
    pub const MACROS: i32 = 70;
    /// Content.
    pub const CONTENT: i32 = 200;
    /// Media.
    pub const MEDIA: i32 = 210;
    /// Domains.
    pub const DOMAINS: i32 = 219;
    /// Relation types.
    pub const RELATION_TYPES: i32 = 230;
}

bitflags! {
    /// Controls how far a dependency calculation reaches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DependencyFlags: u32 {
        /// Include descendants of tree items.
        const INCLUDE_CHILDREN = 2;
        /// Include ancestors of tree items.
        const INCLUDE_ANCESTORS = 4;
        /// Include the types, data types and templates an item uses.
        const INCLUDE_DEPENDENCIES = 8;
        /// Include view files.
        const INCLUDE_VIEWS = 16;
        /// Include media referenced from property values.
        const INCLUDE_MEDIA = 32;
        /// Include content linked from property values.
        const INCLUDE_LINKED = 64;
        /// Include the physical media files.
        const INCLUDE_MEDIA_FILES = 128;
        /// Include items referenced from data type configuration.
        const INCLUDE_CONFIG = 256;
        /// Only the item itself.
        const NO_DEPENDENCIES = 1 << 10;
        /// Never include templates.
        const NO_TEMPLATES = 1 << 11;
    }
}

/// One node in a dependency set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDependency {
    /// Display name.
    pub name: String,
    /// Item identity.
    pub udi: Udi,
    /// Order band.
    pub order: i32,
    /// How the item should be processed.
    pub flags: DependencyFlags,
    /// Tree depth.
    pub level: i32,
}

impl SyncDependency {
    /// Creates a dependency in the order band of its kind.
    pub fn new(name: impl Into<String>, udi: Udi, level: i32, flags: DependencyFlags) -> Self {
        Self {
            name: name.into(),
            udi,
            order: udi.kind.order(),
            flags,
            level,
        }
    }
}

/// De-duplicates by UDI (merging flags) and stable sorts by order then level.
pub fn sort_dependencies(dependencies: Vec<SyncDependency>) -> Vec<SyncDependency> {
    let mut index: HashMap<Udi, usize> = HashMap::new();
    let mut unique: Vec<SyncDependency> = Vec::with_capacity(dependencies.len());

    for dependency in dependencies {
        match index.get(&dependency.udi) {
            Some(&i) => unique[i].flags |= dependency.flags,
            None => {
                index.insert(dependency.udi, unique.len());
                unique.push(dependency);
            }
        }
    }

    unique.sort_by_key(|d| (d.order, d.level));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use uuid::Uuid;

    fn dep(kind: EntityKind, level: i32, flags: DependencyFlags) -> SyncDependency {
        SyncDependency::new("x", Udi::new(kind, Uuid::new_v4()), level, flags)
    }

    #[test]
    fn sort_merges_duplicate_flags() {
        let a = dep(EntityKind::Document, 1, DependencyFlags::INCLUDE_CHILDREN);
        let mut again = a.clone();
        again.flags = DependencyFlags::INCLUDE_MEDIA;

        let sorted = sort_dependencies(vec![a.clone(), again]);
        assert_eq!(sorted.len(), 1);
        assert_eq!(
            sorted[0].flags,
            DependencyFlags::INCLUDE_CHILDREN | DependencyFlags::INCLUDE_MEDIA
        );
    }

    #[test]
    fn sort_orders_by_band_then_level() {
        let content_deep = dep(EntityKind::Document, 3, DependencyFlags::empty());
        let content_root = dep(EntityKind::Document, 1, DependencyFlags::empty());
        let data_type = dep(EntityKind::DataType, 1, DependencyFlags::empty());
        let template = dep(EntityKind::Template, 2, DependencyFlags::empty());

        let sorted = sort_dependencies(vec![
            content_deep.clone(),
            template.clone(),
            content_root.clone(),
            data_type.clone(),
        ]);
        let udis: Vec<Udi> = sorted.iter().map(|d| d.udi).collect();
        assert_eq!(
            udis,
            vec![data_type.udi, template.udi, content_root.udi, content_deep.udi]
        );
    }

    #[test]
    fn flags_serialize() {
        let flags = DependencyFlags::INCLUDE_CHILDREN | DependencyFlags::NO_TEMPLATES;
        let json = serde_json::to_string(&flags).unwrap();
        let back: DependencyFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
        assert_eq!(flags.bits(), 2 | 2048);
    }
}
