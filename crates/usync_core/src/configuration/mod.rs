//! Property editor configuration: legacy migrations and root/child merging.

mod merge;
mod migration;

pub use merge::{
    difference_config, is_removed, merge_config, ArrayMerger, ConfigMerger, ConfigMergerRegistry,
    MergedProperty, REMOVED_LABEL,
};
pub use migration::{
    ColorPickerMigration, ConfigurationSerializer, ConfigurationSerializerRegistry,
    MultipleTextMigration, PickerMigration, TagsMigration, ValueListMigration,
};
