use crate::configuration::{ConfigMergerRegistry, ConfigurationSerializerRegistry};
use crate::entity::{DataType, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::serialization::xml::{optional, optional_string, root, string};
use crate::serialization::{EntityMapper, MapContext, Mapped};
use crate::services::EntityService;
use crate::udi::Udi;
use serde_json::{Map, Value};
use std::sync::Arc;
use usync_xml::XElement;
use uuid::Uuid;

/// Maps data types.
///
/// ```xml
/// <DataType Key=".." Alias="Textstring" Level="1">
///   <Info><Name/><EditorAlias/><DatabaseType/><Folder/></Info>
///   <Config Root=".."><![CDATA[{ ... }]]></Config>
/// </DataType>
/// ```
///
/// Legacy configuration is migrated on import. A `Root` attribute on the
/// config marks it as a difference to merge over the root data type.
pub struct DataTypeMapper {
    migrations: Arc<ConfigurationSerializerRegistry>,
    mergers: Arc<ConfigMergerRegistry>,
    data_types: Arc<dyn EntityService<DataType>>,
}

impl std::fmt::Debug for DataTypeMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTypeMapper").finish_non_exhaustive()
    }
}

impl DataTypeMapper {
    /// Creates a mapper.
    pub fn new(
        migrations: Arc<ConfigurationSerializerRegistry>,
        mergers: Arc<ConfigMergerRegistry>,
        data_types: Arc<dyn EntityService<DataType>>,
    ) -> Self {
        Self {
            migrations,
            mergers,
            data_types,
        }
    }

    /// Writes `item` storing only its configuration difference from `root`.
    pub fn to_difference_xml(&self, item: &DataType, root: &DataType) -> CoreResult<XElement> {
        let difference = self.mergers.difference(&item.editor_alias, &root.config, &item.config);
        let mut node = self.to_xml(item)?;
        node.remove_children("Config");
        node.add(
            XElement::cdata("Config", serde_json::to_string_pretty(&difference)?)
                .with_attr("Root", root.key.to_string()),
        );
        Ok(node)
    }
}

impl EntityMapper for DataTypeMapper {
    type Entity = DataType;

    fn kind(&self) -> EntityKind {
        EntityKind::DataType
    }

    fn to_xml(&self, item: &DataType) -> CoreResult<XElement> {
        let info = XElement::new("Info")
            .with_child(XElement::text("Name", item.name.as_str()))
            .with_child(XElement::text("EditorAlias", item.editor_alias.as_str()))
            .with_child(XElement::text("DatabaseType", item.database_type.as_str()))
            .with_children(optional("Folder", item.folder.as_deref()));

        Ok(root("DataType", item.key, &item.name, 1)
            .with_child(info)
            .with_child(XElement::cdata("Config", serde_json::to_string_pretty(&item.config)?)))
    }

    fn from_xml(
        &self,
        node: &XElement,
        existing: Option<&DataType>,
        ctx: &MapContext<'_>,
    ) -> CoreResult<Mapped<DataType>> {
        let key = node.key()?;
        let editor_alias = string(node, "Info/EditorAlias");
        if editor_alias.is_empty() {
            return Err(CoreError::invalid_node("data type has no editor alias"));
        }
        let name = match string(node, "Info/Name") {
            name if name.is_empty() => node.alias().to_string(),
            name => name,
        };

        let config_node = node.child("Config");
        let raw = config_node.map(XElement::value).unwrap_or("").trim();
        let config: Value = if raw.is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(raw)?
        };
        let mut config = self.migrations.import(&editor_alias, &config);

        let mut pending = Vec::new();
        if let Some(root_key) = config_node.and_then(|c| c.attr("Root")) {
            let root_key = Uuid::parse_str(root_key.trim())
                .map_err(|_| CoreError::invalid_node(format!("invalid config root '{root_key}'")))?;
            let root_udi = Udi::new(EntityKind::DataType, root_key);
            match self.data_types.get(root_key)? {
                Some(root) => {
                    config = self.mergers.merge(&editor_alias, &root.config, &config);
                }
                None => {
                    ctx.resolve(root_udi, &mut pending);
                    if let Some(existing) = existing {
                        config = existing.config.clone();
                    }
                }
            }
        }

        let database_type = match string(node, "Info/DatabaseType") {
            t if t.is_empty() => existing
                .map(|e| e.database_type.clone())
                .unwrap_or_else(|| "Nvarchar".to_string()),
            t => t,
        };

        Ok(Mapped::new(DataType {
            key,
            name,
            editor_alias,
            database_type,
            folder: optional_string(node, "Info/Folder"),
            config,
        })
        .with_pending(pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeType;
    use crate::serialization::{SerializerFlags, SerializerOptions, SyncSerializer, XmlSerializer};
    use crate::services::SyncServices;
    use serde_json::json;

    fn serializer(services: &SyncServices) -> XmlSerializer<DataTypeMapper> {
        let mapper = DataTypeMapper::new(
            Arc::new(ConfigurationSerializerRegistry::with_defaults()),
            Arc::new(ConfigMergerRegistry::with_defaults()),
            services.data_types.clone(),
        );
        XmlSerializer::new(mapper, services.data_types.clone(), Arc::new(services.clone()))
    }

    #[test]
    fn roundtrip_and_no_change() {
        let services = SyncServices::in_memory();
        let serializer = serializer(&services);
        let item = DataType::new(Uuid::new_v4(), "Multiple", "Umbraco.MultipleTextstring")
            .with_config(json!({"max": 4, "min": 1}));

        let node = serializer.serialize(&item).into_item().unwrap();
        let created = serializer.deserialize(&node, &SerializerOptions::default());
        assert_eq!(created.change(), ChangeType::Create);
        assert_eq!(created.item(), Some(&item));

        let again = serializer.deserialize(&node, &SerializerOptions::default());
        assert_eq!(again.change(), ChangeType::NoChange);
        assert!(!again.saved());
        assert_eq!(serializer.is_current(&node, &SerializerOptions::default()), ChangeType::NoChange);
    }

    #[test]
    fn legacy_config_is_migrated_on_import() {
        let services = SyncServices::in_memory();
        let serializer = serializer(&services);
        let item = DataType::new(Uuid::new_v4(), "Tags", "Umbraco.Tags")
            .with_config(json!({"StorageType": 1, "Group": "default"}));
        let node = serializer.serialize(&item).into_item().unwrap();

        let imported = serializer.deserialize(&node, &SerializerOptions::default());
        assert_eq!(
            imported.item().unwrap().config,
            json!({"storageType": ["Json"], "group": "default"})
        );
    }

    #[test]
    fn bad_json_is_a_failure() {
        let services = SyncServices::in_memory();
        let serializer = serializer(&services);
        let node = root("DataType", Uuid::new_v4(), "Broken", 1)
            .with_child(XElement::new("Info").with_child(XElement::text("EditorAlias", "Umbraco.TextBox")))
            .with_child(XElement::cdata("Config", "{ not json"));

        let attempt = serializer.deserialize(&node, &SerializerOptions::default());
        assert!(!attempt.success());
        assert_eq!(attempt.change(), ChangeType::Fail);
        assert!(services.data_types.get_all().unwrap().is_empty());
    }

    #[test]
    fn difference_config_merges_with_root() {
        let services = SyncServices::in_memory();
        let serializer = serializer(&services);
        let root_type = DataType::new(Uuid::new_v4(), "Blocks", "Umbraco.BlockList").with_config(json!({
            "blocks": [{"contentElementTypeKey": "a", "label": "A"}, {"contentElementTypeKey": "b", "label": "B"}],
            "max": 5
        }));
        let child = DataType::new(Uuid::new_v4(), "Site Blocks", "Umbraco.BlockList").with_config(json!({
            "blocks": [{"contentElementTypeKey": "a", "label": "A"}, {"contentElementTypeKey": "c", "label": "C"}],
            "max": 5
        }));

        let node = serializer.mapper().to_difference_xml(&child, &root_type).unwrap();
        assert_eq!(node.child("Config").unwrap().attr("Root"), Some(root_type.key.to_string().as_str()));

        // Root missing: the import is deferred.
        let first = serializer.deserialize(&node, &SerializerOptions::default());
        assert!(first.requires_second_pass());

        services.data_types.save(root_type).unwrap();
        let second = serializer.deserialize_second_pass(&node, &SerializerOptions::default());
        assert!(second.success());
        let blocks = second.item().unwrap().config["blocks"].as_array().unwrap().clone();
        let keys: Vec<&str> = blocks
            .iter()
            .map(|b| b["contentElementTypeKey"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["c", "a"]);
    }

    #[test]
    fn force_saves_unchanged_items() {
        let services = SyncServices::in_memory();
        let serializer = serializer(&services);
        let item = DataType::new(Uuid::new_v4(), "Text", "Umbraco.TextBox");
        services.data_types.save(item.clone()).unwrap();
        let node = serializer.serialize(&item).into_item().unwrap();

        let forced = serializer.deserialize(&node, &SerializerOptions::new(SerializerFlags::FORCE));
        assert_eq!(forced.change(), ChangeType::NoChange);
        assert!(forced.saved());
    }
}
