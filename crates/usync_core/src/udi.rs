//! Stable identifiers for CMS entities.

use crate::entity::EntityKind;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique document identifier: entity kind plus GUID key.
///
/// Printed as `umb://<entity-type>/<key without dashes>`. The key is the
/// identity that survives moving items between environments; aliases and
/// names may legitimately differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Udi {
    /// The kind of entity.
    pub kind: EntityKind,
    /// The entity key.
    pub key: Uuid,
}

impl Udi {
    /// Creates a new UDI.
    pub const fn new(kind: EntityKind, key: Uuid) -> Self {
        Self { kind, key }
    }

    /// Finds every UDI embedded in a block of text.
    ///
    /// Property values frequently hold references as `umb://document/...`
    /// strings inside JSON or HTML, so this scans rather than parses.
    pub fn find_all(text: &str) -> Vec<Udi> {
        const PREFIX: &str = "umb://";
        let mut found = Vec::new();
        let mut rest = text;

        while let Some(start) = rest.find(PREFIX) {
            let candidate = &rest[start..];
            let end = candidate
                .char_indices()
                .skip(PREFIX.len())
                .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '/'))
                .map(|(i, _)| i)
                .unwrap_or(candidate.len());

            if let Ok(udi) = candidate[..end].parse::<Udi>() {
                if !found.contains(&udi) {
                    found.push(udi);
                }
            }
            rest = &candidate[PREFIX.len()..];
        }

        found
    }
}

impl fmt::Display for Udi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "umb://{}/{}", self.kind.udi_type(), self.key.simple())
    }
}

impl FromStr for Udi {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("umb://")
            .ok_or_else(|| CoreError::InvalidUdi(s.to_string()))?;
        let (entity_type, key) = body
            .split_once('/')
            .ok_or_else(|| CoreError::InvalidUdi(s.to_string()))?;
        let kind =
            EntityKind::from_udi_type(entity_type).ok_or_else(|| CoreError::InvalidUdi(s.to_string()))?;
        let key = Uuid::parse_str(key).map_err(|_| CoreError::InvalidUdi(s.to_string()))?;
        Ok(Self { kind, key })
    }
}
