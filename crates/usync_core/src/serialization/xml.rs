//! Small helpers shared by the mappers.

use crate::entity::ItemRef;
use crate::error::{CoreError, CoreResult};
use usync_xml::XElement;
use uuid::Uuid;

pub(crate) fn root(item_type: &str, key: Uuid, alias: &str, level: i32) -> XElement {
    XElement::new(item_type)
        .with_attr("Key", key.to_string())
        .with_attr("Alias", alias)
        .with_attr("Level", level.to_string())
}

pub(crate) fn text(name: &str, value: impl ToString) -> XElement {
    XElement::text(name, value.to_string())
}

pub(crate) fn optional(name: &str, value: Option<&str>) -> Option<XElement> {
    value.map(|v| XElement::text(name, v))
}

pub(crate) fn reference(name: &str, item: &ItemRef) -> XElement {
    XElement::text(name, item.alias.as_str()).with_attr("Key", item.key.to_string())
}

pub(crate) fn string(node: &XElement, path: &str) -> String {
    node.path(path).map(XElement::value).unwrap_or("").to_string()
}

pub(crate) fn optional_string(node: &XElement, path: &str) -> Option<String> {
    node.path(path)
        .map(XElement::value)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn boolean(node: &XElement, path: &str) -> bool {
    node.path(path)
        .is_some_and(|e| e.value().trim().eq_ignore_ascii_case("true"))
}

pub(crate) fn int(node: &XElement, path: &str) -> i32 {
    node.path(path)
        .and_then(|e| e.value().trim().parse().ok())
        .unwrap_or(0)
}

pub(crate) fn uuid(node: &XElement, path: &str) -> CoreResult<Uuid> {
    let raw = string(node, path);
    Uuid::parse_str(raw.trim())
        .map_err(|_| CoreError::invalid_node(format!("{path} is not a valid key: '{raw}'")))
}

/// Reads a `<Name Key="...">alias</Name>` reference. Elements without a key
/// are treated as no reference.
pub(crate) fn read_reference(element: &XElement) -> CoreResult<Option<ItemRef>> {
    match element.attr("Key").map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let key = Uuid::parse_str(raw).map_err(|_| {
                CoreError::invalid_node(format!("<{}> has an invalid key '{raw}'", element.name()))
            })?;
            Ok(Some(ItemRef::new(key, element.value())))
        }
    }
}

pub(crate) fn reference_at(node: &XElement, path: &str) -> CoreResult<Option<ItemRef>> {
    match node.path(path) {
        Some(element) => read_reference(element),
        None => Ok(None),
    }
}

pub(crate) fn references(node: &XElement, path: &str) -> CoreResult<Vec<ItemRef>> {
    node.path_all(path)
        .into_iter()
        .filter_map(|e| read_reference(e).transpose())
        .collect()
}

/// Keeps `existing` entries missing from `incoming`, matched by `same`.
pub(crate) fn keep_missing<T: Clone>(
    incoming: &mut Vec<T>,
    existing: &[T],
    same: impl Fn(&T, &T) -> bool,
) {
    for old in existing {
        if !incoming.iter().any(|new| same(new, old)) {
            incoming.push(old.clone());
        }
    }
}
