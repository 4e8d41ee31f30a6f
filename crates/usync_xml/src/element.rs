//! In-memory XML element tree.

use crate::error::{XmlError, XmlResult};
use uuid::Uuid;

/// Name of the root element used for tombstones.
pub const EMPTY_ELEMENT: &str = "Empty";

/// A single XML element.
///
/// Attributes keep their insertion order and elements either carry a text
/// value or child elements, which is all the sync file format needs. Two
/// elements built the same way always write byte-identical XML.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XElement {
    name: String,
    attributes: Vec<(String, String)>,
    value: Option<String>,
    cdata: bool,
    children: Vec<XElement>,
}

impl XElement {
    /// Create an element with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create a text element `<name>value</name>`.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name).with_value(value)
    }

    /// Create an element whose value is written as a CDATA section.
    pub fn cdata(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut element = Self::new(name).with_value(value);
        element.cdata = element.value.is_some();
        element
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds an attribute, replacing any existing attribute with the same name.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Sets an attribute in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Removes an attribute, returning its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Gets an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Sets the text value. Empty strings clear the value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.set_value(value);
        self
    }

    /// Sets the text value in place. Empty strings clear the value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.value = if value.is_empty() { None } else { Some(value) };
        if self.value.is_none() {
            self.cdata = false;
        }
    }

    /// The text value, or `""` when the element has none.
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    /// Returns true if the value should be written as CDATA.
    pub fn is_cdata(&self) -> bool {
        self.cdata
    }

    pub(crate) fn mark_cdata(&mut self) {
        self.cdata = true;
    }

    pub(crate) fn append_text(&mut self, text: &str) {
        match &mut self.value {
            Some(value) => value.push_str(text),
            None if !text.is_empty() => self.value = Some(text.to_string()),
            None => {}
        }
    }

    /// Drops indentation read between child elements.
    pub(crate) fn drop_layout_whitespace(&mut self) {
        let layout = self.value.as_deref().is_some_and(|v| v.trim().is_empty());
        if layout && !self.children.is_empty() {
            self.value = None;
            self.cdata = false;
        }
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: XElement) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several child elements.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = XElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Appends a child element in place.
    pub fn add(&mut self, child: XElement) {
        self.children.push(child);
    }

    /// All child elements.
    pub fn elements(&self) -> &[XElement] {
        &self.children
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&XElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable access to the first child with the given name.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut XElement> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Removes every child with the given name.
    pub fn remove_children(&mut self, name: &str) {
        self.children.retain(|c| c.name != name);
    }

    /// Text value of the first child with the given name.
    pub fn child_value(&self, name: &str) -> Option<&str> {
        self.child(name).map(XElement::value)
    }

    /// Resolves a slash delimited path of element names, e.g. `Info/Name`.
    ///
    /// An empty path resolves to the element itself.
    pub fn path(&self, path: &str) -> Option<&XElement> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Resolves a path where the last segment may repeat, returning every match.
    pub fn path_all(&self, path: &str) -> Vec<&XElement> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return vec![self];
        };
        let mut current = self;
        for segment in parents {
            match current.child(segment) {
                Some(next) => current = next,
                None => return Vec::new(),
            }
        }
        current.children.iter().filter(|c| c.name == *last).collect()
    }

    /// Parses the `Key` attribute.
    pub fn key(&self) -> XmlResult<Uuid> {
        let raw = self.attr("Key").ok_or_else(|| XmlError::MissingKey {
            element: self.name.clone(),
        })?;
        Uuid::parse_str(raw.trim()).map_err(|_| XmlError::InvalidKey {
            element: self.name.clone(),
            value: raw.to_string(),
        })
    }

    /// The `Alias` attribute, or `""`.
    pub fn alias(&self) -> &str {
        self.attr("Alias").unwrap_or("")
    }

    /// The `Level` attribute, defaulting to zero.
    pub fn level(&self) -> i32 {
        self.attr("Level")
            .and_then(|l| l.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Creates a tombstone element.
    pub fn empty(action: EmptyAction, alias: &str, key: Uuid) -> Self {
        Self::new(EMPTY_ELEMENT)
            .with_attr("Key", key.to_string())
            .with_attr("Alias", alias)
            .with_attr("Change", action.as_str())
    }

    /// Returns true if this element is a tombstone.
    pub fn is_empty_item(&self) -> bool {
        self.name == EMPTY_ELEMENT
    }

    /// The tombstone action, if this element is a tombstone.
    pub fn empty_action(&self) -> Option<EmptyAction> {
        if !self.is_empty_item() {
            return None;
        }
        self.attr("Change").and_then(EmptyAction::parse)
    }
}

/// What a tombstone records about the item it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmptyAction {
    /// The item was deleted upstream.
    Delete,
    /// The item was renamed and now lives in another file.
    Rename,
    /// Marks a folder whose children should be cleaned on import.
    Clean,
}

impl EmptyAction {
    /// Wire value of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmptyAction::Delete => "Delete",
            EmptyAction::Rename => "Rename",
            EmptyAction::Clean => "Clean",
        }
    }

    /// Parses a wire value (case insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "delete" => Some(EmptyAction::Delete),
            "rename" => Some(EmptyAction::Rename),
            "clean" => Some(EmptyAction::Clean),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XElement {
        XElement::new("ContentType")
            .with_attr("Key", "7b2c3a4e-3b1c-4f6a-9a52-0c3e1f7d2b11")
            .with_attr("Alias", "homePage")
            .with_attr("Level", "2")
            .with_child(XElement::new("Info").with_child(XElement::text("Name", "Home")))
            .with_child(
                XElement::new("GenericProperties")
                    .with_child(XElement::new("GenericProperty").with_child(XElement::text("Alias", "title")))
                    .with_child(XElement::new("GenericProperty").with_child(XElement::text("Alias", "body"))),
            )
    }

    #[test]
    fn attributes_replace_in_place() {
        let el = XElement::new("A").with_attr("x", "1").with_attr("y", "2").with_attr("x", "3");
        assert_eq!(el.attributes().len(), 2);
        assert_eq!(el.attr("x"), Some("3"));
        assert_eq!(el.attributes()[0].0, "x");
    }

    #[test]
    fn empty_value_is_cleared() {
        let el = XElement::cdata("Value", "");
        assert_eq!(el.value(), "");
        assert!(!el.is_cdata());
    }

    #[test]
    fn path_lookup() {
        let el = sample();
        assert_eq!(el.path("Info/Name").map(XElement::value), Some("Home"));
        assert!(el.path("Info/Missing").is_none());
        assert_eq!(el.path("").map(XElement::name), Some("ContentType"));
    }

    #[test]
    fn path_all_returns_repeats() {
        let el = sample();
        let props = el.path_all("GenericProperties/GenericProperty");
        assert_eq!(props.len(), 2);
        assert_eq!(props[1].child_value("Alias"), Some("body"));
        assert!(el.path_all("Nope/GenericProperty").is_empty());
    }

    #[test]
    fn key_alias_level() {
        let el = sample();
        assert!(el.key().is_ok());
        assert_eq!(el.alias(), "homePage");
        assert_eq!(el.level(), 2);
    }

    #[test]
    fn missing_and_invalid_keys() {
        let el = XElement::new("DataType");
        assert!(matches!(el.key(), Err(XmlError::MissingKey { .. })));

        let el = XElement::new("DataType").with_attr("Key", "not-a-guid");
        assert!(matches!(el.key(), Err(XmlError::InvalidKey { .. })));
    }

    #[test]
    fn tombstones() {
        let key = Uuid::new_v4();
        let el = XElement::empty(EmptyAction::Delete, "oldAlias", key);
        assert!(el.is_empty_item());
        assert_eq!(el.empty_action(), Some(EmptyAction::Delete));
        assert_eq!(el.key().unwrap(), key);
        assert_eq!(el.alias(), "oldAlias");
        assert_eq!(sample().empty_action(), None);
    }

    #[test]
    fn empty_action_parse_is_case_insensitive() {
        assert_eq!(EmptyAction::parse("CLEAN"), Some(EmptyAction::Clean));
        assert_eq!(EmptyAction::parse("rename"), Some(EmptyAction::Rename));
        assert_eq!(EmptyAction::parse("other"), None);
    }
}
