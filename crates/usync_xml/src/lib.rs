//! # uSync XML
//!
//! The canonical on-disk representation of synced CMS items.
//!
//! Every item is stored as one XML document whose root element is the item
//! type (`DataType`, `ContentType`, `Content`, ...) and which always carries a
//! `Key` attribute holding the item's GUID. The key is the only identity that
//! is stable across environments.
//!
//! ## Canonical Form Rules
//!
//! - Attribute and child order are preserved exactly as built
//! - Empty values are written as self-closing elements
//! - Output is indented with two spaces after an XML declaration
//! - Deleted items are replaced by a tombstone:
//!   `<Empty Key=".." Alias=".." Change="Delete|Rename|Clean"/>`
//!
//! Serializing an unchanged item twice yields byte-identical text, which is
//! what change detection relies on.
//!
//! ## Usage
//!
//! ```
//! use usync_xml::{parse, to_xml_string, XElement};
//!
//! let node = XElement::new("Language")
//!     .with_attr("Key", "5f3c1f0e-7b8c-4d2a-9e1b-0a1b2c3d4e5f")
//!     .with_attr("Alias", "en-GB")
//!     .with_child(XElement::text("Name", "English (United Kingdom)"));
//!
//! let text = to_xml_string(&node).unwrap();
//! let parsed = parse(&text).unwrap();
//! assert_eq!(node, parsed);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod element;
mod error;
mod reader;
mod version;
mod writer;

pub use element::{EmptyAction, XElement, EMPTY_ELEMENT};
pub use error::{XmlError, XmlResult};
pub use reader::parse;
pub use version::{check_format, format_of, version_element, FormatCheck, FORMAT_VERSION, VERSION_FILE};
pub use writer::{to_compact_string, to_xml_string, XmlWriter};

/// Returns true if two elements serialize to the same canonical text.
pub fn same_xml(a: &XElement, b: &XElement) -> bool {
    match (to_compact_string(a), to_compact_string(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn element_strategy() -> impl Strategy<Value = XElement> {
        let leaf = (
            "[A-Z][a-zA-Z]{0,8}",
            proptest::collection::vec(("[A-Z][a-z]{0,5}", "[ -~]{0,12}"), 0..3),
            "[ -~]{0,20}",
            any::<bool>(),
        )
            .prop_map(|(name, attrs, value, cdata)| {
                let mut el = if cdata {
                    XElement::cdata(name, value)
                } else {
                    XElement::text(name, value)
                };
                for (k, v) in attrs {
                    el.set_attr(k, v);
                }
                el
            });

        leaf.prop_recursive(3, 24, 4, |inner| {
            ("[A-Z][a-zA-Z]{0,8}", proptest::collection::vec(inner, 1..4))
                .prop_map(|(name, children)| XElement::new(name).with_children(children))
        })
    }

    proptest! {
        #[test]
        fn write_then_parse_is_lossless(element in element_strategy()) {
            let text = to_xml_string(&element).unwrap();
            let parsed = parse(&text).unwrap();
            prop_assert!(same_xml(&parsed, &element));
            prop_assert_eq!(to_xml_string(&parsed).unwrap(), text);
        }
    }

    #[test]
    fn same_xml_ignores_formatting() {
        let a = parse("<A>\n  <B>1</B>\n</A>").unwrap();
        let b = parse("<A><B>1</B></A>").unwrap();
        assert!(same_xml(&a, &b));
    }
}
