//! Deterministic XML writer.

use crate::element::XElement;
use crate::error::{XmlError, XmlResult};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Write an element as a complete file document.
///
/// Output is indented with two spaces and starts with an XML declaration.
/// Attribute and child order are preserved, so the same element always
/// produces the same bytes.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn to_xml_string(element: &XElement) -> XmlResult<String> {
    let mut writer = XmlWriter::indented();
    writer.write_declaration()?;
    writer.write(element)?;
    writer.into_string()
}

/// Write an element without indentation or declaration.
///
/// Used when comparing two documents for equality.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn to_compact_string(element: &XElement) -> XmlResult<String> {
    let mut writer = XmlWriter::compact();
    writer.write(element)?;
    writer.into_string()
}

/// A writer producing sync XML.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Creates a writer that indents with two spaces.
    pub fn indented() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    /// Creates a writer with no formatting whitespace.
    pub fn compact() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    /// Writes the `<?xml ?>` declaration.
    pub fn write_declaration(&mut self) -> XmlResult<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(XmlError::write_failed)
    }

    /// Writes an element and all of its children.
    pub fn write(&mut self, element: &XElement) -> XmlResult<()> {
        write_element(&mut self.inner, element)
    }

    /// Consumes the writer and returns the document text.
    pub fn into_string(self) -> XmlResult<String> {
        String::from_utf8(self.inner.into_inner()).map_err(|_| XmlError::InvalidUtf8)
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XElement) -> XmlResult<()> {
    let mut start = BytesStart::new(element.name());
    for (name, value) in element.attributes() {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    let value = element.value();
    if value.is_empty() && element.elements().is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(XmlError::write_failed);
    }

    writer
        .write_event(Event::Start(start))
        .map_err(XmlError::write_failed)?;

    if !value.is_empty() {
        // a CDATA section cannot contain its own terminator
        let event = if element.is_cdata() && !value.contains("]]>") {
            Event::CData(BytesCData::new(value))
        } else {
            Event::Text(BytesText::new(value))
        };
        writer.write_event(event).map_err(XmlError::write_failed)?;
    }

    for child in element.elements() {
        write_element(writer, child)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(element.name())))
        .map_err(XmlError::write_failed)
}
