//! XML reader building an [`XElement`] tree.

use crate::element::XElement;
use crate::error::{XmlError, XmlResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse a document into its root element.
///
/// Indentation between child elements is dropped; text values keep their
/// leading and trailing whitespace. Declarations, comments and processing
/// instructions are skipped.
///
/// # Errors
///
/// Returns an error if the text is not well formed or has no single root.
pub fn parse(xml: &str) -> XmlResult<XElement> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<XElement> = Vec::new();
    let mut root: Option<XElement> = None;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(open_element(&start, position)?),
            Ok(Event::Empty(start)) => {
                let element = open_element(&start, position)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| XmlError::malformed(position, "unexpected closing tag"))?;
                element.drop_layout_whitespace();
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| XmlError::malformed(position, e.to_string()))?;
                    current.append_text(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    let text = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|_| XmlError::InvalidUtf8)?;
                    current.append_text(&text);
                    current.mark_cdata();
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(XmlError::malformed(position, e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::malformed(
            reader.buffer_position() as u64,
            "unclosed element at end of document",
        ));
    }

    root.ok_or(XmlError::NoRoot)
}

fn open_element(start: &BytesStart<'_>, position: u64) -> XmlResult<XElement> {
    let name = String::from_utf8(start.name().as_ref().to_vec()).map_err(|_| XmlError::InvalidUtf8)?;
    let mut element = XElement::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::malformed(position, e.to_string()))?;
        let key = String::from_utf8(attribute.key.as_ref().to_vec())
            .map_err(|_| XmlError::InvalidUtf8)?;
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::malformed(position, e.to_string()))?;
        element.set_attr(key, value.into_owned());
    }

    Ok(element)
}

fn attach(stack: &mut [XElement], root: &mut Option<XElement>, element: XElement) -> XmlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.add(element);
            Ok(())
        }
        None if root.is_some() => Err(XmlError::MultipleRoots),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}
