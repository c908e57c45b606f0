//! Event-based XML output shared by the engine and the GML codec.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
#[error("failed to write XML: {message}")]
pub struct XmlError {
    pub message: String,
}

/// Indented XML writer over an in-memory buffer. Attribute values and text
/// are escaped.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for XmlWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlWriter")
            .field("bytes", &self.inner.get_ref().len())
            .finish()
    }
}

impl XmlWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    /// # Errors
    /// Buffer write failure.
    pub fn declaration(&mut self) -> Result<(), XmlError> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    /// # Errors
    /// Buffer write failure.
    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), XmlError> {
        self.write(Event::Start(element(name, attrs)))
    }

    /// # Errors
    /// Buffer write failure.
    pub fn end(&mut self, name: &str) -> Result<(), XmlError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// # Errors
    /// Buffer write failure.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), XmlError> {
        self.write(Event::Empty(element(name, attrs)))
    }

    /// `<name attrs>text</name>`.
    ///
    /// # Errors
    /// Buffer write failure.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<(), XmlError> {
        self.write(Event::Start(element(name, attrs)))?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.write(Event::End(BytesEnd::new(name)))
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), XmlError> {
        self.inner.write_event(event).map_err(|e| XmlError {
            message: e.to_string(),
        })
    }
}

fn element<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for attr in attrs {
        start.push_attribute(*attr);
    }
    start
}
