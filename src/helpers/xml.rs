//! XML reading utilities shared by the OOXML and OpenDocument readers.
//! Wraps the quick-xml pull parser and adds attribute and text helpers.

use crate::error::CfoError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while interpreting XML content
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown entity '&{0};'")]
    UnknownEntity(String),

    #[error("Attribute '{name}' has invalid value '{value}'")]
    InvalidAttribute { name: String, value: String },
}

/// Pull parser over a buffered source with a reusable event buffer
pub(crate) struct XmlEvents<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlEvents<R> {
    pub(crate) fn new(source: R) -> XmlEvents<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlEvents {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, or `None` once the document ends
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, CfoError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

/// Attribute lookup on start tags
pub(crate) trait AttributeLookup<'a> {
    /// Unescaped value of the attribute named `name`
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, CfoError>;

    /// Value of the attribute named `name` parsed as `T`
    fn parse_attribute<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, CfoError>;
}

impl<'a> AttributeLookup<'a> for BytesStart<'a> {
    fn attribute(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, CfoError> {
        match self.try_get_attribute(name)? {
            Some(attribute) => Ok(Some(attribute.unescape_value()?)),
            None => Ok(None),
        }
    }

    fn parse_attribute<T: FromStr>(&'a self, name: &str) -> Result<Option<T>, CfoError> {
        match self.attribute(name)? {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
                XmlError::InvalidAttribute {
                    name: name.to_owned(),
                    value: value.to_string(),
                }
                .into()
            }),
            None => Ok(None),
        }
    }
}

/// Accumulates character data from text and reference events
pub(crate) trait TextBuffer {
    fn push_text(&mut self, text: &BytesText) -> Result<(), CfoError>;

    /// Resolves `&amp;`-style entities and `&#NN;` character references
    fn push_reference(&mut self, reference: &BytesRef) -> Result<(), CfoError>;
}

impl TextBuffer for String {
    fn push_text(&mut self, text: &BytesText) -> Result<(), CfoError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_reference(&mut self, reference: &BytesRef) -> Result<(), CfoError> {
        let raw = reference.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = match number.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => number.parse::<u32>()?,
            };
            if let Some(character) = char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::UnknownEntity(raw.to_string()))?;
        }
        Ok(())
    }
}

/// Drives an [`XmlEvents`] reader to the end of the document, dispatching each
/// event to the given match arms; unmatched events are ignored.
#[macro_export]
macro_rules! on_xml_events {
    ($events:expr => { $($arms:tt)* }) => {
        while let Some(event) = $events.next()? {
            match event {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}
