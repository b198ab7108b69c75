//! Streaming XML access for the OOXML parts of an `.xlsx` package.
//! Wraps `quick_xml::Reader` with a reusable buffer and adds attribute and text helpers.

use crate::error::SheetSummaryError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Unknown XML entity '&{0};'")]
    EntityError(String),

    #[error("Cannot parse attribute value '{0}'")]
    AttributeValueError(String),
}

/// Pull reader over one XML part.
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(source: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` must produce Start + End so cell bookkeeping stays uniform
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, or `None` at end of input.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SheetSummaryError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }
}

pub(crate) trait XmlAttributeHelper<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SheetSummaryError>;

    fn parse_value<T: FromStr>(&self) -> Result<T, SheetSummaryError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SheetSummaryError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, SheetSummaryError> {
        let value = self.get_value()?;
        value
            .parse()
            .map_err(|_| XmlError::AttributeValueError(value.to_string()).into())
    }
}

pub(crate) trait XmlNodeHelper<'a> {
    /// Unescaped value of attribute `name`, matched on the full (prefixed) name.
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetSummaryError>;

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetSummaryError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SheetSummaryError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, SheetSummaryError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

pub(crate) trait XmlTextContextHelper {
    /// Appends the character an entity or character reference stands for.
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetSummaryError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SheetSummaryError> {
        let raw = bytes.xml_content()?;
        match raw.strip_prefix('#') {
            Some(number) => {
                let code = match number.strip_prefix('x') {
                    Some(hex) => u32::from_str_radix(hex, 16)?,
                    None => number.parse::<u32>()?,
                };
                if let Some(character) = char::from_u32(code) {
                    self.push(character);
                }
            }
            None => match resolve_xml_entity(&raw) {
                Some(entity) => self.push_str(entity),
                None => Err(XmlError::EntityError(raw.to_string()))?,
            },
        }
        Ok(())
    }
}

/// Drives an [`XmlReader`] to the end of input, dispatching each event to the given arms.
/// Events no arm matches are ignored; `break` leaves the loop early.
#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}
