//! In-memory message representation and option list helpers.

use crate::codes::{code_name, MediaType, MessageType};
use crate::option::{CoapOption, OptionId, OptionValue};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A CoAP message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message type
    pub typ: MessageType,
    /// Method or response code
    pub code: u8,
    /// Message ID for duplicate detection and ACK matching
    pub message_id: u16,
    /// Options in caller order; encoding stable-sorts them by id
    pub options: Vec<CoapOption>,
    /// Payload, unprefixed on the wire
    pub payload: Bytes,
}

impl Message {
    /// Create a message with no options and an empty payload
    pub fn new(typ: MessageType, code: u8, message_id: u16) -> Self {
        Self {
            typ,
            code,
            message_id,
            options: Vec::new(),
            payload: Bytes::new(),
        }
    }

    /// Set payload
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Add an option
    pub fn with_option(mut self, id: OptionId, value: impl Into<OptionValue>) -> Self {
        self.add_option(id, value);
        self
    }

    /// Whether this message is confirmable
    pub fn is_confirmable(&self) -> bool {
        self.typ == MessageType::Confirmable
    }

    /// Append an option
    pub fn add_option(&mut self, id: OptionId, value: impl Into<OptionValue>) {
        self.options.push(CoapOption::new(id, value));
    }

    /// Remove every option with the given id
    pub fn remove_option(&mut self, id: OptionId) {
        self.options.retain(|o| o.id != id);
    }

    /// Replace all options with the given id by a single value
    pub fn set_option(&mut self, id: OptionId, value: impl Into<OptionValue>) {
        self.remove_option(id);
        self.add_option(id, value);
    }

    /// First value with the given id
    pub fn option(&self, id: OptionId) -> Option<&OptionValue> {
        self.options_with(id).next()
    }

    /// All values with the given id, in list order
    pub fn options_with(&self, id: OptionId) -> impl Iterator<Item = &OptionValue> + '_ {
        self.options
            .iter()
            .filter(move |o| o.id == id)
            .map(|o| &o.value)
    }

    /// Uri-Path segments
    pub fn path(&self) -> Vec<String> {
        self.options_with(OptionId::URI_PATH)
            .map(|v| match v {
                OptionValue::String(s) => s.clone(),
                OptionValue::Opaque(b) => String::from_utf8_lossy(b).into_owned(),
                OptionValue::Uint(n) => n.to_string(),
                OptionValue::Empty => String::new(),
            })
            .collect()
    }

    /// Uri-Path as a `/` separated string
    pub fn path_string(&self) -> String {
        self.path().join("/")
    }

    /// Replace the Uri-Path with the given segments
    pub fn set_path<I, S>(&mut self, segments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove_option(OptionId::URI_PATH);
        for segment in segments {
            let segment: String = segment.into();
            self.add_option(OptionId::URI_PATH, segment);
        }
    }

    /// Replace the Uri-Path from a `/` separated string
    pub fn set_path_string(&mut self, path: &str) {
        self.set_path(path.split('/'));
    }

    /// Content-Type as a known media type
    pub fn content_type(&self) -> Option<MediaType> {
        self.option(OptionId::CONTENT_TYPE)
            .and_then(OptionValue::as_uint)
            .and_then(MediaType::from_u32)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.typ)?;
        match code_name(self.code) {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "code={}", self.code)?,
        }
        write!(
            f,
            " mid=0x{:04X} opts={} payload={}B",
            self.message_id,
            self.options.len(),
            self.payload.len()
        )?;
        if self.options.iter().any(|o| o.id == OptionId::URI_PATH) {
            write!(f, " path=/{}", self.path_string())?;
        }
        Ok(())
    }
}
