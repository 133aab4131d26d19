//! Transaction log events
//!
//! Defines a single durable mutation and its on-disk line encoding.
//!
//! ## Line Format
//! ```text
//! sequence \t event_type \t key \t value \n
//! ```
//! `event_type` is `1` for Put and `0` for Delete. A Delete record still
//! carries the (empty) value field.

use std::io::Write;

use crate::error::{Result, TlogError};

/// Field separator inside a record
pub const FIELD_SEPARATOR: char = '\t';

/// Record terminator
pub const RECORD_TERMINATOR: char = '\n';

/// Kind of mutation recorded by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Delete = 0,
    Put = 1,
}

impl EventType {
    /// Map the on-disk code back to an event type
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EventType::Delete),
            1 => Some(EventType::Put),
            _ => None,
        }
    }

    /// Stable on-disk code
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// A single entry in the transaction log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Sequence number, assigned by the writer when the event is appended
    pub sequence: u64,

    /// The mutation kind
    pub event_type: EventType,

    /// Key affected by the mutation (never empty)
    pub key: String,

    /// New value for Put, empty for Delete
    pub value: String,
}

impl Event {
    /// A Put event
    pub fn put(sequence: u64, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence,
            event_type: EventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A Delete event
    pub fn delete(sequence: u64, key: impl Into<String>) -> Self {
        Self {
            sequence,
            event_type: EventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Encode as one newline-terminated record
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{}",
            self.sequence,
            self.event_type.code(),
            self.key,
            self.value,
            RECORD_TERMINATOR,
            sep = FIELD_SEPARATOR,
        )
    }

    /// Append the encoded record to `writer` with a single write
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.encode().as_bytes())
    }

    /// Parse one record with its terminator already stripped
    ///
    /// `line` is the 1-based line number, used only for error reporting.
    pub fn parse(record: &str, line: u64) -> Result<Self> {
        let parse_error = |reason: String| TlogError::Parse { line, reason };

        let mut fields = record.splitn(4, FIELD_SEPARATOR);
        let (Some(sequence), Some(event_type), Some(key), Some(value)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(parse_error(format!("expected 4 fields in {:?}", record)));
        };

        // `str::parse` also takes a leading '+', which the writer never emits
        if !is_decimal(sequence) {
            return Err(parse_error(format!("bad sequence {:?}", sequence)));
        }
        let sequence = sequence
            .parse::<u64>()
            .map_err(|e| parse_error(format!("bad sequence {:?}: {}", sequence, e)))?;

        let event_type = Some(event_type)
            .filter(|code| is_decimal(code))
            .and_then(|code| code.parse::<u8>().ok())
            .and_then(EventType::from_code)
            .ok_or_else(|| parse_error(format!("unknown event type {:?}", event_type)))?;

        if key.is_empty() {
            return Err(parse_error("empty key".to_string()));
        }

        Ok(Self {
            sequence,
            event_type,
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Non-empty and ASCII digits only
fn is_decimal(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}
