//! Event Reader
//!
//! Streams events back from the start of a log file, checking that
//! sequence numbers only move forward.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, TlogError};
use super::Event;

/// How strictly consecutive sequence numbers are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceCheck {
    /// Each sequence must be greater than the previous one
    #[default]
    Monotonic,

    /// Each sequence must be exactly the previous one plus one
    Contiguous,
}

/// Lazy, one-shot iterator over the events of a log
///
/// Yields at most one error, after which it is exhausted. Every accepted
/// event advances the shared last-sequence counter, so a writer started
/// after replay continues numbering where the file left off.
pub struct EventReader<R = File> {
    source: BufReader<R>,
    last_sequence: Arc<AtomicU64>,
    check: SequenceCheck,
    line: u64,
    finished: bool,
    buf: Vec<u8>,
}

impl<R: Read> EventReader<R> {
    /// Read from `source`, recording progress in `last_sequence`
    pub fn new(source: R, last_sequence: Arc<AtomicU64>) -> Self {
        Self {
            source: BufReader::new(source),
            last_sequence,
            check: SequenceCheck::default(),
            line: 0,
            finished: false,
            buf: Vec::new(),
        }
    }

    /// Use a different sequence check
    pub fn with_check(mut self, check: SequenceCheck) -> Self {
        self.check = check;
        self
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    fn next_event(&mut self) -> Result<Option<Event>> {
        self.buf.clear();
        if self.source.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        let line = self.line;

        // A record without its terminator is a torn append
        if self.buf.pop() != Some(b'\n') {
            return Err(TlogError::Parse {
                line,
                reason: "record is not newline-terminated".to_string(),
            });
        }

        let record = std::str::from_utf8(&self.buf).map_err(|e| TlogError::Parse {
            line,
            reason: format!("invalid UTF-8: {}", e),
        })?;
        let event = Event::parse(record, line)?;

        let previous = self.last_sequence.load(Ordering::SeqCst);
        let in_order = match self.check {
            SequenceCheck::Monotonic => event.sequence > previous,
            SequenceCheck::Contiguous => Some(event.sequence) == previous.checked_add(1),
        };
        if !in_order {
            return Err(TlogError::Sequence {
                line,
                previous,
                found: event.sequence,
            });
        }
        self.last_sequence.store(event.sequence, Ordering::SeqCst);

        Ok(Some(event))
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for EventReader<R> {}
