//! Server replies and the mapping from errors to statuses

use crate::error::TlogError;

/// Reply tag carried in the first byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    BadRequest = 0x03,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        [Self::Ok, Self::NotFound, Self::Error, Self::BadRequest]
            .into_iter()
            .find(|s| *s as u8 == byte)
    }
}

/// A decoded reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,

    /// Value for GET, `PONG` for PING, message for ERROR/BAD_REQUEST
    pub payload: Option<Vec<u8>>,
}

impl Response {
    fn new(status: Status, payload: Option<Vec<u8>>) -> Self {
        Self { status, payload }
    }

    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self::new(Status::Ok, payload)
    }

    pub fn not_found() -> Self {
        Self::new(Status::NotFound, None)
    }

    /// Server-side failure; the request may be retried
    pub fn error(message: &str) -> Self {
        Self::new(Status::Error, Some(message.into()))
    }

    /// The request itself is invalid; retrying it will not help
    pub fn bad_request(message: &str) -> Self {
        Self::new(Status::BadRequest, Some(message.into()))
    }

    /// Map a service error onto the status a client should see
    pub fn from_error(error: &TlogError) -> Self {
        match error {
            TlogError::KeyNotFound => Self::not_found(),
            TlogError::InvalidKey(_) | TlogError::InvalidValue(_) | TlogError::Protocol(_) => {
                Self::bad_request(&error.to_string())
            }
            other => Self::error(&other.to_string()),
        }
    }

    /// Payload decoded as UTF-8 text, lossy
    pub fn payload_text(&self) -> Option<String> {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }
}
