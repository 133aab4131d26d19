//! Client requests

/// Request tag carried in the first byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        [Self::Get, Self::Put, Self::Delete, Self::Ping]
            .into_iter()
            .find(|t| *t as u8 == byte)
    }

    /// Upper-case wire name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            CommandType::Get => "GET",
            CommandType::Put => "PUT",
            CommandType::Delete => "DELETE",
            CommandType::Ping => "PING",
        }
    }

    /// Whether the command has a key prefix in its payload
    pub fn has_key(self) -> bool {
        !matches!(self, CommandType::Ping)
    }
}

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get { key: String },

    /// Insert or overwrite; logged as a Put event
    Put { key: String, value: String },

    /// Remove; logged as a Delete event even if the key is absent
    Delete { key: String },

    /// Liveness check, answered with `PONG`
    Ping,
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
        }
    }

    /// Key addressed by the command, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Get { key } | Command::Put { key, .. } | Command::Delete { key } => Some(key),
            Command::Ping => None,
        }
    }

    /// Whether executing the command appends to the transaction log
    pub fn is_mutation(&self) -> bool {
        matches!(self, Command::Put { .. } | Command::Delete { .. })
    }
}
