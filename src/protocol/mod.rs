//! Wire Protocol
//!
//! Length-prefixed binary frames between `tlogkv-cli` and `tlogkv-server`.
//!
//! ## Frame
//! ```text
//! ┌────────┬────────────────┬──────────────────────────┐
//! │ tag u8 │ payload_len u32│ payload (payload_len B)  │
//! └────────┴────────────────┴──────────────────────────┘
//! ```
//! `payload_len` is big-endian and capped at [`MAX_PAYLOAD_SIZE`]; a larger
//! header is rejected before any payload is read.
//!
//! ## Requests (tag = command)
//! | tag  | command | payload                         |
//! |------|---------|---------------------------------|
//! | 0x01 | GET     | key_len u32, key                |
//! | 0x02 | PUT     | key_len u32, key, value (rest)  |
//! | 0x03 | DEL     | key_len u32, key                |
//! | 0x04 | PING    | none                            |
//!
//! ## Responses (tag = status)
//! | tag  | status      | payload                    |
//! |------|-------------|----------------------------|
//! | 0x00 | OK          | value for GET, `PONG`      |
//! | 0x01 | NOT_FOUND   | none                       |
//! | 0x02 | ERROR       | message                    |
//! | 0x03 | BAD_REQUEST | message                    |
//!
//! Keys and values must be UTF-8. A frame that cannot be decoded is
//! answered with BAD_REQUEST and the connection is closed.

mod codec;
mod command;
mod response;

pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use response::{Response, Status};
