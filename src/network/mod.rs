//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop polling a shutdown flag
//! - One thread per connection, capped at `max_connections`
//! - Commands routed through `KeyService`

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
