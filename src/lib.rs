//! Line-oriented broadcast chat over TCP.
//!
//! Clients connect, answer the welcome prompt with a username, and every
//! line they send afterwards is relayed to all connected clients as
//! `"<username>: <line>"`. Each public module owns a concrete
//! responsibility:
//!
//! - [`cli`] parses the command-line interface for server and client modes.
//! - [`config`] holds the server configuration, including the ephemeral
//!   port selection the server falls back to when no port is given.
//! - [`server`] binds the listener, accepts connections, and runs the
//!   welcome/username handshake before handing sessions to the coordinator.
//! - [`client`] connects to a server, exposing both a programmatic handle
//!   and the interactive terminal mode.
//! - [`logger`] is the narrow log-sink capability server components report
//!   recoverable failures through.
//!
//! The private `hub` module is the coordinator at the center of the
//! design: it owns the session registry and processes register, unregister,
//! and broadcast events one at a time over bounded channels, so the
//! registry never needs a lock. Integration tests drive the whole stack
//! over real sockets.

pub mod cli;
pub mod client;
pub mod config;
pub mod logger;
pub mod server;

mod hub;
mod session;
