//! # smp-core
//!
//! Shared foundation for the SMP messaging server and client.
//!
//! This crate deliberately stays small and free of I/O.  It defines the
//! values both ends of a connection must agree on:
//!
//! - **`network`** – Default host, port, listen backlog, and the shutdown
//!   grace window used by the server's network core.
//!
//! - **`connection`** – The [`ConnectionId`] assigned to every accepted
//!   connection.

pub mod connection;
pub mod network;

pub use connection::ConnectionId;
pub use network::{DEFAULT_GRACE_PERIOD, DEFAULT_HOST, DEFAULT_PORT, LISTEN_BACKLOG};
