//! Network infrastructure for the server.
//!
//! # Sub-modules
//!
//! - **`server_net`** – The accept loop and the shutdown coordinator.  Owns the
//!   single listening socket, registers each accepted connection as a client,
//!   and tears every client down (gracefully, then by force) when the server
//!   stops.
//!
//! - **`session`** – A [`ClientHandle`](crate::application::client_handle::ClientHandle)
//!   backed by a Tokio task that runs a pluggable
//!   [`ConnectionHandler`](session::ConnectionHandler).
//!
//! - **`echo`** – A minimal line-echo handler used by the binary.

pub mod echo;
pub mod server_net;
pub mod session;

pub use server_net::{ClientFactory, NetError, NetSettings, RunOutcome, ServerNet};
pub use session::{ConnectionHandler, DisconnectSignal, Session, SessionFactory};
