//! Application layer of the SMP server.
//!
//! Nothing in here touches a socket.  The layer defines what the network core
//! needs from a connected client and owns the shared bookkeeping of which
//! clients are currently active.
//!
//! # Sub-modules
//!
//! - **`client_handle`** – The [`ClientHandle`](client_handle::ClientHandle)
//!   capability set: start, cooperative disconnect request, forced
//!   disconnect, liveness, and bounded join.  Any unit of execution that
//!   provides these can be managed by the network core.
//!
//! - **`client_registry`** – The insertion-ordered registry of active clients
//!   and the connection-id counter, both guarded by a single lock.

pub mod client_handle;
pub mod client_registry;
