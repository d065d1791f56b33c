//! The capability set the network core requires from a connected client.
//!
//! The network core never reads or writes protocol data.  It only needs to be
//! able to start a client's independent unit of execution, ask it to leave,
//! kill it if it refuses, and wait for it to finish:
//!
//! ```text
//!            start()              notify_disconnect()
//!   created ─────────► running ─────────────────────► leaving
//!                         │                              │
//!                         │ force_disconnect()           │ self-removal
//!                         ▼                              ▼
//!                      killed ───────────────────────► finished
//! ```
//!
//! A client that leaves on its own removes itself from the
//! [`ClientRegistry`](super::client_registry::ClientRegistry).  A killed
//! client is removed by whoever killed it.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use smp_core::ConnectionId;

/// One accepted connection as seen by the network core.
///
/// Implementations must be cheap to call from inside the registry lock:
/// [`notify_disconnect`](ClientHandle::notify_disconnect) in particular is
/// invoked for every client while the lock is held and must never wait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// The id assigned when the connection was accepted.
    fn id(&self) -> ConnectionId;

    /// Address of the remote peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Begins the client's independent execution.  Calling it more than once
    /// has no further effect.
    fn start(&self);

    /// Requests a graceful disconnect.  Non-blocking.
    fn notify_disconnect(&self);

    /// Terminates the client unconditionally and closes its connection.
    fn force_disconnect(&self);

    /// Returns `true` while the client's execution unit is running.
    fn is_alive(&self) -> bool;

    /// Waits up to `timeout` for the client to finish.
    ///
    /// Returns `true` if the client is no longer running when the call
    /// returns.
    async fn join(&self, timeout: Duration) -> bool;
}
