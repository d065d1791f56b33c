//! Session: a [`ClientHandle`] that runs one connection on its own Tokio task.
//!
//! The protocol spoken over the connection is not this module's concern.  A
//! [`ConnectionHandler`] supplied by the owning server does the actual work;
//! the session wraps it with the lifecycle the network core relies on:
//!
//! - **start** spawns the task.
//! - **notify_disconnect** flips a `watch` flag the handler can observe
//!   through its [`DisconnectSignal`].  Sending never waits, so it is safe to
//!   call while the registry lock is held.
//! - When the task ends, the session **removes itself** from the
//!   [`ClientRegistry`] and only then reports itself finished.
//! - **force_disconnect** aborts the task.  Dropping the handler's future
//!   drops the `TcpStream` it owns, which closes the socket.
//!
//! Both the removal and the finished flag live in a drop guard owned by the
//! task's future, so they happen whether the handler returned, panicked, or
//! was aborted.  Completion is observed through a second `watch` channel.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use smp_core::ConnectionId;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::application::client_handle::ClientHandle;
use crate::application::client_registry::{lock_unpoisoned, ClientRegistry, SharedClient};

use super::server_net::ClientFactory;

/// Per-connection business logic provided by the owning server.
///
/// `serve` owns the stream for the whole session.  It should return promptly
/// once `disconnect` reports a request; a handler that ignores the request is
/// killed after the shutdown grace window.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn serve(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        disconnect: DisconnectSignal,
    ) -> std::io::Result<()>;
}

/// Receiving side of a session's disconnect request.
#[derive(Debug, Clone)]
pub struct DisconnectSignal {
    rx: watch::Receiver<bool>,
}

impl DisconnectSignal {
    /// Returns `true` once a disconnect has been requested.
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when a disconnect is requested.  Cancel-safe, so it can be
    /// used as a `tokio::select!` branch.
    pub async fn requested(&mut self) {
        // An error means the session itself is gone, which is a request too.
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

/// Removes the session from the registry, then flips its finished flag,
/// when the task's future is dropped.
struct FinishGuard {
    id: ConnectionId,
    clients: Arc<ClientRegistry>,
    finished_tx: watch::Sender<bool>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if self.clients.remove(self.id).is_some() {
            debug!("client {} removed itself from the registry", self.id);
        }
        self.finished_tx.send_replace(true);
    }
}

/// Everything the task needs, parked here until `start` is called.
struct PendingStart {
    stream: TcpStream,
    handler: Arc<dyn ConnectionHandler>,
    clients: Arc<ClientRegistry>,
    finished_tx: watch::Sender<bool>,
}

/// A client connection served on a dedicated Tokio task.
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    disconnect_tx: watch::Sender<bool>,
    finished_rx: watch::Receiver<bool>,
    pending: Mutex<Option<PendingStart>>,
    task: Mutex<Option<AbortHandle>>,
}

impl Session {
    pub fn new(
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        handler: Arc<dyn ConnectionHandler>,
        clients: Arc<ClientRegistry>,
    ) -> Self {
        let (disconnect_tx, _) = watch::channel(false);
        let (finished_tx, finished_rx) = watch::channel(false);
        Self {
            id,
            peer,
            disconnect_tx,
            finished_rx,
            pending: Mutex::new(Some(PendingStart {
                stream,
                handler,
                clients,
                finished_tx,
            })),
            task: Mutex::new(None),
        }
    }

    fn has_started(&self) -> bool {
        lock_unpoisoned(&self.task).is_some()
    }

    fn has_finished(&self) -> bool {
        *self.finished_rx.borrow()
    }
}

#[async_trait]
impl ClientHandle for Session {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn start(&self) {
        // Hold the task slot for the whole start so `force_disconnect` cannot
        // slip in between spawning and recording the abort handle.
        let mut task = lock_unpoisoned(&self.task);
        let Some(pending) = lock_unpoisoned(&self.pending).take() else {
            return;
        };

        let id = self.id;
        let signal = DisconnectSignal {
            rx: self.disconnect_tx.subscribe(),
        };
        let PendingStart {
            stream,
            handler,
            clients,
            finished_tx,
        } = pending;

        // Built outside the task so an abort before the first poll still
        // deregisters the session and marks it finished.
        let guard = FinishGuard {
            id,
            clients,
            finished_tx,
        };
        let join = tokio::spawn(async move {
            let _finished = guard;

            match handler.serve(id, stream, signal).await {
                Ok(()) => info!("client {id} disconnected"),
                Err(e) => warn!("client {id} connection closed with error: {e}"),
            }
        });
        *task = Some(join.abort_handle());
    }

    fn notify_disconnect(&self) {
        self.disconnect_tx.send_replace(true);
    }

    fn force_disconnect(&self) {
        if let Some(task) = lock_unpoisoned(&self.task).as_ref() {
            task.abort();
        }
        // Never started: dropping the parked stream closes the socket.
        if lock_unpoisoned(&self.pending).take().is_some() {
            debug!("client {} closed before it was started", self.id);
        }
    }

    fn is_alive(&self) -> bool {
        self.has_started() && !self.has_finished()
    }

    async fn join(&self, timeout: Duration) -> bool {
        if self.has_started() {
            let mut finished = self.finished_rx.clone();
            let _ = tokio::time::timeout(timeout, finished.wait_for(|done| *done)).await;
        }
        !self.is_alive()
    }
}

/// Builds a [`Session`] for every accepted connection.
///
/// The owning server *is* the connection handler: the server reference the
/// network core passes through becomes the handler each session runs.  Each
/// session removes itself from the registry the network core drains.
pub struct SessionFactory<H> {
    _handler: std::marker::PhantomData<fn() -> H>,
}

impl<H> SessionFactory<H> {
    pub fn new() -> Self {
        Self {
            _handler: std::marker::PhantomData,
        }
    }
}

impl<H> Default for SessionFactory<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ConnectionHandler> ClientFactory for SessionFactory<H> {
    type Server = H;

    fn create(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        server: Arc<H>,
        clients: &Arc<ClientRegistry>,
    ) -> SharedClient {
        Arc::new(Session::new(id, stream, peer, server, Arc::clone(clients)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
