//! ServerNet: the listening socket, the accept loop, and orderly shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! run(shutdown)
//!  ├─ bind + listen (backlog 2)           ── fails ──┐
//!  ├─ loop                                           │
//!  │    accept ─► allocate id ─► create client       │
//!  │           ─► register ─► start                  │
//!  │    (accept error ── fails ──────────────────────┤
//!  │     shutdown signal ── interrupted ─────────────┤
//!  └─ disconnect()  ◄────────────────────────────────┘  always runs
//!       1. close listener (idempotent)
//!       2. notify every client, under the registry lock
//!       3. drain: peek first client, join(grace);
//!          still alive → force_disconnect + remove if present
//! ```
//!
//! Socket errors never escape [`ServerNet::run`]: they are logged, end the
//! accept loop, and are reported back as [`RunOutcome::Failed`] once the
//! shutdown sequence has completed.  There is no retry; a server that cannot
//! bind or accept is not in a state worth continuing.
//!
//! # Why one client at a time?
//!
//! The drain joins the oldest client first and only moves on once it is gone.
//! Registries are small and shutdown is not latency-critical, so joining
//! sequentially keeps the coordinator simple while every client still gets a
//! bounded grace window.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use smp_core::network::default_bind_addr;
use smp_core::{ConnectionId, DEFAULT_GRACE_PERIOD, LISTEN_BACKLOG};
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, error, info, warn};

use crate::application::client_registry::{ClientRegistry, SharedClient};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum NetError {
    /// The listening socket could not be created, bound, or put into listen mode.
    #[error("unable to listen on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Accepting an incoming connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
}

/// Listener settings for [`ServerNet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSettings {
    /// Address and port of the listening socket.
    pub bind_addr: SocketAddr,
    /// How long each client is given to exit after a disconnect request
    /// before it is killed.
    pub grace_period: Duration,
}

impl Default for NetSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// How [`ServerNet::run`] ended.  Returned only after every client is gone.
#[derive(Debug)]
pub enum RunOutcome {
    /// The shutdown signal fired.
    Interrupted,
    /// Binding or accepting failed.  The error has already been logged.
    Failed(NetError),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }
}

/// Builds a client for a freshly accepted connection.
///
/// The network core hands the factory everything it knows about the
/// connection plus the owning server reference, which it treats as opaque,
/// and the registry the client will be entered into.  The returned client
/// must not be started yet; [`ServerNet`] registers it first and then calls
/// [`start`](crate::application::client_handle::ClientHandle::start).
pub trait ClientFactory: Send + Sync {
    /// The owning server instance passed through to every client.
    type Server: Send + Sync + 'static;

    fn create(
        &self,
        id: ConnectionId,
        stream: TcpStream,
        peer: SocketAddr,
        server: Arc<Self::Server>,
        clients: &Arc<ClientRegistry>,
    ) -> SharedClient;
}

/// The network interface of the server.
///
/// Owns the single listening socket.  The [`ClientRegistry`] is owned by the
/// composing server and shared in, so the server can observe active clients
/// while the accept loop runs.
pub struct ServerNet<F: ClientFactory> {
    settings: NetSettings,
    server: Arc<F::Server>,
    clients: Arc<ClientRegistry>,
    factory: F,
    listener: Option<TcpListener>,
}

impl<F: ClientFactory> ServerNet<F> {
    pub fn new(
        settings: NetSettings,
        server: Arc<F::Server>,
        clients: Arc<ClientRegistry>,
        factory: F,
    ) -> Self {
        Self {
            settings,
            server,
            clients,
            factory,
            listener: None,
        }
    }

    pub fn settings(&self) -> &NetSettings {
        &self.settings
    }

    /// The shared registry of active clients.
    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Returns `true` while the listening socket is open.
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Alias for [`run`](Self::run).
    pub async fn start<S>(&mut self, shutdown: S) -> RunOutcome
    where
        S: Future<Output = ()>,
    {
        self.run(shutdown).await
    }

    /// Binds, accepts connections until `shutdown` resolves or a socket error
    /// occurs, then disconnects every client.
    pub async fn run<S>(&mut self, shutdown: S) -> RunOutcome
    where
        S: Future<Output = ()>,
    {
        let outcome = match self.accept_loop(shutdown).await {
            Ok(()) => {
                info!("interrupt received; stopping server");
                RunOutcome::Interrupted
            }
            Err(e) => {
                error!("{e}");
                RunOutcome::Failed(e)
            }
        };

        self.disconnect().await;
        outcome
    }

    async fn accept_loop<S>(&mut self, shutdown: S) -> Result<(), NetError>
    where
        S: Future<Output = ()>,
    {
        let listener = &*self
            .listener
            .insert(bind_listener(self.settings.bind_addr)?);
        let local_addr = listener.local_addr().unwrap_or(self.settings.bind_addr);
        info!("listening on {local_addr}, backlog={LISTEN_BACKLOG}");

        tokio::pin!(shutdown);
        info!("waiting for connections");

        loop {
            let (stream, peer) = tokio::select! {
                () = &mut shutdown => return Ok(()),
                accepted = listener.accept() => accepted.map_err(NetError::Accept)?,
            };

            let id = self.clients.allocate_id();
            info!("new connection from {peer}, {id}");

            let client = self.factory.create(
                id,
                stream,
                peer,
                Arc::clone(&self.server),
                &self.clients,
            );
            if !self.clients.insert(Arc::clone(&client)) {
                // Only possible if something outside the accept loop inserted
                // this id.  The unstarted client still owns the socket.
                warn!("{id} is already registered; closing connection from {peer}");
                client.force_disconnect();
                continue;
            }
            client.start();
        }
    }

    /// Closes the listening socket and disconnects every registered client.
    ///
    /// Clients are asked to leave first and given `grace_period` each to do
    /// so; those that do not are killed.  Returns once the registry is empty.
    /// Calling it again is harmless.
    pub async fn disconnect(&mut self) {
        if let Some(listener) = self.listener.take() {
            drop(listener);
            debug!("listening socket closed");
        }

        debug!("notifying all clients to disconnect");
        let notified = self.clients.notify_all();
        if notified > 0 {
            info!("waiting for {notified} client(s) to disconnect");
        }

        while let Some(client) = self.clients.first() {
            let id = client.id();
            let exited = client.join(self.settings.grace_period).await;

            if !exited && client.is_alive() {
                warn!(
                    "client {id} ({}) did not disconnect; killing the connection",
                    client.peer_addr()
                );
                client.force_disconnect();
            }

            // A client that left on its own has already removed itself.
            if self.clients.remove(id).is_some() {
                debug!("removed {id} from the client registry");
            }
        }
    }
}

/// Creates the listening socket with the fixed backlog.
fn bind_listener(addr: SocketAddr) -> Result<TcpListener, NetError> {
    let bind_failed = |source: std::io::Error| NetError::BindFailed { addr, source };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_failed)?;

    #[cfg(unix)]
    socket.set_reuseaddr(true).map_err(bind_failed)?;

    socket.bind(addr).map_err(bind_failed)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind_failed)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
