//! ClientRegistry: the shared list of active clients and the id counter.
//!
//! The registry is the only mutable state shared between the accept loop, the
//! shutdown coordinator, and the clients themselves.  Every read or write of
//! the client list *and* of the next-id counter goes through one
//! `std::sync::Mutex`.
//!
//! # Locking discipline
//!
//! Critical sections are short and never wait on another unit of execution:
//!
//! | Operation       | Who calls it                      | Work under the lock        |
//! |-----------------|-----------------------------------|----------------------------|
//! | `allocate_id`   | accept loop                       | read + increment counter   |
//! | `insert`        | accept loop                       | push onto the list         |
//! | `notify_all`    | shutdown coordinator              | one non-blocking signal each |
//! | `remove`        | a client leaving / the coordinator | remove by id if present   |
//! | `first`         | shutdown coordinator              | clone the head `Arc`       |
//!
//! Because `notify_all` only *signals*, a client that reacts by removing
//! itself simply blocks on the lock for a moment and then proceeds; it can
//! never deadlock against the coordinator.
//!
//! # Vec choice
//!
//! A `Vec` keeps insertion order, which is the drain order used at shutdown.
//! Registries are small (a handful of clients), so the linear scan in
//! `remove` is not a concern.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use smp_core::ConnectionId;

use super::client_handle::ClientHandle;

/// A client as stored in the registry.
pub type SharedClient = Arc<dyn ClientHandle>;

struct RegistryState {
    clients: Vec<SharedClient>,
    next_id: ConnectionId,
}

/// Insertion-ordered registry of active clients.
///
/// Shared as `Arc<ClientRegistry>` between the owning server, the network
/// core, and every running client.
pub struct ClientRegistry {
    state: Mutex<RegistryState>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                clients: Vec::new(),
                next_id: ConnectionId::FIRST,
            }),
        }
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next connection id and advances the counter.
    ///
    /// Ids start at 1 and are never reused.
    pub fn allocate_id(&self) -> ConnectionId {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id = id.next();
        id
    }

    /// Appends a client.
    ///
    /// Returns `false` and leaves the registry untouched if a client with the
    /// same id is already present.
    pub fn insert(&self, client: SharedClient) -> bool {
        let mut state = self.lock();
        let id = client.id();
        if state.clients.iter().any(|c| c.id() == id) {
            return false;
        }
        state.clients.push(client);
        true
    }

    /// Removes the client with `id` if it is still present.
    ///
    /// Both a client's own disconnect routine and the shutdown coordinator may
    /// race to remove the same entry; exactly one of them gets `Some`.
    pub fn remove(&self, id: ConnectionId) -> Option<SharedClient> {
        let mut state = self.lock();
        let pos = state.clients.iter().position(|c| c.id() == id)?;
        Some(state.clients.remove(pos))
    }

    /// Returns the oldest registered client without removing it.
    pub fn first(&self) -> Option<SharedClient> {
        self.lock().clients.first().cloned()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().clients.iter().any(|c| c.id() == id)
    }

    pub fn len(&self) -> usize {
        self.lock().clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().clients.is_empty()
    }

    /// Ids of all registered clients, in insertion order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.lock().clients.iter().map(|c| c.id()).collect()
    }

    /// A point-in-time copy of the client list, in insertion order.
    pub fn snapshot(&self) -> Vec<SharedClient> {
        self.lock().clients.clone()
    }

    /// Sends a disconnect request to every registered client.
    ///
    /// Runs entirely under the lock; returns the number of clients notified.
    pub fn notify_all(&self) -> usize {
        let state = self.lock();
        for client in &state.clients {
            client.notify_disconnect();
        }
        state.clients.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        lock_unpoisoned(&self.state)
    }
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// None of the critical sections guarded this way can leave their data in a
/// half-updated state, so a poisoned lock is still safe to use.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
