//! # Connection Registry and Dispatcher
//!
//! The `Dispatcher` owns the outbound side of every connected subscriber and
//! fans messages out to them.
//!
//! ## Core Design Principles:
//!
//! 1.  **Zero-Copy Fan-out**: every broadcast message is wrapped in an `Arc`
//!     once. Each client receives a new pointer to the *same* frame, so a
//!     `fullData` reply or a `newEarthquake` burst costs one allocation no
//!     matter how many clients are connected.
//!
//! 2.  **Liveness by Channel**: each client is an unbounded MPSC sender whose
//!     receiver lives in the client's socket task. When that task ends the
//!     receiver is dropped and the next send fails. That failure *is* the
//!     "connection not open" signal.
//!
//! 3.  **Fire-and-Forget**: sends never wait for delivery and a failed send is
//!     never propagated past the dispatcher. The dead client is pruned and the
//!     broadcast carries on with everyone else.
//!
//! 4.  **No History**: a client only sees messages broadcast while it is
//!     registered.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::protocol::ServerMessage;

/// Identifier handed out by [`Dispatcher::register`].
pub type ConnectionId = usize;

/// What a client task pulls off its channel.
pub type Outbound = Arc<ServerMessage>;

/// A send that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The connection is unknown or its receiver has gone away.
    #[error("connection {0} is not open")]
    ConnectionClosed(ConnectionId),
}

/// # Core Dispatcher
///
/// Manages the registration, deregistration, and broadcasting of data to all clients.
#[derive(Debug)]
pub struct Dispatcher {
    /// All currently registered clients keyed by id.
    clients: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>>,
    /// Source of connection ids. Ids are never reused within a process.
    next_id: AtomicUsize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// # Register
    ///
    /// Creates a channel for a new client and stores its sending half.
    ///
    /// # Returns
    /// The connection id plus the receiver the client's task must drain. Dropping
    /// the receiver marks the connection as closed.
    pub fn register(&self) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(id, tx);
        log::info!("Client {} registered", id);
        (id, rx)
    }

    /// Removes a client. Returns `false` if it was already gone (pruned by a failed send).
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            log::info!("Client {} unregistered", id);
        }
        removed
    }

    /// # Send To
    ///
    /// Best-effort delivery to one client. A closed or unknown target yields
    /// [`DispatchError::ConnectionClosed`]; callers normally ignore it.
    pub fn send_to(&self, id: ConnectionId, message: ServerMessage) -> Result<(), DispatchError> {
        let mut clients = self.lock();
        let sender = clients.get(&id).ok_or(DispatchError::ConnectionClosed(id))?;
        if sender.send(Arc::new(message)).is_err() {
            clients.remove(&id);
            log::debug!("Client {} closed before send; removed", id);
            return Err(DispatchError::ConnectionClosed(id));
        }
        Ok(())
    }

    /// # Broadcast All
    ///
    /// Sends every message, in order, to every registered client.
    ///
    /// ## Logic:
    /// 1.  Each message is wrapped in an `Arc` once.
    /// 2.  For each client the messages are pushed in sequence. The first
    ///     failed push marks the client as gone and skips its remaining messages.
    /// 3.  `retain` drops the gone clients in the same pass.
    ///
    /// # Returns
    /// The number of clients that received the whole batch.
    pub fn broadcast_all(&self, messages: Vec<ServerMessage>) -> usize {
        if messages.is_empty() {
            return 0;
        }
        let frames: Vec<Outbound> = messages.into_iter().map(Arc::new).collect();

        let mut clients = self.lock();
        clients.retain(|id, sender| {
            let delivered = frames.iter().all(|frame| sender.send(Arc::clone(frame)).is_ok());
            if !delivered {
                log::info!("Client {} disconnected. Removing from dispatcher.", id);
            }
            delivered
        });
        clients.len()
    }

    /// Number of registered clients, including ones whose closure has not been noticed yet.
    pub fn client_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
