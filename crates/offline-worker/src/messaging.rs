//! Messaging between the worker and open views.
//!
//! Views send [`ClientCommand`]s; the worker answers by broadcasting the
//! matching [`ClientEvent`] to every connected view, including the sender.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use offline_core::Generation;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default number of undelivered events a slow view may fall behind by.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Messaging errors.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Payload was not a known command.
    #[error("Invalid message: {0}")]
    Decode(#[from] serde_json::Error),

    /// The worker side of the channel is gone.
    #[error("Channel closed")]
    Closed,

    /// The view fell behind and missed events.
    #[error("Missed {0} events")]
    Lagged(u64),
}

/// Command sent by a view to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientCommand {
    /// Ask every view to show the install prompt.
    PromptInstall,
    /// The app is running standalone; views should restyle.
    StandaloneMode,
}

impl ClientCommand {
    /// Decode a `{"type": "..."}` payload.
    pub fn from_json(payload: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Event broadcast in answer to this command.
    pub fn reply(&self) -> ClientEvent {
        match self {
            Self::PromptInstall => ClientEvent::ShowInstallPrompt,
            Self::StandaloneMode => ClientEvent::ApplyStandaloneStyles,
        }
    }
}

/// Event broadcast by the worker to every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEvent {
    ShowInstallPrompt,
    ApplyStandaloneStyles,
}

impl ClientEvent {
    /// Encode as a `{"type": "..."}` payload.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Identifier of a connected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

struct Registry {
    sender: broadcast::Sender<ClientEvent>,
    controllers: RwLock<BTreeMap<ClientId, Option<Generation>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn controllers(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<ClientId, Option<Generation>>> {
        self.controllers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn controllers_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, BTreeMap<ClientId, Option<Generation>>> {
        self.controllers.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Open views and the generation controlling each.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<Registry>,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.len())
            .finish()
    }
}

impl ClientRegistry {
    /// Create a registry whose views may lag by up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Registry {
                sender,
                controllers: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Open a view. It starts uncontrolled and receives every event
    /// broadcast from now on.
    pub fn connect(&self) -> ClientHandle {
        let id = ClientId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let receiver = self.inner.sender.subscribe();
        self.inner.controllers_mut().insert(id, None);

        ClientHandle {
            id,
            receiver,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Put every open view under `generation`. Returns how many were claimed.
    pub fn claim(&self, generation: &Generation) -> usize {
        let mut controllers = self.inner.controllers_mut();
        for controller in controllers.values_mut() {
            *controller = Some(generation.clone());
        }
        controllers.len()
    }

    /// Generation controlling a view, if any.
    pub fn controller(&self, id: ClientId) -> Option<Generation> {
        self.inner.controllers().get(&id).cloned().flatten()
    }

    /// Send an event to every open view. Returns how many received it;
    /// zero views is not an error.
    pub fn broadcast(&self, event: ClientEvent) -> usize {
        self.inner.sender.send(event).unwrap_or(0)
    }

    /// Number of open views.
    pub fn len(&self) -> usize {
        self.inner.controllers().len()
    }

    /// Whether no views are open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of open views, in connection order.
    pub fn clients(&self) -> Vec<ClientId> {
        self.inner.controllers().keys().copied().collect()
    }
}

/// One open view's end of the channel. Dropping it closes the view.
pub struct ClientHandle {
    id: ClientId,
    receiver: broadcast::Receiver<ClientEvent>,
    registry: Arc<Registry>,
}

impl ClientHandle {
    /// This view's id.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Result<ClientEvent, MessageError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => MessageError::Closed,
            broadcast::error::RecvError::Lagged(n) => MessageError::Lagged(n),
        })
    }

    /// Next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<ClientEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.registry.controllers_mut().remove(&self.id);
    }
}
