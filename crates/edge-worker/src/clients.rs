//! Connected clients and messages sent to them.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

/// Identifier of a connected client window.
pub type ClientId = u64;

const MESSAGE_BUFFER: usize = 16;

/// Message broadcast to every client after activation.
///
/// Serializes as `{"type": "<tag>", "version": "<version>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMessage {
    /// Message tag (e.g. `APP_UPDATED`).
    #[serde(rename = "type")]
    pub kind: String,
    /// The newly active deployment version.
    pub version: String,
}

impl UpdateMessage {
    /// Create an update message.
    pub fn new(kind: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            version: version.into(),
        }
    }

    /// Format as a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A connected client as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    /// Client id.
    pub id: ClientId,
    /// URL the client window shows.
    pub url: Url,
    /// Whether the window has focus.
    pub focused: bool,
    /// Version of the worker controlling this client, if any.
    pub controller: Option<String>,
}

/// What `open_or_focus` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    /// An existing window at the URL was focused.
    Focused(ClientId),
    /// A new window was opened.
    Opened(ClientId),
}

impl WindowAction {
    /// The affected client.
    pub fn client(&self) -> ClientId {
        match self {
            Self::Focused(id) | Self::Opened(id) => *id,
        }
    }
}

/// Receiving end held by a connected client.
#[derive(Debug)]
pub struct ClientHandle {
    id: ClientId,
    messages: broadcast::Receiver<UpdateMessage>,
}

impl ClientHandle {
    /// Client id.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Wait for the next message. `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<UpdateMessage> {
        loop {
            match self.messages.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take a message if one is queued.
    pub fn try_recv(&mut self) -> Option<UpdateMessage> {
        loop {
            match self.messages.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

#[derive(Debug, Default)]
struct HubState {
    next_id: ClientId,
    clients: BTreeMap<ClientId, ClientInfo>,
    /// Windows opened by the worker whose page has not connected yet.
    opening: BTreeMap<ClientId, Url>,
}

impl HubState {
    fn allocate(&mut self) -> ClientId {
        self.next_id += 1;
        self.next_id
    }

    fn focus(&mut self, target: ClientId) {
        for client in self.clients.values_mut() {
            client.focused = client.id == target;
        }
    }
}

/// Registry of client windows within the worker's scope.
#[derive(Debug)]
pub struct ClientHub {
    state: Mutex<HubState>,
    messages: broadcast::Sender<UpdateMessage>,
}

impl ClientHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        let (messages, _) = broadcast::channel(MESSAGE_BUFFER);
        Self {
            state: Mutex::new(HubState::default()),
            messages,
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a client window. It starts uncontrolled.
    ///
    /// A page loading in a window opened by [`open_or_focus`](Self::open_or_focus)
    /// takes over that window's id and focus.
    pub fn connect(&self, url: Url) -> ClientHandle {
        let messages = self.messages.subscribe();
        let mut state = self.state();

        let opened = state
            .opening
            .iter()
            .find(|(_, target)| **target == url)
            .map(|(id, _)| *id);
        let id = match opened {
            Some(id) => {
                state.opening.remove(&id);
                id
            }
            None => state.allocate(),
        };

        state.clients.insert(
            id,
            ClientInfo {
                id,
                url,
                focused: false,
                controller: None,
            },
        );
        if opened.is_some() {
            state.focus(id);
        }
        ClientHandle { id, messages }
    }

    /// Remove a client window, or forget a window that never connected.
    pub fn disconnect(&self, id: ClientId) -> bool {
        let mut state = self.state();
        state.clients.remove(&id).is_some() || state.opening.remove(&id).is_some()
    }

    /// Windows opened for a notification click that have not connected.
    /// They are not clients: they neither block activation nor receive
    /// messages.
    pub fn opening(&self) -> Vec<(ClientId, Url)> {
        self.state()
            .opening
            .iter()
            .map(|(id, url)| (*id, url.clone()))
            .collect()
    }

    /// Snapshot of connected clients.
    pub fn clients(&self) -> Vec<ClientInfo> {
        self.state().clients.values().cloned().collect()
    }

    /// Number of connected clients.
    pub fn len(&self) -> usize {
        self.state().clients.len()
    }

    /// Whether no client is connected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put every connected client under the worker for `version`.
    /// Returns how many clients were claimed.
    pub fn claim(&self, version: &str) -> usize {
        let mut state = self.state();
        for client in state.clients.values_mut() {
            client.controller = Some(version.to_string());
        }
        state.clients.len()
    }

    /// Send a message to every connected client. Returns the receiver count.
    pub fn broadcast(&self, message: UpdateMessage) -> usize {
        self.messages.send(message).unwrap_or(0)
    }

    /// Focus a window already showing `url`, or open a new one.
    pub fn open_or_focus(&self, url: &Url) -> WindowAction {
        let mut state = self.state();

        let connected = state
            .clients
            .values()
            .find(|c| c.url == *url)
            .map(|c| c.id);
        if let Some(id) = connected {
            state.focus(id);
            return WindowAction::Focused(id);
        }

        let pending = state
            .opening
            .iter()
            .find(|(_, target)| *target == url)
            .map(|(id, _)| *id);
        let action = match pending {
            Some(id) => WindowAction::Focused(id),
            None => {
                let id = state.allocate();
                state.opening.insert(id, url.clone());
                WindowAction::Opened(id)
            }
        };
        state.focus(action.client());
        action
    }
}

impl Default for ClientHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://tours.example.com").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_update_message_wire_format() {
        let msg = UpdateMessage::new("APP_UPDATED", "v2");
        let json: serde_json::Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "APP_UPDATED", "version": "v2"}));
    }

    #[test]
    fn test_connect_and_disconnect() {
        let hub = ClientHub::new();
        let a = hub.connect(url("/"));
        let b = hub.connect(url("/tours"));
        assert_ne!(a.id(), b.id());
        assert_eq!(hub.len(), 2);

        assert!(hub.disconnect(a.id()));
        assert!(!hub.disconnect(a.id()));
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_claim_sets_controller() {
        let hub = ClientHub::new();
        hub.connect(url("/"));
        hub.connect(url("/about"));

        assert_eq!(hub.claim("v3"), 2);
        assert!(hub
            .clients()
            .iter()
            .all(|c| c.controller.as_deref() == Some("v3")));
    }

    #[test]
    fn test_broadcast_reaches_every_client() {
        let hub = ClientHub::new();
        let mut a = hub.connect(url("/"));
        let mut b = hub.connect(url("/tours"));

        assert_eq!(hub.broadcast(UpdateMessage::new("APP_UPDATED", "v2")), 2);
        assert_eq!(a.try_recv().unwrap().version, "v2");
        assert_eq!(b.try_recv().unwrap().kind, "APP_UPDATED");
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn test_broadcast_without_clients() {
        let hub = ClientHub::new();
        assert_eq!(hub.broadcast(UpdateMessage::new("APP_UPDATED", "v1")), 0);
    }

    #[test]
    fn test_open_or_focus() {
        let hub = ClientHub::new();
        let root = url("/");

        let opened = hub.open_or_focus(&root);
        assert!(matches!(opened, WindowAction::Opened(_)));

        let focused = hub.open_or_focus(&root);
        assert_eq!(focused, WindowAction::Focused(opened.client()));
        assert_eq!(hub.opening(), vec![(opened.client(), root.clone())]);

        let page = hub.connect(root.clone());
        assert_eq!(page.id(), opened.client());
        assert!(hub.opening().is_empty());
        assert_eq!(hub.len(), 1);
        assert!(hub.clients()[0].focused);
        assert_eq!(hub.open_or_focus(&root), WindowAction::Focused(page.id()));
    }

    #[test]
    fn test_opened_window_is_not_a_client() {
        let hub = ClientHub::new();
        let mut tab = hub.connect(url("/tours"));
        let opened = hub.open_or_focus(&url("/"));

        assert_eq!(hub.len(), 1);
        assert!(!hub.clients()[0].focused);
        assert_eq!(hub.claim("v2"), 1);
        assert_eq!(hub.broadcast(UpdateMessage::new("APP_UPDATED", "v2")), 1);
        assert!(tab.try_recv().is_some());

        assert!(hub.disconnect(tab.id()));
        assert!(hub.is_empty());
        assert!(hub.disconnect(opened.client()));
        assert!(hub.opening().is_empty());
    }

    #[tokio::test]
    async fn test_recv_async() {
        let hub = ClientHub::new();
        let mut client = hub.connect(url("/"));
        hub.broadcast(UpdateMessage::new("APP_UPDATED", "v9"));
        assert_eq!(client.recv().await.unwrap().version, "v9");
    }
}
