//! Push notifications.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use edge_core::NotificationConfig;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::clients::{ClientHub, WindowAction};

/// Identifier of a displayed notification.
pub type NotificationId = u64;

/// A button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    /// Action id reported back on click.
    pub action: String,
    /// Button label.
    pub title: String,
}

impl NotificationAction {
    fn new(action: &str, title: &str) -> Self {
        Self {
            action: action.to_string(),
            title: title.to_string(),
        }
    }
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
    /// When the push arrived.
    pub arrived_at: DateTime<Utc>,
}

/// Where notifications are displayed.
pub trait NotificationSurface: Send + Sync {
    /// Display a notification.
    fn show(&self, notification: Notification) -> NotificationId;

    /// Dismiss a notification. Returns `false` if it was not shown.
    fn dismiss(&self, id: NotificationId) -> bool;
}

/// Surface that keeps visible notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySurface {
    next_id: AtomicU64,
    visible: Mutex<BTreeMap<NotificationId, Notification>>,
}

impl MemorySurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications currently shown.
    pub fn visible(&self) -> Vec<(NotificationId, Notification)> {
        self.visible
            .lock()
            .map(|v| v.iter().map(|(id, n)| (*id, n.clone())).collect())
            .unwrap_or_default()
    }
}

impl NotificationSurface for MemorySurface {
    fn show(&self, notification: Notification) -> NotificationId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut visible) = self.visible.lock() {
            visible.insert(id, notification);
        }
        id
    }

    fn dismiss(&self, id: NotificationId) -> bool {
        self.visible
            .lock()
            .map(|mut v| v.remove(&id).is_some())
            .unwrap_or(false)
    }
}

/// Turns push payloads into notifications and clicks into window focus.
///
/// Keeps no state between events.
pub struct NotificationChannel {
    config: NotificationConfig,
    root_url: Url,
    surface: Arc<dyn NotificationSurface>,
    clients: Arc<ClientHub>,
}

impl NotificationChannel {
    /// Create a channel that opens `root_url` on click.
    pub fn new(
        config: NotificationConfig,
        root_url: Url,
        surface: Arc<dyn NotificationSurface>,
        clients: Arc<ClientHub>,
    ) -> Self {
        Self {
            config,
            root_url,
            surface,
            clients,
        }
    }

    /// Build the notification for a push payload.
    ///
    /// An absent, empty or whitespace-only payload gets the default body.
    pub fn compose(&self, payload: Option<&[u8]>) -> Notification {
        let body = payload
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| self.config.default_body.clone());

        Notification {
            title: self.config.title.clone(),
            body,
            icon: self.config.icon.clone(),
            badge: self.config.badge.clone(),
            vibrate: self.config.vibrate.clone(),
            actions: vec![
                NotificationAction::new("explore", "Explore this new world"),
                NotificationAction::new("close", "Close notification"),
            ],
            arrived_at: Utc::now(),
        }
    }

    /// Handle a push event: display the notification.
    pub fn on_push(&self, payload: Option<&[u8]>) -> NotificationId {
        let notification = self.compose(payload);
        debug!(body = %notification.body, "push received");
        self.surface.show(notification)
    }

    /// Handle a click on the notification body or one of its actions.
    ///
    /// Every click dismisses the notification and brings the application
    /// root to the front.
    pub fn on_click(&self, id: NotificationId, action: Option<&str>) -> WindowAction {
        self.surface.dismiss(id);
        let window = self.clients.open_or_focus(&self.root_url);
        debug!(notification = id, action = action.unwrap_or("body"), ?window, "notification clicked");
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (NotificationChannel, Arc<MemorySurface>, Arc<ClientHub>) {
        let surface = Arc::new(MemorySurface::new());
        let clients = Arc::new(ClientHub::new());
        let channel = NotificationChannel::new(
            NotificationConfig::default(),
            Url::parse("https://tours.example.com/").unwrap(),
            surface.clone(),
            clients.clone(),
        );
        (channel, surface, clients)
    }

    #[test]
    fn test_push_with_payload() {
        let (channel, surface, _) = channel();
        channel.on_push(Some(b"50% off Lisbon tours".as_slice()));

        let visible = surface.visible();
        assert_eq!(visible.len(), 1);
        let n = &visible[0].1;
        assert_eq!(n.body, "50% off Lisbon tours");
        assert_eq!(n.title, "Explore new destinations");
        assert_eq!(n.icon, "/icons/icon-192x192.png");
        assert_eq!(n.badge, "/icons/badge-72x72.png");
        assert_eq!(n.vibrate, vec![100, 50, 100]);
        let actions: Vec<_> = n.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["explore", "close"]);
    }

    #[test]
    fn test_push_without_payload_uses_default_body() {
        let (channel, _, _) = channel();
        assert_eq!(channel.compose(None).body, "You have a new update");
        assert_eq!(channel.compose(Some(b"  ".as_slice())).body, "You have a new update");
    }

    #[test]
    fn test_click_dismisses_and_opens_root() {
        let (channel, surface, clients) = channel();
        let id = channel.on_push(None);

        let action = channel.on_click(id, Some("explore"));
        assert!(matches!(action, WindowAction::Opened(_)));
        assert!(surface.visible().is_empty());
        let opening = clients.opening();
        assert_eq!(opening.len(), 1);
        assert_eq!(opening[0].1.as_str(), "https://tours.example.com/");
        assert!(clients.is_empty());
    }

    #[test]
    fn test_click_focuses_existing_root_window() {
        let (channel, _, clients) = channel();
        let handle = clients.connect(Url::parse("https://tours.example.com/").unwrap());

        let id = channel.on_push(Some(b"hi".as_slice()));
        let action = channel.on_click(id, Some("close"));
        assert_eq!(action, WindowAction::Focused(handle.id()));
        assert_eq!(clients.len(), 1);
    }
}
