//! Flow events: notices and navigation requests broadcast to the UI.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use super::state::FlowState;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// A toast-style notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Notice {
    pub fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            destructive: false,
        }
    }

    pub fn destructive(title: &str, description: &str) -> Self {
        Self {
            destructive: true,
            ..Self::info(title, description)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    Notice(Notice),
    /// Go to `route`. `replace` drops the current page from history.
    Navigate { route: String, replace: bool },
    StateChanged { state: FlowState },
}

/// Fan-out of flow events. Sending with no subscribers is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FlowEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: FlowEvent) {
        debug!(?event, "Flow event");
        let _ = self.tx.send(event);
    }

    pub fn notice(&self, notice: Notice) {
        self.emit(FlowEvent::Notice(notice));
    }

    pub fn navigate(&self, route: &str, replace: bool) {
        self.emit(FlowEvent::Navigate {
            route: route.to_string(),
            replace,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
