use tokio::sync::broadcast;

use crate::models::Project;

const EVENT_CAPACITY: usize = 32;

/// Notifications for downstream views after a state change
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A project became the selected one (setup finished or explicit re-selection)
    ProjectSelected { project_id: u64 },
    /// A project was created or updated remotely
    ProjectUpdated { project: Project },
    ThemeChanged { theme: String },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    /// Publishing with nobody listening is fine
    pub fn publish(&self, event: CoreEvent) {
        tracing::debug!("event: {:?}", event);
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
