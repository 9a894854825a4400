use std::sync::Arc;

use tokio::sync::watch;

use madarij_core::state::{Action, NotificationsState};

/// Owner of the client notification cache.
///
/// Every change goes through [`dispatch`](Self::dispatch), which applies one
/// transition while holding the channel's write lock; readers get snapshots
/// or subscribe for change notifications.
#[derive(Clone)]
pub struct NotificationStore {
    sender: Arc<watch::Sender<NotificationsState>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(NotificationsState::new());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn dispatch(&self, action: Action) {
        self.sender.send_modify(|state| state.apply(action));
    }

    /// Copy of the current cache.
    pub fn snapshot(&self) -> NotificationsState {
        self.sender.borrow().clone()
    }

    /// Reads the cache without cloning it.
    pub fn with_state<R>(&self, read: impl FnOnce(&NotificationsState) -> R) -> R {
        read(&self.sender.borrow())
    }

    /// Receiver woken after every dispatched action.
    pub fn subscribe(&self) -> watch::Receiver<NotificationsState> {
        self.sender.subscribe()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
