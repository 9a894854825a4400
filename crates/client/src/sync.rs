use tracing::{debug, warn};

use madarij_core::state::{Action, RequestKind};

use crate::api::{ClientError, NotificationsApi};
use crate::store::NotificationStore;

/// Runs the notification requests and feeds their outcome into the store.
///
/// Each operation dispatches `Pending`, awaits one round trip, then
/// dispatches either the fulfilled action or `Rejected`. The error is also
/// returned so callers can react, but the store has already recorded it.
#[derive(Clone)]
pub struct NotificationSync {
    api: NotificationsApi,
    store: NotificationStore,
}

impl NotificationSync {
    pub fn new(api: NotificationsApi, store: NotificationStore) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// Replaces the cached list with the server's.
    pub async fn fetch_notifications(&self) -> Result<(), ClientError> {
        self.store.dispatch(Action::Pending(RequestKind::Fetch));
        match self.api.list().await {
            Ok(notifications) => {
                debug!(stage = "client", count = notifications.len(), "notifications fetched");
                self.store.dispatch(Action::FetchFulfilled(notifications));
                Ok(())
            }
            Err(err) => Err(self.reject(RequestKind::Fetch, err)),
        }
    }

    /// Refreshes the badge counter only.
    pub async fn fetch_unread_count(&self) -> Result<(), ClientError> {
        self.store.dispatch(Action::Pending(RequestKind::UnreadCount));
        match self.api.unread_count().await {
            Ok(count) => {
                self.store.dispatch(Action::UnreadCountFulfilled(count));
                Ok(())
            }
            Err(err) => Err(self.reject(RequestKind::UnreadCount, err)),
        }
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<(), ClientError> {
        self.store.dispatch(Action::Pending(RequestKind::MarkOne));
        match self.api.mark_as_read(id).await {
            Ok(()) => {
                self.store.dispatch(Action::MarkOneFulfilled(id.to_string()));
                Ok(())
            }
            Err(err) => Err(self.reject(RequestKind::MarkOne, err)),
        }
    }

    pub async fn mark_all_as_read(&self) -> Result<(), ClientError> {
        self.store.dispatch(Action::Pending(RequestKind::MarkAll));
        match self.api.mark_all_as_read().await {
            Ok(()) => {
                self.store.dispatch(Action::MarkAllFulfilled);
                Ok(())
            }
            Err(err) => Err(self.reject(RequestKind::MarkAll, err)),
        }
    }

    /// Clears the last error without touching the cache.
    pub fn clear_error(&self) {
        self.store.dispatch(Action::ClearError);
    }

    fn reject(&self, request: RequestKind, err: ClientError) -> ClientError {
        warn!(stage = "client", request = request.as_str(), error = %err, "notification request failed");
        self.store.dispatch(Action::Rejected {
            request,
            message: err.server_message().map(str::to_string),
        });
        err
    }
}
