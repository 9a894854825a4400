use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use madarij_core::bell::BellView;

use crate::api::ClientError;
use crate::sync::NotificationSync;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Polling cadence for the bell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
}

impl PollConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Mounted notification bell.
///
/// Mounting starts a background task that fetches the list immediately and
/// then on every tick. Dropping or [`unmount`](Self::unmount)ing the bell
/// stops the timer only: a poll already on the wire still completes and
/// lands in the store, so the fetch always reaches fulfilled or rejected.
/// Requests issued through [`select`](Self::select) and
/// [`mark_all`](Self::mark_all) are awaited by the caller.
pub struct NotificationBell {
    sync: NotificationSync,
    poller: Option<Poller>,
    is_open: bool,
}

struct Poller {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

impl NotificationBell {
    /// Mounts the bell and starts polling. Must be called inside a Tokio runtime.
    pub fn mount(sync: NotificationSync, config: PollConfig) -> Self {
        let (stop, stopped) = watch::channel(false);
        let handle = spawn_poller(sync.clone(), config.interval, stopped);
        info!(stage = "client", interval_ms = config.interval.as_millis() as u64, "notification bell mounted");
        Self {
            sync,
            poller: Some(Poller { handle, stop }),
            is_open: false,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .map(|poller| !poller.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Opens or closes the dropdown.
    pub fn toggle(&mut self) {
        self.is_open = !self.is_open;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// Renders the current cache.
    pub fn view(&self, now: DateTime<Utc>) -> BellView {
        self.sync
            .store()
            .with_state(|state| BellView::render(state, self.is_open, now))
    }

    /// Handles a click on a row: unread rows are marked as read.
    ///
    /// Returns `Ok(false)` when nothing had to be sent.
    pub async fn select(&self, id: &str) -> Result<bool, ClientError> {
        let unread = self
            .sync
            .store()
            .with_state(|state| state.find(id).map(|n| !n.is_read).unwrap_or(false));
        if !unread {
            return Ok(false);
        }
        self.sync.mark_as_read(id).await?;
        Ok(true)
    }

    /// Handles the header action; only sends when something is unread.
    pub async fn mark_all(&self) -> Result<bool, ClientError> {
        let has_unread = self
            .sync
            .store()
            .with_state(|state| state.unread_count() > 0);
        if !has_unread {
            return Ok(false);
        }
        self.sync.mark_all_as_read().await?;
        Ok(true)
    }

    /// Stops the polling timer. In-flight requests are left to finish.
    pub fn unmount(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(poller) = self.poller.take() {
            // The task may already be gone; nothing to signal then.
            let _ = poller.stop.send(true);
            info!(stage = "client", "notification bell unmounted");
        }
    }
}

impl Drop for NotificationBell {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_poller(
    sync: NotificationSync,
    period: Duration,
    mut stopped: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = stopped.changed() => break,
                _ = ticker.tick() => {}
            }
            if let Err(err) = sync.fetch_notifications().await {
                debug!(stage = "client", error = %err, "poll failed; retrying on next tick");
            }
        }
        debug!(stage = "client", "poll loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use madarij_core::bell::{BellBody, MAX_VISIBLE};
    use madarij_core::state::{RequestKind, RequestPhase};
    use reqwest::Client;
    use serde_json::{json, Value};
    use tokio::time::{sleep, timeout};
    use url::Url;

    use crate::api::NotificationsApi;
    use crate::session::Session;
    use crate::store::NotificationStore;

    fn sync_for(server: &MockServer) -> NotificationSync {
        let base = Url::parse(&server.base_url()).expect("url");
        let api = NotificationsApi::new(
            base,
            Session::with_token("token"),
            Client::builder().build().expect("client"),
        );
        NotificationSync::new(api, NotificationStore::new())
    }

    fn notifications(count: usize, unread: &[usize]) -> Vec<Value> {
        (0..count)
            .map(|idx| {
                json!({
                    "_id": format!("n-{idx}"),
                    "type": "interview_scheduled",
                    "title": format!("إشعار {idx}"),
                    "message": "رسالة",
                    "isRead": !unread.contains(&idx),
                    "createdAt": "2025-01-01T00:00:00Z"
                })
            })
            .collect()
    }

    async fn wait_for_fetch(sync: &NotificationSync) {
        let mut receiver = sync.store().subscribe();
        timeout(Duration::from_secs(2), async {
            loop {
                if !receiver.borrow_and_update().notifications().is_empty() {
                    break;
                }
                receiver.changed().await.expect("store alive");
            }
        })
        .await
        .expect("first poll completes");
    }

    #[tokio::test]
    async fn mount_fetches_and_select_marks_unread_row() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/notifications");
                then.status(200)
                    .json_body(json!({ "notifications": notifications(12, &[1, 5, 9]) }));
            })
            .await;
        let mark = server
            .mock_async(|when, then| {
                when.method(PUT).path("/api/notifications/n-1/read");
                then.status(200).json_body(json!({ "message": "ok" }));
            })
            .await;

        let sync = sync_for(&server);
        let mut bell = NotificationBell::mount(sync.clone(), PollConfig::default());
        wait_for_fetch(&sync).await;
        bell.toggle();

        let view = bell.view(Utc::now());
        assert!(view.is_open);
        assert_eq!(view.badge.as_deref(), Some("3"));
        assert_eq!(view.items().len(), MAX_VISIBLE);

        let second = view.items()[1].id.clone();
        assert!(bell.select(&second).await.expect("select"));
        mark.assert_async().await;

        let view = bell.view(Utc::now());
        assert!(!view.items()[1].is_unread);
        assert_eq!(view.badge.as_deref(), Some("2"));

        assert!(!bell.select(&second).await.expect("already read"));
        assert_eq!(mark.hits_async().await, 1);
        bell.unmount();
    }

    #[tokio::test]
    async fn mark_all_is_skipped_without_unread() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/notifications");
                then.status(200)
                    .json_body(json!({ "notifications": notifications(2, &[]) }));
            })
            .await;
        let mark_all = server
            .mock_async(|when, then| {
                when.method(PUT).path("/api/notifications/read-all");
                then.status(200).json_body(json!({ "message": "ok" }));
            })
            .await;

        let sync = sync_for(&server);
        let bell = NotificationBell::mount(sync.clone(), PollConfig::default());
        wait_for_fetch(&sync).await;

        assert!(!bell.mark_all().await.expect("mark all"));
        assert_eq!(mark_all.hits_async().await, 0);
        assert_eq!(bell.view(Utc::now()).mark_all_label, None);
    }

    #[tokio::test]
    async fn polling_repeats_until_unmounted() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/notifications");
                then.status(200)
                    .json_body(json!({ "notifications": notifications(1, &[0]) }));
            })
            .await;

        let sync = sync_for(&server);
        let bell = NotificationBell::mount(
            sync.clone(),
            PollConfig::with_interval(Duration::from_millis(40)),
        );
        wait_for_fetch(&sync).await;
        sleep(Duration::from_millis(200)).await;
        assert!(list.hits_async().await >= 2, "timer re-triggers fetch");
        assert!(bell.is_polling());

        bell.unmount();
        sleep(Duration::from_millis(100)).await;
        let after_unmount = list.hits_async().await;
        sleep(Duration::from_millis(200)).await;
        assert_eq!(list.hits_async().await, after_unmount);
    }

    #[tokio::test]
    async fn unmount_lets_in_flight_poll_settle() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/notifications");
                then.status(200)
                    .delay(Duration::from_millis(300))
                    .json_body(json!({ "notifications": notifications(2, &[0]) }));
            })
            .await;

        let sync = sync_for(&server);
        let bell = NotificationBell::mount(sync.clone(), PollConfig::default());
        sleep(Duration::from_millis(100)).await;
        assert!(sync.store().snapshot().is_loading());

        bell.unmount();

        let mut receiver = sync.store().subscribe();
        timeout(Duration::from_secs(2), async {
            loop {
                if !receiver.borrow_and_update().is_loading() {
                    break;
                }
                receiver.changed().await.expect("store alive");
            }
        })
        .await
        .expect("fetch settles after unmount");

        let state = sync.store().snapshot();
        assert_eq!(state.phase(RequestKind::Fetch), RequestPhase::Fulfilled);
        assert_eq!(state.notifications().len(), 2);
        assert_eq!(state.unread_count(), 1);
        assert!(matches!(
            BellView::render(&state, false, Utc::now()).body,
            BellBody::Items(_)
        ));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(list.hits_async().await, 1);
    }

    #[tokio::test]
    async fn failed_poll_sets_error_and_next_success_clears_it() {
        let server = MockServer::start_async().await;
        let mut failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/notifications");
                then.status(500)
                    .json_body(json!({ "message": "حدث خطأ في الخادم" }));
            })
            .await;

        let sync = sync_for(&server);
        let _bell = NotificationBell::mount(
            sync.clone(),
            PollConfig::with_interval(Duration::from_millis(40)),
        );

        let mut receiver = sync.store().subscribe();
        let recorded = timeout(Duration::from_secs(2), async {
            loop {
                if let Some(error) = receiver.borrow_and_update().error() {
                    break error.to_string();
                }
                receiver.changed().await.expect("store alive");
            }
        })
        .await
        .expect("error recorded");
        assert_eq!(recorded, "حدث خطأ في الخادم");

        failing.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/notifications");
                then.status(200)
                    .json_body(json!({ "notifications": notifications(1, &[0]) }));
            })
            .await;

        wait_for_fetch(&sync).await;
        assert_eq!(sync.store().snapshot().error(), None);
    }
}
