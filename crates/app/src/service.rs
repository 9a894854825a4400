use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use madarij_core::triggers::{DomainEvent, Triggers};
use madarij_core::types::{NewNotification, Notification, NotificationError};
use madarij_storage::{Database, MarkReadOutcome, NotificationStoreError};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Notification operations scoped to an authenticated principal.
#[derive(Clone)]
pub struct NotificationService {
    database: Database,
    clock: Clock,
}

impl NotificationService {
    pub fn new(database: Database, clock: Clock) -> Self {
        Self { database, clock }
    }

    #[cfg(test)]
    pub fn with_clock(&self, clock: Clock) -> Self {
        Self::new(self.database.clone(), clock)
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Every notification of `recipient_id`, newest first.
    pub async fn list_for(&self, recipient_id: &str) -> Result<Vec<Notification>, ServiceError> {
        let notifications = self
            .database
            .notifications()
            .list_for_recipient(recipient_id)
            .await?;
        debug!(stage = "service", recipient = recipient_id, count = notifications.len(), "listed notifications");
        Ok(notifications)
    }

    pub async fn unread_count(&self, recipient_id: &str) -> Result<u64, ServiceError> {
        Ok(self
            .database
            .notifications()
            .count_unread(recipient_id)
            .await?)
    }

    /// Idempotent; a notification owned by someone else reports `NotFound`.
    pub async fn mark_as_read(&self, recipient_id: &str, id: &str) -> Result<(), ServiceError> {
        let id = Uuid::parse_str(id).map_err(|_| ServiceError::InvalidId)?;
        let outcome = self
            .database
            .notifications()
            .mark_read(recipient_id, &id.to_string(), self.now())
            .await?;
        match outcome {
            MarkReadOutcome::Marked => Ok(()),
            MarkReadOutcome::NotFound => Err(ServiceError::NotFound),
        }
    }

    /// Returns how many notifications changed state.
    pub async fn mark_all_as_read(&self, recipient_id: &str) -> Result<u64, ServiceError> {
        let changed = self
            .database
            .notifications()
            .mark_all_read(recipient_id, self.now())
            .await?;
        debug!(stage = "service", recipient = recipient_id, changed, "marked all notifications read");
        Ok(changed)
    }

    pub async fn create(&self, record: NewNotification) -> Result<Notification, ServiceError> {
        record.validate()?;
        let notification = self
            .database
            .notifications()
            .insert(&record, self.now())
            .await?;
        counter!("notifications_created_total", "type" => record.kind.metric_label()).increment(1);
        info!(
            stage = "service",
            id = %notification.id,
            recipient = %record.recipient,
            kind = %record.kind,
            "notification created"
        );
        Ok(notification)
    }

    /// Builds the notification a domain event calls for and persists it.
    pub async fn publish(&self, event: &DomainEvent) -> Result<Notification, ServiceError> {
        debug!(stage = "service", event = event.event_type(), recipient = event.recipient(), "publishing domain event");
        self.create(Triggers::notification_for(event)).await
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("notification id is not a valid identifier")]
    InvalidId,
    #[error("notification not found")]
    NotFound,
    #[error("invalid notification: {0}")]
    Invalid(#[from] NotificationError),
    #[error("storage failure: {0}")]
    Storage(#[from] NotificationStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use madarij_core::types::NotificationKind;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).single().expect("valid time")
    }

    async fn setup() -> NotificationService {
        let database = Database::connect("sqlite::memory:?cache=shared")
            .await
            .expect("connect");
        database.run_migrations().await.expect("migrations");
        NotificationService::new(database, Arc::new(fixed_now))
    }

    fn record(recipient: &str, title: &str) -> NewNotification {
        NewNotification {
            kind: NotificationKind::Generic,
            title: title.to_string(),
            message: "رسالة".to_string(),
            recipient: recipient.to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_list_and_count() {
        let service = setup().await;
        let created = service.create(record("u-1", "أول")).await.expect("create");
        assert!(!created.is_read);
        assert_eq!(created.created_at, fixed_now());

        let listed = service.list_for("u-1").await.expect("list");
        assert_eq!(listed, vec![created]);
        assert_eq!(service.unread_count("u-1").await.expect("count"), 1);
        assert_eq!(service.unread_count("u-2").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let service = setup().await;
        let err = service.create(record("u-1", "  ")).await.expect_err("invalid");
        assert!(matches!(
            err,
            ServiceError::Invalid(NotificationError::MissingField("title"))
        ));
    }

    #[tokio::test]
    async fn mark_as_read_is_idempotent_and_scoped() {
        let service = setup().await;
        let created = service.create(record("u-1", "أول")).await.expect("create");

        service.mark_as_read("u-1", &created.id).await.expect("mark");
        service.mark_as_read("u-1", &created.id).await.expect("mark again");
        assert_eq!(service.unread_count("u-1").await.expect("count"), 0);

        assert!(matches!(
            service.mark_as_read("u-2", &created.id).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            service.mark_as_read("u-1", "not-a-uuid").await,
            Err(ServiceError::InvalidId)
        ));
    }

    #[tokio::test]
    async fn mark_all_reports_changes() {
        let service = setup().await;
        service.create(record("u-1", "أ")).await.expect("create");
        service.create(record("u-1", "ب")).await.expect("create");

        assert_eq!(service.mark_all_as_read("u-1").await.expect("mark all"), 2);
        assert_eq!(service.mark_all_as_read("u-1").await.expect("mark all"), 0);
        assert_eq!(service.unread_count("u-1").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn publish_persists_triggered_notification() {
        let service = setup().await;
        let event = DomainEvent::InterviewScheduled {
            recipient: "supervisor-1".to_string(),
            student_name: "مريم".to_string(),
            scheduled_at: fixed_now() + Duration::days(1),
        };

        let created = service.publish(&event).await.expect("publish");
        assert_eq!(created.kind, NotificationKind::InterviewScheduled);
        assert_eq!(
            service.list_for("supervisor-1").await.expect("list")[0].id,
            created.id
        );
    }
}
