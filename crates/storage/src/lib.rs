use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use madarij_core::types::{NewNotification, Notification, NotificationKind};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to interact with the notifications table.
    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository responsible for the `notifications` table.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Persists a new unread notification and returns it.
    pub async fn insert(
        &self,
        record: &NewNotification,
        created_at: DateTime<Utc>,
    ) -> Result<Notification, NotificationStoreError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO notifications \
             (id, recipient_id, type, title, message, is_read, created_at) \
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&record.recipient)
        .bind(record.kind.as_str())
        .bind(&record.title)
        .bind(&record.message)
        .bind(to_rfc3339(created_at))
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id,
            kind: record.kind.clone(),
            title: record.title.clone(),
            message: record.message.clone(),
            is_read: false,
            created_at: truncate_to_millis(created_at),
        })
    }

    /// Lists every notification owned by `recipient_id`, newest first.
    pub async fn list_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<Notification>, NotificationStoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
SELECT id,
       type,
       title,
       message,
       is_read,
       created_at
  FROM notifications
 WHERE recipient_id = ?
 ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(NotificationRow::into_domain).collect())
    }

    /// Counts unread notifications owned by `recipient_id`.
    pub async fn count_unread(&self, recipient_id: &str) -> Result<u64, NotificationStoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    /// Marks a single notification as read.
    ///
    /// Already-read rows still match and report [`MarkReadOutcome::Marked`];
    /// `read_at` keeps the first time the row was read.
    pub async fn mark_read(
        &self,
        recipient_id: &str,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkReadOutcome, NotificationStoreError> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = 1, \
                 read_at = COALESCE(read_at, ?) \
             WHERE id = ? AND recipient_id = ?",
        )
        .bind(to_rfc3339(at))
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(MarkReadOutcome::NotFound)
        } else {
            Ok(MarkReadOutcome::Marked)
        }
    }

    /// Marks every unread notification of `recipient_id` as read, returning how many changed.
    pub async fn mark_all_read(
        &self,
        recipient_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, NotificationStoreError> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = 1, read_at = ? \
             WHERE recipient_id = ? AND is_read = 0",
        )
        .bind(to_rfc3339(at))
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Result of marking a single notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    Marked,
    NotFound,
}

/// Error type for operations on the notification repository.
#[derive(Debug, Error)]
pub enum NotificationStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: String,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    message: String,
    is_read: i64,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_domain(self) -> Notification {
        Notification {
            id: self.id,
            kind: NotificationKind::from(self.kind),
            title: self.title,
            message: self.message,
            is_read: self.is_read != 0,
            created_at: self.created_at,
        }
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn setup_db() -> Database {
        let db = Database::connect("sqlite::memory:?cache=shared")
            .await
            .expect("connect");
        db.run_migrations().await.expect("migrations");
        db
    }

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-02-01T08:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn new_notification(recipient: &str, title: &str) -> NewNotification {
        NewNotification {
            kind: NotificationKind::InterviewScheduled,
            title: title.to_string(),
            message: "تم تحديد موعد".to_string(),
            recipient: recipient.to_string(),
        }
    }

    #[tokio::test]
    async fn migrations_apply() {
        let db = setup_db().await;

        let tables: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'notifications'",
        )
        .fetch_one(db.pool())
        .await
        .expect("fetch tables");
        assert_eq!(tables.0, 1);
    }

    #[tokio::test]
    async fn insert_and_list_newest_first() {
        let db = setup_db().await;
        let repo = db.notifications();

        let first = repo
            .insert(&new_notification("u-1", "الأول"), base_time())
            .await
            .expect("insert first");
        let second = repo
            .insert(
                &new_notification("u-1", "الثاني"),
                base_time() + Duration::minutes(3),
            )
            .await
            .expect("insert second");
        repo.insert(&new_notification("u-2", "لغيره"), base_time())
            .await
            .expect("insert other");

        let listed = repo.list_for_recipient("u-1").await.expect("list");
        assert_eq!(listed, vec![second, first]);
        assert!(listed.iter().all(|n| !n.is_read));
    }

    #[tokio::test]
    async fn unknown_type_round_trips_through_storage() {
        let db = setup_db().await;
        let repo = db.notifications();
        let mut record = new_notification("u-1", "رسوم");
        record.kind = NotificationKind::Other("fees_due".to_string());
        repo.insert(&record, base_time()).await.expect("insert");

        let listed = repo.list_for_recipient("u-1").await.expect("list");
        assert_eq!(
            listed[0].kind,
            NotificationKind::Other("fees_due".to_string())
        );
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_scoped_to_owner() {
        let db = setup_db().await;
        let repo = db.notifications();
        let created = repo
            .insert(&new_notification("u-1", "مقابلة"), base_time())
            .await
            .expect("insert");
        assert_eq!(repo.count_unread("u-1").await.expect("count"), 1);

        let outcome = repo
            .mark_read("u-2", &created.id, base_time())
            .await
            .expect("mark other");
        assert_eq!(outcome, MarkReadOutcome::NotFound);
        assert_eq!(repo.count_unread("u-1").await.expect("count"), 1);

        for _ in 0..2 {
            let outcome = repo
                .mark_read("u-1", &created.id, base_time())
                .await
                .expect("mark");
            assert_eq!(outcome, MarkReadOutcome::Marked);
        }
        assert_eq!(repo.count_unread("u-1").await.expect("count"), 0);
    }

    #[tokio::test]
    async fn mark_read_keeps_first_read_timestamp() {
        let db = setup_db().await;
        let repo = db.notifications();
        let created = repo
            .insert(&new_notification("u-1", "مقابلة"), base_time())
            .await
            .expect("insert");

        repo.mark_read("u-1", &created.id, base_time() + Duration::minutes(1))
            .await
            .expect("first mark");
        repo.mark_read("u-1", &created.id, base_time() + Duration::hours(2))
            .await
            .expect("second mark");

        let (read_at,): (String,) = sqlx::query_as("SELECT read_at FROM notifications WHERE id = ?")
            .bind(&created.id)
            .fetch_one(db.pool())
            .await
            .expect("read_at");
        assert_eq!(read_at, "2025-02-01T08:01:00.000Z");
    }

    #[tokio::test]
    async fn mark_all_read_only_touches_owner() {
        let db = setup_db().await;
        let repo = db.notifications();
        for idx in 0..3 {
            repo.insert(
                &new_notification("u-1", &format!("n{idx}")),
                base_time() + Duration::seconds(idx),
            )
            .await
            .expect("insert");
        }
        repo.insert(&new_notification("u-2", "other"), base_time())
            .await
            .expect("insert other");

        let changed = repo.mark_all_read("u-1", base_time()).await.expect("mark all");
        assert_eq!(changed, 3);
        assert_eq!(repo.count_unread("u-1").await.expect("count"), 0);
        assert_eq!(repo.count_unread("u-2").await.expect("count"), 1);

        let changed = repo.mark_all_read("u-1", base_time()).await.expect("again");
        assert_eq!(changed, 0);
    }
}
