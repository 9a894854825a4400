use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_TITLE_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 2000;

/// Notification as exposed over the HTTP API and held in the client cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Category of a notification.
///
/// The set is open: values this build does not know are kept verbatim in
/// [`NotificationKind::Other`] so they survive a decode/encode cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    InterviewScheduled,
    InterviewReminder,
    StudentAccepted,
    StudentRejected,
    Generic,
    Other(String),
}

impl NotificationKind {
    /// Returns the canonical wire/database representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InterviewScheduled => "interview_scheduled",
            Self::InterviewReminder => "interview_reminder",
            Self::StudentAccepted => "student_accepted",
            Self::StudentRejected => "student_rejected",
            Self::Generic => "generic",
            Self::Other(value) => value,
        }
    }

    /// Returns the label used for metrics; unknown kinds collapse into `other`.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::InterviewScheduled => "interview_scheduled",
            Self::InterviewReminder => "interview_reminder",
            Self::StudentAccepted => "student_accepted",
            Self::StudentRejected => "student_rejected",
            Self::Generic => "generic",
            Self::Other(_) => "other",
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(value: &str) -> Self {
        match value {
            "interview_scheduled" => Self::InterviewScheduled,
            "interview_reminder" => Self::InterviewReminder,
            "student_accepted" => Self::StudentAccepted,
            "student_rejected" => Self::StudentRejected,
            "generic" => Self::Generic,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<NotificationKind> for String {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload accepted by the creation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub recipient: String,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Generic
}

impl NewNotification {
    /// Checks the payload before it is persisted.
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.recipient.trim().is_empty() {
            return Err(NotificationError::MissingField("recipient"));
        }
        if self.kind.as_str().trim().is_empty() {
            return Err(NotificationError::MissingField("type"));
        }
        if self.title.trim().is_empty() {
            return Err(NotificationError::MissingField("title"));
        }
        if self.message.trim().is_empty() {
            return Err(NotificationError::MissingField("message"));
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(NotificationError::TooLong {
                field: "title",
                max: MAX_TITLE_CHARS,
            });
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(NotificationError::TooLong {
                field: "message",
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(())
    }
}

/// Validation failures for [`NewNotification`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// `GET /api/notifications` response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

/// `GET /api/notifications/unread-count` response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Creation response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub notification: Notification,
}

/// Acknowledgement body returned by mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Notification {
        Notification {
            id: "n-1".to_string(),
            kind: NotificationKind::InterviewScheduled,
            title: "تم تحديد موعد مقابلة".to_string(),
            message: "مقابلة الطالب أحمد".to_string(),
            is_read: false,
            created_at: DateTime::parse_from_rfc3339("2025-01-01T10:00:00Z")
                .expect("timestamp")
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(value["_id"], "n-1");
        assert_eq!(value["type"], "interview_scheduled");
        assert_eq!(value["isRead"], false);
        assert_eq!(value["createdAt"], "2025-01-01T10:00:00Z");
        assert_eq!(value["title"], "تم تحديد موعد مقابلة");
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let value = json!({
            "_id": "n-2",
            "type": "halqa_cancelled",
            "title": "t",
            "message": "m",
            "isRead": true,
            "createdAt": "2025-01-01T10:00:00Z"
        });
        let notification: Notification = serde_json::from_value(value).expect("decode");
        assert_eq!(
            notification.kind,
            NotificationKind::Other("halqa_cancelled".to_string())
        );

        let encoded = serde_json::to_value(&notification).expect("encode");
        assert_eq!(encoded["type"], "halqa_cancelled");
    }

    #[test]
    fn new_notification_defaults_to_generic_kind() {
        let payload: NewNotification = serde_json::from_value(json!({
            "title": "تنبيه",
            "message": "رسالة",
            "recipient": "user-1"
        }))
        .expect("decode");
        assert_eq!(payload.kind, NotificationKind::Generic);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let payload = NewNotification {
            kind: NotificationKind::Generic,
            title: "   ".to_string(),
            message: "m".to_string(),
            recipient: "user-1".to_string(),
        };
        assert_eq!(
            payload.validate(),
            Err(NotificationError::MissingField("title"))
        );

        let payload = NewNotification {
            recipient: String::new(),
            ..payload
        };
        assert_eq!(
            payload.validate(),
            Err(NotificationError::MissingField("recipient"))
        );
    }

    #[test]
    fn validate_rejects_oversized_title() {
        let payload = NewNotification {
            kind: NotificationKind::Generic,
            title: "ع".repeat(MAX_TITLE_CHARS + 1),
            message: "m".to_string(),
            recipient: "user-1".to_string(),
        };
        assert!(matches!(
            payload.validate(),
            Err(NotificationError::TooLong { field: "title", .. })
        ));
    }
}
