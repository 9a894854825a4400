use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NewNotification, NotificationKind};

/// Domain events raised by the student/halqa workflows that notify staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    #[serde(rename_all = "camelCase")]
    InterviewScheduled {
        recipient: String,
        student_name: String,
        scheduled_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    InterviewReminder {
        recipient: String,
        student_name: String,
        scheduled_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    StudentAccepted {
        recipient: String,
        student_name: String,
        #[serde(default)]
        halqa: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    StudentRejected {
        recipient: String,
        student_name: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl DomainEvent {
    /// Returns the user that should receive the notification.
    pub fn recipient(&self) -> &str {
        match self {
            Self::InterviewScheduled { recipient, .. }
            | Self::InterviewReminder { recipient, .. }
            | Self::StudentAccepted { recipient, .. }
            | Self::StudentRejected { recipient, .. } => recipient,
        }
    }

    /// Returns the canonical event type string used in logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::InterviewScheduled { .. } => "interview.scheduled",
            Self::InterviewReminder { .. } => "interview.reminder",
            Self::StudentAccepted { .. } => "student.accepted",
            Self::StudentRejected { .. } => "student.rejected",
        }
    }
}

/// Pure mapping from domain events to the notification they produce.
pub struct Triggers;

impl Triggers {
    /// Builds the notification payload for the provided event.
    pub fn notification_for(event: &DomainEvent) -> NewNotification {
        let recipient = event.recipient().to_string();
        match event {
            DomainEvent::InterviewScheduled {
                student_name,
                scheduled_at,
                ..
            } => NewNotification {
                kind: NotificationKind::InterviewScheduled,
                title: "تم تحديد موعد مقابلة".to_string(),
                message: format!(
                    "تم تحديد موعد مقابلة للطالب {student_name} بتاريخ {}",
                    format_schedule(*scheduled_at)
                ),
                recipient,
            },
            DomainEvent::InterviewReminder {
                student_name,
                scheduled_at,
                ..
            } => NewNotification {
                kind: NotificationKind::InterviewReminder,
                title: "تذكير بموعد مقابلة".to_string(),
                message: format!(
                    "موعد مقابلة الطالب {student_name} بتاريخ {}",
                    format_schedule(*scheduled_at)
                ),
                recipient,
            },
            DomainEvent::StudentAccepted {
                student_name,
                halqa,
                ..
            } => {
                let message = match halqa {
                    Some(halqa) => format!("تم قبول الطالب {student_name} في حلقة {halqa}"),
                    None => format!("تم قبول الطالب {student_name}"),
                };
                NewNotification {
                    kind: NotificationKind::StudentAccepted,
                    title: "تم قبول طالب".to_string(),
                    message,
                    recipient,
                }
            }
            DomainEvent::StudentRejected {
                student_name,
                reason,
                ..
            } => {
                let message = match reason {
                    Some(reason) => format!("تم رفض الطالب {student_name} - السبب: {reason}"),
                    None => format!("تم رفض الطالب {student_name}"),
                };
                NewNotification {
                    kind: NotificationKind::StudentRejected,
                    title: "تم رفض طالب".to_string(),
                    message,
                    recipient,
                }
            }
        }
    }
}

fn format_schedule(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}
