use chrono::{DateTime, Utc};

use crate::state::NotificationsState;
use crate::time::format_relative;
use crate::types::{Notification, NotificationKind};

/// Maximum number of notifications listed in the dropdown.
pub const MAX_VISIBLE: usize = 10;

pub const HEADER_TITLE: &str = "الإشعارات";
pub const MARK_ALL_LABEL: &str = "تحديد الكل كمقروء";
pub const EMPTY_LABEL: &str = "لا توجد إشعارات";
pub const VIEW_ALL_LABEL: &str = "عرض كل الإشعارات";

/// Text shown on the bell badge, `None` when there is nothing unread.
pub fn badge_label(unread_count: u64) -> Option<String> {
    match unread_count {
        0 => None,
        1..=9 => Some(unread_count.to_string()),
        _ => Some("9+".to_string()),
    }
}

/// Icon rendered next to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BellIcon {
    Calendar,
    Check,
    Cross,
    Bell,
}

impl BellIcon {
    pub fn for_kind(kind: &NotificationKind) -> Self {
        match kind {
            NotificationKind::InterviewScheduled | NotificationKind::InterviewReminder => {
                Self::Calendar
            }
            NotificationKind::StudentAccepted => Self::Check,
            NotificationKind::StudentRejected => Self::Cross,
            NotificationKind::Generic | NotificationKind::Other(_) => Self::Bell,
        }
    }

    /// Colour family of the icon.
    pub fn tone(self) -> &'static str {
        match self {
            Self::Calendar => "amber",
            Self::Check => "emerald",
            Self::Cross => "red",
            Self::Bell => "blue",
        }
    }
}

/// One row of the dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BellItem {
    pub id: String,
    pub icon: BellIcon,
    pub title: String,
    pub message: String,
    pub time_label: String,
    pub is_unread: bool,
}

impl BellItem {
    fn from_notification(notification: &Notification, now: DateTime<Utc>) -> Self {
        Self {
            id: notification.id.clone(),
            icon: BellIcon::for_kind(&notification.kind),
            title: notification.title.clone(),
            message: notification.message.clone(),
            time_label: format_relative(notification.created_at, now),
            is_unread: !notification.is_read,
        }
    }
}

/// Dropdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BellBody {
    Loading,
    Empty(&'static str),
    Items(Vec<BellItem>),
}

/// Everything the bell renders, derived from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BellView {
    pub badge: Option<String>,
    pub is_open: bool,
    pub header_title: &'static str,
    pub mark_all_label: Option<&'static str>,
    pub body: BellBody,
    pub view_all_label: Option<&'static str>,
}

impl BellView {
    /// Renders the bell for the given cache snapshot.
    pub fn render(state: &NotificationsState, is_open: bool, now: DateTime<Utc>) -> Self {
        let notifications = state.notifications();
        let body = if state.is_loading() {
            BellBody::Loading
        } else if notifications.is_empty() {
            BellBody::Empty(EMPTY_LABEL)
        } else {
            BellBody::Items(
                notifications
                    .iter()
                    .take(MAX_VISIBLE)
                    .map(|n| BellItem::from_notification(n, now))
                    .collect(),
            )
        };

        Self {
            badge: badge_label(state.unread_count()),
            is_open,
            header_title: HEADER_TITLE,
            mark_all_label: (state.unread_count() > 0).then_some(MARK_ALL_LABEL),
            body,
            view_all_label: (notifications.len() > MAX_VISIBLE).then_some(VIEW_ALL_LABEL),
        }
    }

    /// Visible rows, empty while loading or when there is nothing to show.
    pub fn items(&self) -> &[BellItem] {
        match &self.body {
            BellBody::Items(items) => items.as_slice(),
            _ => &[],
        }
    }
}
