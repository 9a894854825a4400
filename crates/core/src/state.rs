use crate::types::Notification;

/// Logical requests tracked by the client cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Fetch,
    UnreadCount,
    MarkOne,
    MarkAll,
}

impl RequestKind {
    /// Message shown when the server does not provide one.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Fetch => "فشل تحميل الإشعارات",
            Self::UnreadCount => "فشل تحميل عدد الإشعارات",
            Self::MarkOne => "فشل تحديث حالة الإشعار",
            Self::MarkAll => "فشل تحديث حالة الإشعارات",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::UnreadCount => "unread_count",
            Self::MarkOne => "mark_one",
            Self::MarkAll => "mark_all",
        }
    }
}

/// Lifecycle of a single logical request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestPhase {
    #[default]
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

/// Phase of every logical request, tracked independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestPhases {
    fetch: RequestPhase,
    unread_count: RequestPhase,
    mark_one: RequestPhase,
    mark_all: RequestPhase,
}

impl RequestPhases {
    pub fn get(&self, kind: RequestKind) -> RequestPhase {
        match kind {
            RequestKind::Fetch => self.fetch,
            RequestKind::UnreadCount => self.unread_count,
            RequestKind::MarkOne => self.mark_one,
            RequestKind::MarkAll => self.mark_all,
        }
    }

    fn set(&mut self, kind: RequestKind, phase: RequestPhase) {
        let slot = match kind {
            RequestKind::Fetch => &mut self.fetch,
            RequestKind::UnreadCount => &mut self.unread_count,
            RequestKind::MarkOne => &mut self.mark_one,
            RequestKind::MarkAll => &mut self.mark_all,
        };
        *slot = phase;
    }
}

/// Completion events applied to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Pending(RequestKind),
    FetchFulfilled(Vec<Notification>),
    UnreadCountFulfilled(u64),
    MarkOneFulfilled(String),
    MarkAllFulfilled,
    Rejected {
        request: RequestKind,
        message: Option<String>,
    },
    ClearError,
}

/// Client-side notification cache.
///
/// Fields are private; the only way to change the cache is [`apply`](Self::apply),
/// which performs one whole transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationsState {
    notifications: Vec<Notification>,
    unread_count: u64,
    is_loading: bool,
    error: Option<String>,
    requests: RequestPhases,
}

impl NotificationsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached notifications in server order (newest first).
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> u64 {
        self.unread_count
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn phase(&self, kind: RequestKind) -> RequestPhase {
        self.requests.get(kind)
    }

    /// Looks up a cached notification by id.
    pub fn find(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    /// Applies one transition to the cache.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Pending(kind) => {
                self.requests.set(kind, RequestPhase::Pending);
                if kind == RequestKind::Fetch {
                    self.is_loading = true;
                    self.error = None;
                }
            }
            Action::FetchFulfilled(notifications) => {
                self.requests
                    .set(RequestKind::Fetch, RequestPhase::Fulfilled);
                self.is_loading = false;
                self.error = None;
                self.unread_count = notifications.iter().filter(|n| !n.is_read).count() as u64;
                self.notifications = notifications;
            }
            Action::UnreadCountFulfilled(count) => {
                self.requests
                    .set(RequestKind::UnreadCount, RequestPhase::Fulfilled);
                self.unread_count = count;
            }
            Action::MarkOneFulfilled(id) => {
                self.requests
                    .set(RequestKind::MarkOne, RequestPhase::Fulfilled);
                if let Some(notification) = self
                    .notifications
                    .iter_mut()
                    .find(|n| n.id == id && !n.is_read)
                {
                    notification.is_read = true;
                    self.unread_count = self.unread_count.saturating_sub(1);
                }
            }
            Action::MarkAllFulfilled => {
                self.requests
                    .set(RequestKind::MarkAll, RequestPhase::Fulfilled);
                for notification in &mut self.notifications {
                    notification.is_read = true;
                }
                self.unread_count = 0;
            }
            Action::Rejected { request, message } => {
                self.requests.set(request, RequestPhase::Rejected);
                if request == RequestKind::Fetch {
                    self.is_loading = false;
                }
                self.error = Some(
                    message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| request.fallback_message().to_string()),
                );
            }
            Action::ClearError => {
                self.error = None;
            }
        }
    }
}
