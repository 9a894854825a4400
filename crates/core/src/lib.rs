//! Domain layer shared by the notification server and its clients.
//!
//! Server-side pieces ([`types`], [`triggers`]) describe what is stored and
//! how domain events become notifications; client-side pieces ([`state`],
//! [`bell`], [`time`]) hold the polled cache and derive what the bell shows.

pub mod bell;
pub mod state;
pub mod time;
pub mod triggers;
pub mod types;

pub use state::{Action, NotificationsState, RequestKind, RequestPhase};
pub use types::{Notification, NotificationError, NotificationKind, NewNotification};
