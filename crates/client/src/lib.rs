pub mod api;
pub mod bell;
pub mod session;
pub mod store;
pub mod sync;

pub use api::{ClientError, NotificationsApi};
pub use bell::{NotificationBell, PollConfig};
pub use session::Session;
pub use store::NotificationStore;
pub use sync::NotificationSync;
