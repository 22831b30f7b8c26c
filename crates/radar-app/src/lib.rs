//! Composition layer of the Hire Radar client core.
//!
//! A [`Session`] ties the API client, query cache, event bus and toast
//! queue together; headless [`views`] bind store state to the flows a
//! UI shell drives. The crate does no rendering and installs no global
//! subscriber; embedders and tests initialize `tracing` themselves.

pub mod config;
pub mod events;
pub mod mutation;
pub mod poll;
pub mod session;
pub mod toast;
pub mod views;

pub use config::ClientConfig;
pub use events::{AppEvent, EventBus, ProfileTab, Subscription};
pub use mutation::{MutationPhase, MutationTracker};
pub use poll::{spawn_notification_poll, PollHandle};
pub use session::Session;
pub use toast::{Toast, ToastLevel, Toasts};
pub use views::{InboxView, NavbarView, NoticeView, ProfileView, ViewStatus};
