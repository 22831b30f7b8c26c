//! Headless views: the state and flows a UI shell binds to.
//!
//! Each view owns its slice of store state, subscribes to the bus, and
//! watches the cache keys it renders from. Dropping a view tears its
//! subscriptions down with it.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod inbox;
pub mod navbar;
pub mod notices;
pub mod profile;

pub use inbox::InboxView;
pub use navbar::NavbarView;
pub use notices::NoticeView;
pub use profile::ProfileView;

/// Lifecycle of a view's most recent fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl ViewStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
