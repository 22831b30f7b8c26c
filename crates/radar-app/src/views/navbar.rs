//! The top navigation bar: an unread badge that stays in sync with
//! whatever the rest of the app does to notifications.
//!
//! The badge updates two ways: instantly via
//! [`AppEvent::NotificationsRefreshed`] on the bus, and eventually via
//! the cache watcher plus [`NavbarView::refresh_if_stale`] when some
//! other component invalidates the feed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use radar_api::ApiError;
use radar_shared::Notification;
use radar_store::{NoticeState, QueryKey, WatchHandle};

use crate::events::{AppEvent, Subscription};
use crate::session::Session;
use crate::views::{lock, ViewStatus};

const BADGE_MAX: usize = 9;

pub struct NavbarView {
    session: Session,
    notices: Arc<Mutex<NoticeState>>,
    status: Arc<Mutex<ViewStatus>>,
    unread: Arc<AtomicUsize>,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
    _watch: WatchHandle,
}

impl NavbarView {
    pub fn new(session: &Session) -> Self {
        let unread = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let unread = unread.clone();
            session.bus().subscribe(move |event| {
                if let AppEvent::NotificationsRefreshed { unread: count } = event {
                    unread.store(*count, Ordering::SeqCst);
                }
            })
        };
        let stale = Arc::new(AtomicBool::new(false));
        let watch = {
            let stale = stale.clone();
            session.cache().watch(QueryKey::Notifications, move || {
                stale.store(true, Ordering::SeqCst);
            })
        };
        Self {
            session: session.clone(),
            notices: Arc::new(Mutex::new(NoticeState::new())),
            status: Arc::new(Mutex::new(ViewStatus::Idle)),
            unread,
            stale,
            _subscription: subscription,
            _watch: watch,
        }
    }

    pub fn status(&self) -> ViewStatus {
        lock(&self.status).clone()
    }

    pub fn unread_count(&self) -> usize {
        self.unread.load(Ordering::SeqCst)
    }

    /// Badge text: `None` when everything is read, the exact count up
    /// to 9, then "9+".
    pub fn unread_badge(&self) -> Option<String> {
        match self.unread_count() {
            0 => None,
            n if n > BADGE_MAX => Some(format!("{BADGE_MAX}+")),
            n => Some(n.to_string()),
        }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notices).notifications().to_vec()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Fetch the feed, from cache while fresh, and broadcast the
    /// resulting unread count. Quiet on failure; the poll calls this.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        *lock(&self.status) = ViewStatus::Loading;
        self.stale.store(false, Ordering::SeqCst);

        let fetched = match self.session.cache().get(&QueryKey::Notifications) {
            Some(cached) => serde_json::from_value(cached).ok(),
            None => None,
        };
        let notifications = match fetched {
            Some(notifications) => notifications,
            None => {
                match self
                    .session
                    .guard_quiet(self.session.api().list_notifications().await)
                {
                    Ok(notifications) => {
                        if let Ok(value) = serde_json::to_value(&notifications) {
                            self.session.cache().put(QueryKey::Notifications, value);
                        }
                        notifications
                    }
                    Err(error) => {
                        *lock(&self.status) = ViewStatus::Failed(error.user_message());
                        return Err(error);
                    }
                }
            }
        };

        let unread = {
            let mut notices = lock(&self.notices);
            notices.set_notifications(notifications);
            notices.unread_count()
        };
        self.unread.store(unread, Ordering::SeqCst);
        *lock(&self.status) = ViewStatus::Ready;
        self.session
            .bus()
            .publish(&AppEvent::NotificationsRefreshed { unread });
        Ok(())
    }

    pub async fn refresh_if_stale(&self) -> Result<(), ApiError> {
        if self.stale.swap(false, Ordering::SeqCst) {
            self.refresh().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn offline_session() -> Session {
        Session::new(ClientConfig {
            api_base_url: "http://127.0.0.1:1".into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_badge_tracks_bus_updates() {
        let session = offline_session();
        let view = NavbarView::new(&session);
        assert_eq!(view.unread_badge(), None);

        session
            .bus()
            .publish(&AppEvent::NotificationsRefreshed { unread: 3 });
        assert_eq!(view.unread_badge().as_deref(), Some("3"));

        session
            .bus()
            .publish(&AppEvent::NotificationsRefreshed { unread: 9 });
        assert_eq!(view.unread_badge().as_deref(), Some("9"));

        session
            .bus()
            .publish(&AppEvent::NotificationsRefreshed { unread: 12 });
        assert_eq!(view.unread_badge().as_deref(), Some("9+"));

        session
            .bus()
            .publish(&AppEvent::NotificationsRefreshed { unread: 0 });
        assert_eq!(view.unread_badge(), None);
    }

    #[test]
    fn test_feed_invalidation_marks_stale() {
        let session = offline_session();
        let view = NavbarView::new(&session);
        assert!(!view.is_stale());

        session.cache().invalidate(&QueryKey::Notifications);
        assert!(view.is_stale());
    }
}
