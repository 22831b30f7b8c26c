//! The notifications page: feed, mark-read, and answering connection
//! requests straight from a notification.
//!
//! Mark-read is optimistic and one-way: the local flag never flips
//! back. If the server rejects the call, the cached feed is dropped so
//! the next refresh restores server truth instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use radar_api::{ApiError, RequestBook};
use radar_shared::{ConnectionRequest, ConnectionStatus, EntityId, Notification};
use radar_store::{NoticeState, QueryKey, WatchHandle};

use crate::events::{AppEvent, Subscription};
use crate::mutation::MutationTracker;
use crate::session::Session;
use crate::views::{lock, ViewStatus};

pub struct NoticeView {
    session: Session,
    notices: Arc<Mutex<NoticeState>>,
    status: Arc<Mutex<ViewStatus>>,
    tracker: MutationTracker,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
    _watches: Vec<WatchHandle>,
}

impl NoticeView {
    pub fn new(session: &Session) -> Self {
        let status = Arc::new(Mutex::new(ViewStatus::Idle));
        let subscription = {
            let status = status.clone();
            session.bus().subscribe(move |event| {
                if matches!(event, AppEvent::SessionExpired) {
                    *lock(&status) = ViewStatus::Failed("Session expired".to_string());
                }
            })
        };
        let stale = Arc::new(AtomicBool::new(false));
        let watches = [QueryKey::Notifications, QueryKey::ConnectionRequests]
            .into_iter()
            .map(|key| {
                let stale = stale.clone();
                session.cache().watch(key, move || {
                    stale.store(true, Ordering::SeqCst);
                })
            })
            .collect();
        Self {
            session: session.clone(),
            notices: Arc::new(Mutex::new(NoticeState::new())),
            status,
            tracker: MutationTracker::new(),
            stale,
            _subscription: subscription,
            _watches: watches,
        }
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    pub fn status(&self) -> ViewStatus {
        lock(&self.status).clone()
    }

    /// Feed entries, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notices).notifications().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        lock(&self.notices).unread_count()
    }

    /// Received requests still awaiting an answer.
    pub fn pending_requests(&self) -> Vec<ConnectionRequest> {
        lock(&self.notices)
            .pending_received()
            .into_iter()
            .cloned()
            .collect()
    }

    /// The pending request behind a connection-request notification,
    /// resolved by sender id. Display names are ambiguous; only the id
    /// is trusted.
    pub fn request_for(&self, notification: &Notification) -> Option<ConnectionRequest> {
        let sender = notification.sender.as_ref()?;
        lock(&self.notices).request_from_sender(&sender.id).cloned()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------
    // Fetches
    // -----------------------------------------------------------------

    /// Load the feed and the request book, from cache while fresh, and
    /// broadcast the unread count.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        *lock(&self.status) = ViewStatus::Loading;
        self.stale.store(false, Ordering::SeqCst);

        let notifications = match self.fetch_notifications().await {
            Ok(notifications) => notifications,
            Err(error) => {
                *lock(&self.status) = ViewStatus::Failed(error.user_message());
                return Err(error);
            }
        };
        let book = match self.fetch_requests().await {
            Ok(book) => book,
            Err(error) => {
                *lock(&self.status) = ViewStatus::Failed(error.user_message());
                return Err(error);
            }
        };

        let unread = {
            let mut notices = lock(&self.notices);
            notices.set_notifications(notifications);
            notices.set_requests(book.received, book.sent);
            notices.unread_count()
        };
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

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ApiError> {
        if let Some(cached) = self.session.cache().get(&QueryKey::Notifications) {
            if let Ok(notifications) = serde_json::from_value(cached) {
                return Ok(notifications);
            }
        }
        let notifications = self
            .session
            .guard_quiet(self.session.api().list_notifications().await)?;
        if let Ok(value) = serde_json::to_value(&notifications) {
            self.session.cache().put(QueryKey::Notifications, value);
        }
        Ok(notifications)
    }

    async fn fetch_requests(&self) -> Result<RequestBook, ApiError> {
        if let Some(cached) = self.session.cache().get(&QueryKey::ConnectionRequests) {
            if let Ok(book) = serde_json::from_value(cached) {
                return Ok(book);
            }
        }
        let book = self
            .session
            .guard_quiet(self.session.api().list_connection_requests().await)?;
        if let Ok(value) = serde_json::to_value(&book) {
            self.session.cache().put(QueryKey::ConnectionRequests, value);
        }
        Ok(book)
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Mark a notification read, optimistically. Already-read and
    /// unknown ids return `Ok(false)` without a network call.
    pub async fn mark_read(&self, id: &EntityId) -> Result<bool, ApiError> {
        let unread = {
            let mut notices = lock(&self.notices);
            if !notices.mark_read(id) {
                return Ok(false);
            }
            notices.unread_count()
        };
        self.session
            .bus()
            .publish(&AppEvent::NotificationsRefreshed { unread });

        self.tracker.begin(id.clone());
        match self
            .session
            .guard(self.session.api().mark_notification_read(id).await)
        {
            Ok(()) => {
                self.tracker.confirm(id);
                self.session.cache().invalidate(&QueryKey::Notifications);
                Ok(true)
            }
            Err(error) => {
                // The local flag stays set; dropping the cached feed
                // lets the next refresh restore server truth.
                self.tracker.roll_back(id);
                self.session.cache().invalidate(&QueryKey::Notifications);
                Err(error)
            }
        }
    }

    /// Accept or decline a connection request, optimistically. On
    /// failure the prior status is restored; the error toast carries
    /// the server's message, e.g. "Request already accepted".
    pub async fn respond(&self, request_id: &EntityId, accept: bool) -> Result<bool, ApiError> {
        let target = if accept {
            ConnectionStatus::Accepted
        } else {
            ConnectionStatus::Rejected
        };
        let prior = {
            let mut notices = lock(&self.notices);
            let Some(request) = notices.request(request_id) else {
                return Ok(false);
            };
            let prior = request.status.clone();
            notices.set_request_status(request_id, target);
            prior
        };

        self.tracker.begin(request_id.clone());
        match self.session.guard(
            self.session
                .api()
                .respond_connection_request(request_id, accept)
                .await,
        ) {
            Ok(()) => {
                self.tracker.confirm(request_id);
                self.session.toasts().success(if accept {
                    "Connection request accepted"
                } else {
                    "Connection request declined"
                });
                self.session.bus().publish(&AppEvent::ConnectionResponded {
                    request_id: request_id.clone(),
                    accepted: accept,
                });
                self.session.cache().invalidate(&QueryKey::ConnectionRequests);
                self.session.cache().invalidate(&QueryKey::Notifications);
                Ok(true)
            }
            Err(error) => {
                lock(&self.notices).set_request_status(request_id, prior);
                self.tracker.roll_back(request_id);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use chrono::Utc;
    use radar_shared::{NotificationKind, UserRef};

    fn offline_session() -> Session {
        Session::new(ClientConfig {
            api_base_url: "http://127.0.0.1:1".into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_mark_read_unknown_skips_network() {
        let session = offline_session();
        let view = NoticeView::new(&session);
        // The server is unreachable, so Ok(false) proves no call went out.
        assert!(!view.mark_read(&EntityId::from(99i64)).await.unwrap());
    }

    #[tokio::test]
    async fn test_respond_unknown_skips_network() {
        let session = offline_session();
        let view = NoticeView::new(&session);
        assert!(!view.respond(&EntityId::from(99i64), true).await.unwrap());
    }

    #[test]
    fn test_request_for_needs_a_sender() {
        let session = offline_session();
        let view = NoticeView::new(&session);
        let anonymous = Notification {
            id: EntityId::from(5i64),
            kind: NotificationKind::ConnectionRequest,
            title: String::new(),
            body: String::new(),
            read: false,
            created_at: Utc::now(),
            sender: None,
        };
        assert!(view.request_for(&anonymous).is_none());

        let signed = Notification {
            sender: Some(UserRef::from_id(EntityId::from(9i64))),
            ..anonymous
        };
        // Known sender but empty request book: still nothing to answer.
        assert!(view.request_for(&signed).is_none());
    }

    #[test]
    fn test_either_watched_key_marks_stale() {
        let session = offline_session();
        let view = NoticeView::new(&session);
        assert!(!view.is_stale());

        session.cache().invalidate(&QueryKey::Notifications);
        assert!(view.is_stale());

        view.stale.store(false, Ordering::SeqCst);
        session.cache().invalidate(&QueryKey::ConnectionRequests);
        assert!(view.is_stale());
    }
}
