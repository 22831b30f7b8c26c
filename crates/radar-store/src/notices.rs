//! Notification feed and connection request state.
//!
//! The read flag only moves one way here: no operation flips a
//! notification back to unread. If an optimistic mark-read turns out
//! wrong, the next full [`NoticeState::set_notifications`] brings back
//! server truth.

use tracing::debug;

use radar_shared::{ConnectionRequest, ConnectionStatus, EntityId, Notification};

/// In-memory notification feed plus the viewer's request book.
#[derive(Debug, Default)]
pub struct NoticeState {
    notifications: Vec<Notification>,
    received: Vec<ConnectionRequest>,
    sent: Vec<ConnectionRequest>,
}

impl NoticeState {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------

    /// Replace the feed wholesale, newest first.
    pub fn set_notifications(&mut self, mut notifications: Vec<Notification>) {
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!(count = notifications.len(), "Notification feed replaced");
        self.notifications = notifications;
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn notification(&self, id: &EntityId) -> Option<&Notification> {
        self.notifications.iter().find(|n| &n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    /// Mark one notification read. Returns false if it is unknown or
    /// already read, so callers can skip the network round trip.
    pub fn mark_read(&mut self, id: &EntityId) -> bool {
        let Some(notification) = self.notifications.iter_mut().find(|n| &n.id == id) else {
            debug!(notification = %id, "Cannot mark unknown notification");
            return false;
        };
        if notification.read {
            return false;
        }
        notification.read = true;
        debug!(notification = %id, "Notification marked read");
        true
    }

    // -----------------------------------------------------------------
    // Connection requests
    // -----------------------------------------------------------------

    /// Replace both sides of the request book.
    pub fn set_requests(
        &mut self,
        received: Vec<ConnectionRequest>,
        sent: Vec<ConnectionRequest>,
    ) {
        debug!(received = received.len(), sent = sent.len(), "Request book replaced");
        self.received = received;
        self.sent = sent;
    }

    pub fn received(&self) -> &[ConnectionRequest] {
        &self.received
    }

    pub fn sent(&self) -> &[ConnectionRequest] {
        &self.sent
    }

    pub fn request(&self, id: &EntityId) -> Option<&ConnectionRequest> {
        self.received
            .iter()
            .chain(self.sent.iter())
            .find(|r| &r.id == id)
    }

    /// Received requests still awaiting an answer.
    pub fn pending_received(&self) -> Vec<&ConnectionRequest> {
        self.received
            .iter()
            .filter(|r| r.status == ConnectionStatus::Pending)
            .collect()
    }

    /// Set the status of a request on either side. Returns false if the
    /// request is unknown.
    pub fn set_request_status(&mut self, id: &EntityId, status: ConnectionStatus) -> bool {
        let Some(request) = self
            .received
            .iter_mut()
            .chain(self.sent.iter_mut())
            .find(|r| &r.id == id)
        else {
            debug!(request = %id, "Cannot update unknown request");
            return false;
        };
        debug!(request = %id, status = %status, "Request status updated");
        request.status = status;
        true
    }

    /// Find the pending received request sent by a given user. Matching
    /// is by sender id only; display names are not unique.
    pub fn request_from_sender(&self, sender: &EntityId) -> Option<&ConnectionRequest> {
        self.received.iter().find(|r| {
            r.status == ConnectionStatus::Pending
                && r.sender.as_ref().is_some_and(|user| &user.id == sender)
        })
    }
}
