//! Background notification polling.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::Session;
use crate::views::NavbarView;

/// Handle to the poll task. Dropping it stops the poll.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a periodic refresh of the navbar's notification feed. The
/// first tick fires immediately; failures are logged and the poll
/// keeps going. Session expiry surfaces through the bus as usual.
pub fn spawn_notification_poll(session: &Session, view: Arc<NavbarView>) -> PollHandle {
    let every = Duration::from_secs(session.config().notification_poll_secs.max(1));
    debug!(every_secs = every.as_secs(), "Notification poll started");
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(error) = view.refresh().await {
                debug!(%error, "Notification poll refresh failed");
            }
        }
    });
    PollHandle { task }
}
