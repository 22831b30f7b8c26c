//! Transient user-facing notices.
//!
//! Mutation failures surface here as short messages a UI can render as
//! toasts. The queue is bounded; embedders that never drain it lose the
//! oldest entries, not memory.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::events::{AppEvent, EventBus};

const QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// One queued notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
    pub raised_at: DateTime<Utc>,
}

/// Bounded toast queue. Cloning shares the queue; every push also goes
/// out on the bus as [`AppEvent::ToastRaised`].
#[derive(Clone)]
pub struct Toasts {
    queue: Arc<Mutex<VecDeque<Toast>>>,
    bus: EventBus,
}

impl Toasts {
    pub fn new(bus: EventBus) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            bus,
        }
    }

    pub fn push(&self, level: ToastLevel, text: impl Into<String>) {
        let text = text.into();
        debug!(?level, text = %text, "Toast raised");
        {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            if queue.len() == QUEUE_CAP {
                queue.pop_front();
            }
            queue.push_back(Toast {
                level,
                text: text.clone(),
                raised_at: Utc::now(),
            });
        }
        self.bus.publish(&AppEvent::ToastRaised { level, text });
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(ToastLevel::Info, text);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(ToastLevel::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(ToastLevel::Error, text);
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain_in_order() {
        let toasts = Toasts::new(EventBus::new());
        toasts.error("first");
        toasts.success("second");

        let drained = toasts.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].text, "first");
        assert_eq!(drained[0].level, ToastLevel::Error);
        assert_eq!(drained[1].level, ToastLevel::Success);
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_queue_is_bounded() {
        let toasts = Toasts::new(EventBus::new());
        for i in 0..20 {
            toasts.info(format!("notice {i}"));
        }
        let drained = toasts.drain();
        assert_eq!(drained.len(), QUEUE_CAP);
        // Oldest entries were dropped.
        assert_eq!(drained[0].text, "notice 4");
    }

    #[test]
    fn test_push_publishes_toast_raised() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = seen.clone();
            bus.subscribe(move |event| {
                if let AppEvent::ToastRaised { text, .. } = event {
                    seen.lock().unwrap().push(text.clone());
                }
            })
        };

        let toasts = Toasts::new(bus);
        toasts.error("send failed");
        assert_eq!(*seen.lock().unwrap(), vec!["send failed"]);
    }
}
