//! Cross-component event bus.
//!
//! Views never call each other; they publish [`AppEvent`]s on a shared
//! [`EventBus`] and react to what they observe. Dispatch is synchronous
//! and in subscription order, with no bus lock held while handlers run,
//! so a handler may publish follow-up events or subscribe.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use radar_shared::EntityId;

use crate::toast::ToastLevel;

/// Tabs of the profile page. Mirrors the URL hash the web client used
/// for deep links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileTab {
    #[default]
    Profile,
    Security,
    Notifications,
}

impl ProfileTab {
    /// Resolve a `#security` style location hash.
    pub fn from_hash(hash: &str) -> Option<Self> {
        match hash.trim_start_matches('#') {
            "profile" => Some(Self::Profile),
            "security" => Some(Self::Security),
            "notifications" => Some(Self::Notifications),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Security => "security",
            Self::Notifications => "notifications",
        }
    }
}

/// Everything that can happen on the bus. A closed set: components
/// match on variants instead of comparing event name strings.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A tab switch was requested somewhere in the profile UI.
    TabChanged { tab: ProfileTab },
    /// An optimistic send was confirmed by the server.
    MessageSent {
        conversation_id: EntityId,
        message_id: EntityId,
    },
    /// An optimistic send failed and was rolled back.
    MessageSendFailed { conversation_id: EntityId },
    MessageDeleted {
        conversation_id: EntityId,
        message_id: EntityId,
    },
    /// The notification feed changed; `unread` is the current count.
    NotificationsRefreshed { unread: usize },
    ConnectionResponded {
        request_id: EntityId,
        accepted: bool,
    },
    /// The server rejected our token. Published once per expiry.
    SessionExpired,
    ToastRaised { level: ToastLevel, text: String },
}

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    handlers: Vec<(u64, Handler)>,
    next_id: u64,
}

/// Shared bus handle. Clones share the subscriber list.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for every event. Dropping the returned
    /// [`Subscription`] unsubscribes it.
    pub fn subscribe(&self, handler: impl Fn(&AppEvent) + Send + Sync + 'static) -> Subscription {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push((id, Arc::new(handler)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every current subscriber, synchronously and
    /// in subscription order. Handlers subscribed while this call runs
    /// see only later events.
    pub fn publish(&self, event: &AppEvent) {
        let handlers: Vec<Handler> = {
            let inner = self.lock();
            inner
                .handlers
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect()
        };
        debug!(?event, subscribers = handlers.len(), "Event published");
        for handler in &handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().handlers.len()
    }
}

/// Live subscription. Dropping it removes the handler from the bus; a
/// subscription outliving its bus is harmless.
pub struct Subscription {
    id: u64,
    inner: Weak<Mutex<BusInner>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.handlers.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let _a = {
            let order = order.clone();
            bus.subscribe(move |_| order.lock().unwrap().push("a"))
        };
        let _b = {
            let order = order.clone();
            bus.subscribe(move |_| order.lock().unwrap().push("b"))
        };

        bus.publish(&AppEvent::SessionExpired);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_dropped_subscription_stops_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let subscription = {
            let hits = hits.clone();
            bus.subscribe(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        bus.publish(&AppEvent::SessionExpired);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 1);

        drop(subscription);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(&AppEvent::SessionExpired);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_publish_followup() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _relay = {
            let bus = bus.clone();
            bus.clone().subscribe(move |event| {
                if matches!(event, AppEvent::SessionExpired) {
                    bus.publish(&AppEvent::NotificationsRefreshed { unread: 0 });
                }
            })
        };
        let _sink = {
            let seen = seen.clone();
            bus.subscribe(move |event| seen.lock().unwrap().push(event.clone()))
        };

        bus.publish(&AppEvent::SessionExpired);
        let seen = seen.lock().unwrap();
        assert!(seen.contains(&AppEvent::SessionExpired));
        assert!(seen.contains(&AppEvent::NotificationsRefreshed { unread: 0 }));
    }

    #[test]
    fn test_events_carry_typed_payloads() {
        let event = AppEvent::MessageSent {
            conversation_id: EntityId::from(12i64),
            message_id: EntityId::from("m123"),
        };
        match event {
            AppEvent::MessageSent { conversation_id, .. } => {
                assert_eq!(conversation_id, EntityId::from(12i64));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_profile_tab_hash_round_trip() {
        assert_eq!(ProfileTab::from_hash("#security"), Some(ProfileTab::Security));
        assert_eq!(ProfileTab::from_hash("profile"), Some(ProfileTab::Profile));
        assert_eq!(ProfileTab::from_hash("#billing"), None);
        assert_eq!(ProfileTab::Notifications.as_str(), "notifications");
    }
}
