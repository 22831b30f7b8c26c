//! Profile page tab selection, kept in sync across components.
//!
//! The sidebar and the page body are separate views with no reference
//! to each other; a tab click publishes [`AppEvent::TabChanged`] and
//! every mounted profile view follows.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::events::{AppEvent, ProfileTab, Subscription};
use crate::session::Session;
use crate::views::lock;

pub struct ProfileView {
    session: Session,
    active: Arc<Mutex<ProfileTab>>,
    _subscription: Subscription,
}

impl ProfileView {
    pub fn new(session: &Session) -> Self {
        let active = Arc::new(Mutex::new(ProfileTab::default()));
        let subscription = {
            let active = active.clone();
            session.bus().subscribe(move |event| {
                if let AppEvent::TabChanged { tab } = event {
                    *lock(&active) = *tab;
                }
            })
        };
        Self {
            session: session.clone(),
            active,
            _subscription: subscription,
        }
    }

    pub fn active_tab(&self) -> ProfileTab {
        *lock(&self.active)
    }

    /// Request a tab switch. The change lands through the bus, so this
    /// view and every sibling update together.
    pub fn select_tab(&self, tab: ProfileTab) {
        debug!(tab = tab.as_str(), "Tab selected");
        self.session.bus().publish(&AppEvent::TabChanged { tab });
    }

    /// Apply a `#security` style deep-link hash. Unknown hashes leave
    /// the current tab alone.
    pub fn select_from_hash(&self, hash: &str) -> bool {
        match ProfileTab::from_hash(hash) {
            Some(tab) => {
                self.select_tab(tab);
                true
            }
            None => false,
        }
    }
}
