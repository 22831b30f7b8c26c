//! The messages page: conversation list, open thread, send and delete.
//!
//! Sends are optimistic. The message appears in the thread immediately
//! with a local placeholder id and `pending` set; confirmation swaps it
//! in place for the server entity, failure removes it and puts the
//! draft back so nothing typed is lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use radar_api::{ApiError, PageQuery};
use radar_shared::{Conversation, EntityId, Message, UserRef};
use radar_store::{InboxState, QueryKey, WatchHandle};

use crate::events::{AppEvent, Subscription};
use crate::mutation::MutationTracker;
use crate::session::Session;
use crate::views::{lock, ViewStatus};

const UNKNOWN_USER: &str = "Unknown user";

pub struct InboxView {
    session: Session,
    inbox: Arc<Mutex<InboxState>>,
    status: Arc<Mutex<ViewStatus>>,
    active: Arc<Mutex<Option<EntityId>>>,
    draft: Arc<Mutex<String>>,
    tracker: MutationTracker,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
    _watch: WatchHandle,
}

impl InboxView {
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
        let watch = {
            let stale = stale.clone();
            session.cache().watch(QueryKey::Conversations, move || {
                stale.store(true, Ordering::SeqCst);
            })
        };
        Self {
            session: session.clone(),
            inbox: Arc::new(Mutex::new(InboxState::new())),
            status,
            active: Arc::new(Mutex::new(None)),
            draft: Arc::new(Mutex::new(String::new())),
            tracker: MutationTracker::new(),
            stale,
            _subscription: subscription,
            _watch: watch,
        }
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    pub fn status(&self) -> ViewStatus {
        lock(&self.status).clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        lock(&self.inbox).conversations().to_vec()
    }

    pub fn active_conversation(&self) -> Option<EntityId> {
        lock(&self.active).clone()
    }

    /// Messages of the open conversation, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        let Some(id) = lock(&self.active).clone() else {
            return Vec::new();
        };
        lock(&self.inbox).messages(&id).to_vec()
    }

    pub fn draft(&self) -> String {
        lock(&self.draft).clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        *lock(&self.draft) = text.into();
    }

    /// Sends still awaiting the server.
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Name to show for a conversation: its title when set, otherwise
    /// the counterpart's name, otherwise a placeholder.
    pub fn counterpart_name(&self, conversation_id: &EntityId) -> String {
        let viewer = self.session.viewer().map(|user| user.id);
        let inbox = lock(&self.inbox);
        let Some(conversation) = inbox.conversation(conversation_id) else {
            return UNKNOWN_USER.to_string();
        };
        if let Some(title) = conversation.title.as_deref() {
            if !title.is_empty() {
                return title.to_string();
            }
        }
        let counterpart = match &viewer {
            Some(viewer) => conversation.counterpart(viewer),
            None => conversation.participants.first(),
        };
        match counterpart {
            Some(user) if !user.full_name.is_empty() => user.full_name.clone(),
            _ => UNKNOWN_USER.to_string(),
        }
    }

    // -----------------------------------------------------------------
    // Fetches
    // -----------------------------------------------------------------

    /// Load the conversation list, from cache while fresh.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        *lock(&self.status) = ViewStatus::Loading;
        self.stale.store(false, Ordering::SeqCst);

        if let Some(cached) = self.session.cache().get(&QueryKey::Conversations) {
            if let Ok(conversations) = serde_json::from_value::<Vec<Conversation>>(cached) {
                lock(&self.inbox).set_conversations(conversations);
                *lock(&self.status) = ViewStatus::Ready;
                return Ok(());
            }
        }

        match self
            .session
            .guard_quiet(self.session.api().list_conversations().await)
        {
            Ok(conversations) => {
                if let Ok(value) = serde_json::to_value(&conversations) {
                    self.session.cache().put(QueryKey::Conversations, value);
                }
                lock(&self.inbox).set_conversations(conversations);
                *lock(&self.status) = ViewStatus::Ready;
                Ok(())
            }
            Err(error) => {
                *lock(&self.status) = ViewStatus::Failed(error.user_message());
                Err(error)
            }
        }
    }

    /// Refetch the conversation list if an invalidation marked it
    /// stale since the last refresh.
    pub async fn refresh_if_stale(&self) -> Result<(), ApiError> {
        if self.stale.swap(false, Ordering::SeqCst) {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Open a thread and load its first page of messages. Always goes
    /// to the network; a thread with sends in flight must never be
    /// overwritten from a cache snapshot.
    pub async fn open_conversation(&self, conversation_id: EntityId) -> Result<(), ApiError> {
        *lock(&self.active) = Some(conversation_id.clone());
        *lock(&self.status) = ViewStatus::Loading;

        match self.session.guard_quiet(
            self.session
                .api()
                .list_messages(&conversation_id, PageQuery::default())
                .await,
        ) {
            Ok(page) => {
                debug!(conversation = %conversation_id, count = page.items.len(), total = page.total, "Conversation opened");
                lock(&self.inbox).set_messages(conversation_id, page.items);
                *lock(&self.status) = ViewStatus::Ready;
                Ok(())
            }
            Err(error) => {
                *lock(&self.status) = ViewStatus::Failed(error.user_message());
                Err(error)
            }
        }
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Send the current draft to the open conversation.
    ///
    /// Returns the server id of the confirmed message, or `Ok(None)`
    /// when there was nothing to send (no open conversation, or a
    /// whitespace-only draft). On failure the optimistic message is
    /// removed and the draft restored; the error toast comes from the
    /// session guard.
    pub async fn send_message(&self) -> Result<Option<EntityId>, ApiError> {
        let Some(conversation_id) = lock(&self.active).clone() else {
            return Ok(None);
        };
        let body = lock(&self.draft).trim().to_string();
        if body.is_empty() {
            return Ok(None);
        }

        let sender = self
            .session
            .viewer()
            .unwrap_or_else(|| UserRef::from_id(EntityId::local()));
        let local = Message {
            id: EntityId::local(),
            conversation_id: conversation_id.clone(),
            sender,
            body: body.clone(),
            created_at: Utc::now(),
            pending: true,
        };
        let local_id = local.id.clone();

        {
            let mut inbox = lock(&self.inbox);
            inbox.insert_pending(local);
            inbox.touch_conversation(&conversation_id, &body, Utc::now());
        }
        lock(&self.draft).clear();
        self.tracker.begin(local_id.clone());

        let outcome = self
            .session
            .guard(self.session.api().send_message(&conversation_id, &body).await);

        match outcome {
            Ok(confirmed) => {
                let confirmed_id = confirmed.id.clone();
                lock(&self.inbox).confirm_pending(&conversation_id, &local_id, confirmed);
                self.tracker.confirm(&local_id);
                self.session.bus().publish(&AppEvent::MessageSent {
                    conversation_id: conversation_id.clone(),
                    message_id: confirmed_id.clone(),
                });
                self.session.cache().invalidate(&QueryKey::Conversations);
                Ok(Some(confirmed_id))
            }
            Err(error) => {
                lock(&self.inbox).remove_message(&conversation_id, &local_id);
                {
                    // Only restore if the user has not typed anew.
                    let mut draft = lock(&self.draft);
                    if draft.is_empty() {
                        *draft = body;
                    }
                }
                self.tracker.roll_back(&local_id);
                self.session.bus().publish(&AppEvent::MessageSendFailed {
                    conversation_id: conversation_id.clone(),
                });
                self.session.cache().invalidate(&QueryKey::Conversations);
                Err(error)
            }
        }
    }

    /// Delete a message from the open conversation, optimistically.
    ///
    /// Returns `Ok(false)` for unknown ids and for messages still
    /// pending confirmation; the latter have no server id to delete.
    pub async fn delete_message(&self, message_id: &EntityId) -> Result<bool, ApiError> {
        let Some(conversation_id) = lock(&self.active).clone() else {
            return Ok(false);
        };

        let snapshot = {
            let mut inbox = lock(&self.inbox);
            match inbox.message(&conversation_id, message_id) {
                None => return Ok(false),
                Some(message) if message.pending => {
                    debug!(message = %message_id, "Refusing to delete unconfirmed message");
                    return Ok(false);
                }
                Some(_) => {}
            }
            inbox.remove_message(&conversation_id, message_id)
        };
        let Some((index, removed)) = snapshot else {
            return Ok(false);
        };

        self.tracker.begin(message_id.clone());
        match self
            .session
            .guard(self.session.api().delete_message(message_id).await)
        {
            Ok(()) => {
                self.tracker.confirm(message_id);
                self.session.bus().publish(&AppEvent::MessageDeleted {
                    conversation_id: conversation_id.clone(),
                    message_id: message_id.clone(),
                });
                self.session
                    .cache()
                    .invalidate(&QueryKey::Messages(conversation_id));
                Ok(true)
            }
            Err(error) => {
                lock(&self.inbox).restore_message(&conversation_id, index, removed);
                self.tracker.roll_back(message_id);
                Err(error)
            }
        }
    }
}
