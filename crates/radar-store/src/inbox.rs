//! Conversation and message state for the inbox.
//!
//! Mutators report what actually changed so callers can decide whether
//! to notify anyone. Optimistic inserts, confirmation swaps and
//! rollback restores all preserve list positions: a message being
//! confirmed must not jump around the thread.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use radar_shared::{Conversation, EntityId, Message};

/// In-memory inbox: conversation summaries plus the loaded messages of
/// each opened thread.
#[derive(Debug, Default)]
pub struct InboxState {
    conversations: Vec<Conversation>,
    messages: HashMap<EntityId, Vec<Message>>,
}

impl InboxState {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Conversations
    // -----------------------------------------------------------------

    /// Replace the conversation list. Sorted most recent activity
    /// first; conversations with no activity sink to the end.
    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        self.sort_conversations();
        debug!(count = self.conversations.len(), "Conversation list replaced");
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn conversation(&self, id: &EntityId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Update a conversation's preview after a send and re-sort.
    /// Returns false if the conversation is unknown.
    pub fn touch_conversation(
        &mut self,
        conversation_id: &EntityId,
        preview: &str,
        at: DateTime<Utc>,
    ) -> bool {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| &c.id == conversation_id)
        else {
            return false;
        };
        conversation.last_message = Some(preview.to_string());
        conversation.last_activity = Some(at);
        self.sort_conversations();
        true
    }

    fn sort_conversations(&mut self) {
        // Descending over Option<DateTime>: None is the minimum, so it
        // lands at the tail.
        self.conversations
            .sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    }

    // -----------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------

    /// Replace a conversation's loaded messages, ordered oldest first
    /// for display regardless of how the server pages them.
    pub fn set_messages(&mut self, conversation_id: EntityId, mut messages: Vec<Message>) {
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        debug!(conversation = %conversation_id, count = messages.len(), "Messages replaced");
        self.messages.insert(conversation_id, messages);
    }

    pub fn messages(&self, conversation_id: &EntityId) -> &[Message] {
        self.messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn message(&self, conversation_id: &EntityId, message_id: &EntityId) -> Option<&Message> {
        self.messages(conversation_id)
            .iter()
            .find(|m| &m.id == message_id)
    }

    /// Append an optimistic message to its conversation. Returns false
    /// without touching anything if the id is already present; a thread
    /// holds at most one entry per message id.
    pub fn insert_pending(&mut self, message: Message) -> bool {
        let thread = self.messages.entry(message.conversation_id.clone()).or_default();
        if thread.iter().any(|m| m.id == message.id) {
            debug!(message = %message.id, "Duplicate insert ignored");
            return false;
        }
        debug!(conversation = %message.conversation_id, message = %message.id, "Pending message inserted");
        thread.push(message);
        true
    }

    /// Swap a pending message for its server-confirmed form, in place,
    /// keeping its position in the thread. Returns false if the local
    /// id is no longer there.
    pub fn confirm_pending(
        &mut self,
        conversation_id: &EntityId,
        local_id: &EntityId,
        confirmed: Message,
    ) -> bool {
        let Some(thread) = self.messages.get_mut(conversation_id) else {
            return false;
        };
        let Some(slot) = thread.iter_mut().find(|m| &m.id == local_id) else {
            debug!(local = %local_id, "No pending message to confirm");
            return false;
        };
        debug!(conversation = %conversation_id, local = %local_id, server = %confirmed.id, "Pending message confirmed");
        *slot = Message {
            pending: false,
            ..confirmed
        };
        true
    }

    /// Remove a message, reporting its index so a failed delete can put
    /// it back where it was.
    pub fn remove_message(
        &mut self,
        conversation_id: &EntityId,
        message_id: &EntityId,
    ) -> Option<(usize, Message)> {
        let thread = self.messages.get_mut(conversation_id)?;
        let index = thread.iter().position(|m| &m.id == message_id)?;
        let removed = thread.remove(index);
        debug!(conversation = %conversation_id, message = %message_id, index, "Message removed");
        Some((index, removed))
    }

    /// Reinsert a message at its original index, clamped to the current
    /// thread length in case neighbours changed meanwhile.
    pub fn restore_message(&mut self, conversation_id: &EntityId, index: usize, message: Message) {
        let thread = self.messages.entry(conversation_id.clone()).or_default();
        let slot = index.min(thread.len());
        debug!(conversation = %conversation_id, message = %message.id, slot, "Message restored");
        thread.insert(slot, message);
    }

    /// Count of pending messages across all loaded threads.
    pub fn pending_count(&self) -> usize {
        self.messages
            .values()
            .flat_map(|thread| thread.iter())
            .filter(|m| m.pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use radar_shared::UserRef;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 2, 9, minute, 0).unwrap()
    }

    fn conversation(id: i64, activity: Option<DateTime<Utc>>) -> Conversation {
        Conversation {
            id: EntityId::from(id),
            participants: Vec::new(),
            title: None,
            is_group: false,
            last_message: None,
            last_activity: activity,
        }
    }

    fn message(id: &str, conversation: i64, minute: u32) -> Message {
        Message {
            id: EntityId::from(id),
            conversation_id: EntityId::from(conversation),
            sender: UserRef::from_id(EntityId::from(7i64)),
            body: format!("body of {id}"),
            created_at: at(minute),
            pending: false,
        }
    }

    fn pending(id: &str, conversation: i64, minute: u32) -> Message {
        Message {
            pending: true,
            ..message(id, conversation, minute)
        }
    }

    #[test]
    fn test_conversations_sort_recent_first_none_last() {
        let mut inbox = InboxState::new();
        inbox.set_conversations(vec![
            conversation(1, None),
            conversation(2, Some(at(10))),
            conversation(3, Some(at(20))),
        ]);
        let order: Vec<_> = inbox.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, ["3", "2", "1"]);
    }

    #[test]
    fn test_touch_conversation_resorts_and_updates_preview() {
        let mut inbox = InboxState::new();
        inbox.set_conversations(vec![
            conversation(1, Some(at(10))),
            conversation(2, Some(at(20))),
        ]);
        assert!(inbox.touch_conversation(&EntityId::from(1i64), "fresh reply", at(30)));
        let first = &inbox.conversations()[0];
        assert_eq!(first.id, EntityId::from(1i64));
        assert_eq!(first.last_message.as_deref(), Some("fresh reply"));
        assert!(!inbox.touch_conversation(&EntityId::from(99i64), "x", at(31)));
    }

    #[test]
    fn test_set_messages_orders_oldest_first() {
        let mut inbox = InboxState::new();
        let conv = EntityId::from(12i64);
        // Server pages arrive newest first.
        inbox.set_messages(conv.clone(), vec![message("b", 12, 16), message("a", 12, 15)]);
        let order: Vec<_> = inbox.messages(&conv).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_insert_pending_rejects_duplicate_id() {
        let mut inbox = InboxState::new();
        let first = pending("local-1", 12, 16);
        assert!(inbox.insert_pending(first.clone()));
        assert!(!inbox.insert_pending(first));
        assert_eq!(inbox.messages(&EntityId::from(12i64)).len(), 1);
        assert_eq!(inbox.pending_count(), 1);
    }

    #[test]
    fn test_confirm_pending_swaps_in_place() {
        let mut inbox = InboxState::new();
        let conv = EntityId::from(12i64);
        inbox.set_messages(conv.clone(), vec![message("m1", 12, 15)]);
        inbox.insert_pending(pending("local-1", 12, 16));

        // A confirmed entity comes out non-pending even if the input
        // claims otherwise.
        let confirmed = Message {
            pending: true,
            ..message("m123", 12, 16)
        };
        assert!(inbox.confirm_pending(&conv, &EntityId::from("local-1"), confirmed));

        let thread = inbox.messages(&conv);
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[1].id, EntityId::from("m123"));
        assert!(!thread[1].pending);
        assert_eq!(inbox.pending_count(), 0);

        // The local id is gone, so a second confirm is a no-op.
        assert!(!inbox.confirm_pending(&conv, &EntityId::from("local-1"), message("m124", 12, 17)));
    }

    #[test]
    fn test_remove_and_restore_keep_position() {
        let mut inbox = InboxState::new();
        let conv = EntityId::from(12i64);
        inbox.set_messages(
            conv.clone(),
            vec![message("a", 12, 15), message("b", 12, 16), message("c", 12, 17)],
        );

        let (index, removed) = inbox.remove_message(&conv, &EntityId::from("b")).unwrap();
        assert_eq!(index, 1);
        let order: Vec<_> = inbox.messages(&conv).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, ["a", "c"]);

        inbox.restore_message(&conv, index, removed);
        let order: Vec<_> = inbox.messages(&conv).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_restore_clamps_index() {
        let mut inbox = InboxState::new();
        let conv = EntityId::from(12i64);
        inbox.set_messages(conv.clone(), vec![message("a", 12, 15)]);
        // Index beyond the end appends instead of panicking.
        inbox.restore_message(&conv, 10, message("z", 12, 16));
        let order: Vec<_> = inbox.messages(&conv).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, ["a", "z"]);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut inbox = InboxState::new();
        assert!(inbox
            .remove_message(&EntityId::from(12i64), &EntityId::from("nope"))
            .is_none());
    }
}
