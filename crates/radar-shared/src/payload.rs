//! Normalization of raw server payloads into canonical entities.
//!
//! The API is served by more than one backend generation and the same
//! logical response arrives in several shapes: a bare array, `{ data:
//! [...] }`, `{ data: { messages: [...] } }`, `{ messages: [...] }` or
//! an `items` wrapper. Field names drift too (`content` vs `text`,
//! `is_read` as a 0/1 integer, `sender` as an object or a raw id).
//! Everything in this module is total over that variety: unrecognized
//! envelopes fail with a typed error, malformed list elements are
//! skipped with a warning rather than poisoning the whole response.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{PayloadError, Result};
use crate::types::{
    ConnectionRequest, ConnectionStatus, Conversation, EntityId, Message, Notification,
    NotificationKind, UserRef,
};

const DEFAULT_PAGE_SIZE: u64 = 50;

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Locate the element array for a `kind` collection inside a response
/// body. Candidate envelopes are tried in a fixed order:
///
/// 1. the body itself is an array
/// 2. `data` is an array
/// 3. `data.<kind>` is an array
/// 4. `<kind>` is an array
/// 5. `data.items` or `items` is an array
pub fn collection<'a>(value: &'a Value, kind: &str) -> Result<&'a [Value]> {
    if let Some(items) = value.as_array() {
        return Ok(items);
    }
    if let Some(data) = value.get("data") {
        if let Some(items) = data.as_array() {
            return Ok(items);
        }
        if let Some(items) = data.get(kind).and_then(Value::as_array) {
            return Ok(items);
        }
    }
    if let Some(items) = value.get(kind).and_then(Value::as_array) {
        return Ok(items);
    }
    if let Some(items) = value
        .get("data")
        .and_then(|data| data.get("items"))
        .and_then(Value::as_array)
    {
        return Ok(items);
    }
    if let Some(items) = value.get("items").and_then(Value::as_array) {
        return Ok(items);
    }
    Err(PayloadError::UnrecognizedEnvelope(kind.to_string()))
}

fn decode_each<T, F>(raw: &[Value], kind: &str, decode: F) -> Vec<T>
where
    F: Fn(&Value) -> Result<T>,
{
    let mut out = Vec::with_capacity(raw.len());
    for (index, item) in raw.iter().enumerate() {
        match decode(item) {
            Ok(entity) => out.push(entity),
            Err(error) => warn!(kind, index, %error, "Skipping malformed element"),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// Extract an entity identifier, accepting strings and integers under
/// `id`, `_id` or any of the caller's extra keys.
pub fn entity_id(value: &Value, extra_keys: &[&str]) -> Result<EntityId> {
    for key in ["id", "_id"].iter().chain(extra_keys) {
        if let Some(id) = value.get(*key).and_then(scalar_id) {
            return Ok(id);
        }
    }
    Err(PayloadError::MissingId)
}

fn scalar_id(value: &Value) -> Option<EntityId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(EntityId::from(s.as_str())),
        Value::Number(n) => n
            .as_i64()
            .map(EntityId::from)
            .or_else(|| n.as_u64().map(EntityId::from)),
        _ => None,
    }
}

/// An id carried either as a scalar or as an embedded object.
fn embedded_id(value: &Value) -> Option<EntityId> {
    if value.is_object() {
        return entity_id(value, &[]).ok();
    }
    scalar_id(value)
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_str))
}

fn uint_field(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_u64))
}

/// Booleans arrive as JSON booleans or as SQL-ish 0/1 integers.
fn bool_field(value: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        match value.get(*key) {
            Some(Value::Bool(flag)) => return Some(*flag),
            Some(Value::Number(n)) => return Some(n.as_i64().unwrap_or(0) != 0),
            _ => {}
        }
    }
    None
}

fn timestamp_field(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    str_field(value, keys).and_then(parse_timestamp)
}

/// Parse the timestamp formats the backends actually emit: RFC 3339,
/// naive ISO 8601, and `str(datetime)` with a space separator. Naive
/// values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Entity decoders
// ---------------------------------------------------------------------------

/// Decode an embedded user reference.
pub fn user_ref(value: &Value) -> Result<UserRef> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject("user"));
    }
    let id = entity_id(value, &["user_id", "userId"])?;
    let full_name = str_field(value, &["full_name", "fullName", "name", "username"])
        .unwrap_or_default()
        .to_string();
    Ok(UserRef {
        id,
        full_name,
        headline: str_field(value, &["headline", "headLine"]).map(String::from),
        image: str_field(value, &["image", "profile_picture", "avatar"]).map(String::from),
        role: str_field(value, &["role"]).map(String::from),
    })
}

/// A user embedded either as an object under `object_key` or as a raw
/// id under one of `id_keys`.
fn embedded_user(value: &Value, object_key: &str, id_keys: &[&str]) -> Option<UserRef> {
    if let Some(embedded) = value.get(object_key) {
        if embedded.is_object() {
            return user_ref(embedded).ok();
        }
        if let Some(id) = scalar_id(embedded) {
            return Some(UserRef::from_id(id));
        }
    }
    id_keys
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(scalar_id)
        .map(UserRef::from_id)
}

/// Decode one message. The owning conversation is passed by the caller
/// because several endpoints omit it from the element itself.
pub fn message(value: &Value, conversation_id: &EntityId) -> Result<Message> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject("message"));
    }
    let id = entity_id(value, &["message_id", "messageId"])?;
    let conversation = ["conversation_id", "conversationId", "conversation"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(embedded_id)
        .unwrap_or_else(|| conversation_id.clone());

    let sender = match value.get("sender") {
        Some(embedded) if embedded.is_object() => user_ref(embedded)?,
        Some(scalar) => scalar_id(scalar)
            .map(UserRef::from_id)
            .ok_or(PayloadError::MissingField("sender"))?,
        None => ["sender_id", "senderId"]
            .iter()
            .find_map(|key| value.get(*key))
            .and_then(scalar_id)
            .map(UserRef::from_id)
            .ok_or(PayloadError::MissingField("sender"))?,
    };

    let body = str_field(value, &["body", "content", "text"])
        .ok_or(PayloadError::MissingField("body"))?
        .to_string();
    let created_at = timestamp_field(value, &["created_at", "createdAt", "timestamp", "sent_at"])
        .unwrap_or_else(Utc::now);

    Ok(Message {
        id,
        conversation_id: conversation,
        sender,
        body,
        created_at,
        pending: false,
    })
}

/// Decode one conversation summary.
pub fn conversation(value: &Value) -> Result<Conversation> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject("conversation"));
    }
    let id = entity_id(value, &["conversation_id", "conversationId"])?;
    let participants = ["participants", "members", "users"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(Value::as_array)
        .map(|raw| decode_each(raw, "participant", user_ref))
        .unwrap_or_default();

    let last_message = ["last_message", "lastMessage"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(|preview| match preview {
            Value::String(text) => Some(text.clone()),
            Value::Object(_) => str_field(preview, &["body", "content", "text"]).map(String::from),
            _ => None,
        });

    Ok(Conversation {
        id,
        participants,
        title: str_field(value, &["title", "name"]).map(String::from),
        is_group: bool_field(value, &["is_group", "isGroup"]).unwrap_or(false),
        last_message,
        last_activity: timestamp_field(
            value,
            &["last_message_at", "lastMessageAt", "last_activity", "updatedAt", "updated_at"],
        ),
    })
}

/// Decode one notification.
pub fn notification(value: &Value) -> Result<Notification> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject("notification"));
    }
    let id = entity_id(value, &["notification_id", "notificationId"])?;
    let kind = NotificationKind::from_tag(str_field(value, &["type", "kind"]).unwrap_or("unknown"));

    Ok(Notification {
        id,
        kind,
        title: str_field(value, &["title"]).unwrap_or_default().to_string(),
        body: str_field(value, &["body", "message", "text"])
            .unwrap_or_default()
            .to_string(),
        read: bool_field(value, &["read", "is_read", "isRead"]).unwrap_or(false),
        created_at: timestamp_field(value, &["created_at", "createdAt"]).unwrap_or_else(Utc::now),
        sender: embedded_user(value, "sender", &["sender_id", "senderId"]),
    })
}

/// Decode one connection request.
pub fn connection_request(value: &Value) -> Result<ConnectionRequest> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject("connection request"));
    }
    let id = entity_id(value, &["request_id", "requestId"])?;
    let status = str_field(value, &["status"])
        .map(ConnectionStatus::from_tag)
        .unwrap_or(ConnectionStatus::Pending);

    Ok(ConnectionRequest {
        id,
        sender: embedded_user(value, "sender", &["sender_id", "senderId"]),
        receiver: embedded_user(value, "receiver", &["receiver_id", "receiverId"]),
        status,
        created_at: timestamp_field(value, &["created_at", "createdAt"]),
    })
}

/// Decode the authenticated user from the session endpoint, which wraps
/// the object under `user` or `data` on some backends.
pub fn viewer(value: &Value) -> Result<UserRef> {
    for key in ["user", "data"] {
        if let Some(inner) = value.get(key) {
            if inner.is_object() {
                return user_ref(inner);
            }
        }
    }
    user_ref(value)
}

/// Decode the confirmed message from a send response. The entity hides
/// under `newMessage`, `message` or `data` depending on the backend;
/// `message` is only taken when it is an object, since it usually holds
/// a human-readable status string.
pub fn sent_message(value: &Value, conversation_id: &EntityId) -> Result<Message> {
    for key in ["newMessage", "new_message", "message", "data"] {
        if let Some(inner) = value.get(key) {
            if inner.is_object() {
                return message(inner, conversation_id);
            }
        }
    }
    message(value, conversation_id)
}

// ---------------------------------------------------------------------------
// Collections and pages
// ---------------------------------------------------------------------------

pub fn conversations(value: &Value) -> Result<Vec<Conversation>> {
    let raw = collection(value, "conversations")?;
    Ok(decode_each(raw, "conversation", conversation))
}

pub fn messages(value: &Value, conversation_id: &EntityId) -> Result<Vec<Message>> {
    let raw = collection(value, "messages")?;
    Ok(decode_each(raw, "message", |item| message(item, conversation_id)))
}

pub fn notifications(value: &Value) -> Result<Vec<Notification>> {
    let raw = collection(value, "notifications")?;
    Ok(decode_each(raw, "notification", notification))
}

/// Decode one side of the request book; `kind` is `received` or `sent`.
pub fn connection_requests(value: &Value, kind: &str) -> Result<Vec<ConnectionRequest>> {
    let raw = collection(value, kind)?;
    Ok(decode_each(raw, kind, connection_request))
}

/// One page of a paginated collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
}

/// Decode a paginated message response. Missing counters degrade
/// gracefully: `total` falls back to the element count, `page` to 1,
/// and `total_pages` is derived from `total` and the page size, with a
/// floor of one page.
pub fn message_page(value: &Value, conversation_id: &EntityId) -> Result<Page<Message>> {
    let items = messages(value, conversation_id)?;
    let total = uint_field(value, &["total", "totalCount", "count"]).unwrap_or(items.len() as u64);
    let page = uint_field(value, &["page", "currentPage"]).unwrap_or(1) as u32;
    let total_pages = match uint_field(value, &["total_pages", "totalPages", "pages"]) {
        Some(explicit) => explicit.max(1) as u32,
        None => {
            let limit = uint_field(value, &["limit", "per_page", "perPage", "pageSize"])
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .max(1);
            (total.div_ceil(limit)).max(1) as u32
        }
    };
    Ok(Page {
        items,
        total,
        page,
        total_pages,
    })
}
