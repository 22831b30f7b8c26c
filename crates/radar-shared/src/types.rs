//! Canonical entities shared by every crate in the workspace.
//!
//! Servers identify the same record as `id`, `_id`, a string or a bare
//! integer depending on which backend answered. Everything here stores
//! identifiers as [`EntityId`] and timestamps as UTC so the rest of the
//! client never has to care.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Canonical identifier for any server-side entity.
///
/// Compares and hashes as a plain string. Integer identifiers from the
/// wire are canonicalized to their decimal form, so `7` and `"7"` name
/// the same entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

const LOCAL_PREFIX: &str = "local-";

impl EntityId {
    /// Mint a placeholder id for an entity that only exists locally,
    /// such as an optimistic message awaiting server confirmation.
    pub fn local() -> Self {
        Self(format!("{LOCAL_PREFIX}{}", Uuid::new_v4()))
    }

    /// True for ids minted by [`EntityId::local`]. Local ids must never
    /// be sent to the server.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = EntityId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string or integer identifier")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<EntityId, E> {
                Ok(EntityId(v.to_string()))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<EntityId, E> {
                Ok(EntityId(v.to_string()))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<EntityId, E> {
                Ok(EntityId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

// ---------------------------------------------------------------------------
// Users and conversations
// ---------------------------------------------------------------------------

/// Minimal projection of a user as embedded in other entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: EntityId,
    #[serde(default)]
    pub full_name: String,
    pub headline: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
}

impl UserRef {
    /// A reference known only by id, as when the server returns a raw
    /// foreign key instead of an embedded user object.
    pub fn from_id(id: EntityId) -> Self {
        Self {
            id,
            full_name: String::new(),
            headline: None,
            image: None,
            role: None,
        }
    }
}

/// A message thread between the viewer and one or more other users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: EntityId,
    #[serde(default)]
    pub participants: Vec<UserRef>,
    pub title: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    /// Preview text of the most recent message, if any.
    pub last_message: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Conversation {
    /// The first participant who is not the viewer. Some backends
    /// already exclude the viewer from `participants`; in that case any
    /// participant qualifies.
    pub fn counterpart(&self, viewer: &EntityId) -> Option<&UserRef> {
        self.participants.iter().find(|user| &user.id != viewer)
    }
}

/// A single message inside a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: EntityId,
    pub conversation_id: EntityId,
    pub sender: UserRef,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// True while a locally inserted message awaits server confirmation.
    /// Never serialized; confirmation state is client-side only.
    #[serde(default, skip_serializing)]
    pub pending: bool,
}

// ---------------------------------------------------------------------------
// Notifications and connections
// ---------------------------------------------------------------------------

/// Well-known notification categories, with a passthrough for tags this
/// client version does not recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    ConnectionRequest,
    ConnectionAccepted,
    JobApplication,
    ApplicationStatus,
    JobPosted,
    Other(String),
}

impl NotificationKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "connection_request" => Self::ConnectionRequest,
            "connection_accepted" => Self::ConnectionAccepted,
            "job_application" => Self::JobApplication,
            "application_status" => Self::ApplicationStatus,
            "job_posted" => Self::JobPosted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::ConnectionRequest => "connection_request",
            Self::ConnectionAccepted => "connection_accepted",
            Self::JobApplication => "job_application",
            Self::ApplicationStatus => "application_status",
            Self::JobPosted => "job_posted",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for NotificationKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for NotificationKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// An item in the viewer's notification feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: EntityId,
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// The user whose action produced this notification, when known.
    pub sender: Option<UserRef>,
}

/// Lifecycle of a connection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
    Other(String),
}

impl ConnectionStatus {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "pending" => Self::Pending,
            "accepted" => Self::Accepted,
            "rejected" => Self::Rejected,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for ConnectionStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for ConnectionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// A connection request between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: EntityId,
    pub sender: Option<UserRef>,
    pub receiver: Option<UserRef>,
    pub status: ConnectionStatus,
    pub created_at: Option<DateTime<Utc>>,
}
