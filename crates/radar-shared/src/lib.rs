//! Shared entity model and payload normalization for the Hire Radar
//! client core.
//!
//! Every crate in the workspace speaks in the canonical types defined
//! here. Raw server JSON only exists at the edge, inside
//! [`payload`], which absorbs the shape differences between backend
//! generations before anything else sees the data.

pub mod payload;
pub mod types;

mod error;

pub use error::{PayloadError, Result};
pub use payload::Page;
pub use types::{
    ConnectionRequest, ConnectionStatus, Conversation, EntityId, Message, Notification,
    NotificationKind, UserRef,
};
