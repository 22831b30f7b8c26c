//! In-memory state for the Hire Radar client core.
//!
//! Plain single-threaded trackers ([`InboxState`], [`NoticeState`])
//! whose mutators report what changed, plus a shared [`QueryCache`]
//! with TTL freshness and invalidation watchers. Locking and event
//! fan-out live a layer up; nothing here does I/O.

pub mod cache;
pub mod inbox;
pub mod notices;

pub use cache::{QueryCache, QueryKey, WatchHandle};
pub use inbox::InboxState;
pub use notices::NoticeState;
