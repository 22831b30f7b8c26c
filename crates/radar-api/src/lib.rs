//! HTTP client for the Hire Radar REST API.
//!
//! [`ApiClient`] owns the base URL, timeout and bearer token; endpoint
//! groups extend it from their own modules. Every response body goes
//! through `radar_shared::payload` before leaving this crate, so
//! callers only ever see canonical entities.

pub mod auth;
pub mod client;
pub mod connections;
pub mod error;
pub mod messaging;
pub mod notifications;
pub mod paging;

pub use client::{ApiClient, TokenStore};
pub use connections::RequestBook;
pub use error::{ApiError, Result};
pub use paging::PageQuery;
