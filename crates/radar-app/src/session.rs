//! Shared session context.
//!
//! One [`Session`] per signed-in user ties together the API client,
//! the event bus, the query cache and the toast queue. Views clone it
//! freely; all clones share state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{info, warn};

use radar_api::{ApiClient, ApiError, TokenStore};
use radar_shared::UserRef;
use radar_store::QueryCache;

use crate::config::ClientConfig;
use crate::events::{AppEvent, EventBus};
use crate::toast::Toasts;

#[derive(Clone)]
pub struct Session {
    config: ClientConfig,
    api: ApiClient,
    bus: EventBus,
    cache: QueryCache,
    toasts: Toasts,
    viewer: Arc<RwLock<Option<UserRef>>>,
    /// Latch so one expiry produces one event, however many calls
    /// observe the dead token.
    expired: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let tokens = TokenStore::new(config.auth_token.clone());
        let api = ApiClient::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
            tokens,
        )?;
        let bus = EventBus::new();
        Ok(Self {
            api,
            cache: QueryCache::new(Duration::from_secs(config.cache_ttl_secs)),
            toasts: Toasts::new(bus.clone()),
            bus,
            viewer: Arc::new(RwLock::new(None)),
            expired: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Fetch and store the authenticated user. Clears the expiry latch
    /// on success so a renewed token starts a clean session.
    pub async fn connect(&self) -> Result<UserRef, ApiError> {
        let viewer = self.guard_quiet(self.api.fetch_viewer().await)?;
        *self.viewer.write().unwrap_or_else(PoisonError::into_inner) = Some(viewer.clone());
        self.expired.store(false, Ordering::SeqCst);
        info!(viewer = %viewer.id, "Session connected");
        Ok(viewer)
    }

    /// Install a fresh bearer token, e.g. after the embedder re-ran the
    /// sign-in flow.
    pub fn set_token(&self, token: impl Into<String>) {
        self.api.tokens().set(token);
        self.expired.store(false, Ordering::SeqCst);
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn viewer(&self) -> Option<UserRef> {
        self.viewer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Route an API outcome through session-level handling: expiry
    /// trips the latch, any other failure raises an error toast.
    pub fn guard<T>(&self, outcome: radar_api::Result<T>) -> radar_api::Result<T> {
        if let Err(error) = &outcome {
            match error {
                ApiError::SessionExpired => self.on_session_expired(),
                other => self.toasts.error(other.user_message()),
            }
        }
        outcome
    }

    /// Like [`Session::guard`] but without the toast, for background
    /// reads that should fail silently.
    pub fn guard_quiet<T>(&self, outcome: radar_api::Result<T>) -> radar_api::Result<T> {
        if let Err(ApiError::SessionExpired) = &outcome {
            self.on_session_expired();
        }
        outcome
    }

    fn on_session_expired(&self) {
        *self.viewer.write().unwrap_or_else(PoisonError::into_inner) = None;
        let already = self.expired.swap(true, Ordering::SeqCst);
        if !already {
            warn!("Session expired, notifying subscribers");
            self.bus.publish(&AppEvent::SessionExpired);
        }
    }
}
