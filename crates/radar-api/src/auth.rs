//! Session endpoints.

use radar_shared::{payload, UserRef};

use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// Fetch the authenticated user behind the current token.
    pub async fn fetch_viewer(&self) -> Result<UserRef> {
        let raw = self.get_json("/api/auth/me").await?;
        Ok(payload::viewer(&raw)?)
    }
}
