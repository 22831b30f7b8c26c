//! Connection request endpoints.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use radar_shared::{payload, ConnectionRequest, EntityId};

use crate::client::ApiClient;
use crate::error::Result;

/// Both sides of the viewer's request book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBook {
    pub received: Vec<ConnectionRequest>,
    pub sent: Vec<ConnectionRequest>,
}

impl ApiClient {
    /// Fetch received and sent connection requests in one call.
    pub async fn list_connection_requests(&self) -> Result<RequestBook> {
        let raw = self.get_json("/api/connections/requests").await?;
        let received = payload::connection_requests(&raw, "received")?;
        let sent = payload::connection_requests(&raw, "sent")?;
        Ok(RequestBook { received, sent })
    }

    /// Send a connection request to another user.
    pub async fn send_connection_request(&self, receiver: &EntityId) -> Result<()> {
        let body = json!({ "receiver_id": receiver.as_str() });
        self.post_json("/api/connections/request", &body).await?;
        debug!(receiver = %receiver, "Connection request sent");
        Ok(())
    }

    /// Accept or reject a received request.
    pub async fn respond_connection_request(&self, id: &EntityId, accept: bool) -> Result<()> {
        let verb = if accept { "accept" } else { "reject" };
        let path = format!("/api/connections/requests/{id}/{verb}");
        self.put_json(&path, None).await?;
        debug!(request = %id, verb, "Connection request answered");
        Ok(())
    }
}
