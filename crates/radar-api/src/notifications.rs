//! Notification feed endpoints.

use radar_shared::{payload, EntityId, Notification};

use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// Fetch the viewer's notification feed.
    pub async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let raw = self.get_json("/api/notifications/").await?;
        Ok(payload::notifications(&raw)?)
    }

    /// Mark one notification as read.
    pub async fn mark_notification_read(&self, id: &EntityId) -> Result<()> {
        let path = format!("/api/notifications/{id}/read");
        self.put_json(&path, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use radar_shared::{EntityId, NotificationKind};

    use crate::client::{ApiClient, TokenStore};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5), TokenStore::default()).unwrap()
    }

    #[tokio::test]
    async fn test_list_notifications_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 5,
                "type": "connection_request",
                "title": "New connection request",
                "message": "Sam Park wants to connect",
                "is_read": 0,
                "created_at": "2025-03-01 08:00:00",
                "sender": { "id": 9, "full_name": "Sam Park" }
            }])))
            .mount(&server)
            .await;

        let feed = client_for(&server).list_notifications().await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::ConnectionRequest);
        assert!(!feed[0].read);
    }

    #[tokio::test]
    async fn test_mark_read_puts_to_read_route() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/notifications/5/read"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "message": "Notification marked as read" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .mark_notification_read(&EntityId::from(5i64))
            .await
            .unwrap();
    }
}
