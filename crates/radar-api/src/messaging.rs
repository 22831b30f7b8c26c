//! Conversation and message endpoints.

use serde_json::json;
use tracing::debug;

use radar_shared::{payload, Conversation, EntityId, Message, Page};

use crate::client::ApiClient;
use crate::error::Result;
use crate::paging::PageQuery;

impl ApiClient {
    /// Fetch every conversation the viewer takes part in.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let raw = self.get_json("/api/mssgs/conversations").await?;
        Ok(payload::conversations(&raw)?)
    }

    /// Fetch one page of a conversation's messages. The server returns
    /// newest first; ordering for display is the store's concern.
    pub async fn list_messages(
        &self,
        conversation_id: &EntityId,
        query: PageQuery,
    ) -> Result<Page<Message>> {
        let path = format!("/api/mssgs/{conversation_id}");
        let raw = self.get_json_query(&path, &query).await?;
        Ok(payload::message_page(&raw, conversation_id)?)
    }

    /// Send a message and return the server-confirmed entity.
    pub async fn send_message(&self, conversation_id: &EntityId, body: &str) -> Result<Message> {
        let request = json!({
            "conversationId": conversation_id.as_str(),
            "text": body,
        });
        let raw = self.post_json("/api/mssgs/send", &request).await?;
        let confirmed = payload::sent_message(&raw, conversation_id)?;
        debug!(conversation = %conversation_id, message = %confirmed.id, "Message accepted");
        Ok(confirmed)
    }

    /// Delete a message by id.
    pub async fn delete_message(&self, message_id: &EntityId) -> Result<()> {
        let path = format!("/api/mssgs/delete/{message_id}");
        self.delete_json(&path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use radar_shared::EntityId;

    use crate::client::{ApiClient, TokenStore};
    use crate::paging::PageQuery;

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5), TokenStore::default()).unwrap()
    }

    #[tokio::test]
    async fn test_list_conversations_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mssgs/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "conversations": [{
                    "conversation_id": 12,
                    "participants": [{ "id": 9, "full_name": "Blake Reyes" }],
                    "last_message": "see you then",
                    "last_message_at": "2025-03-02 09:15:00"
                }]
            })))
            .mount(&server)
            .await;

        let conversations = client_for(&server).list_conversations().await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].id, EntityId::from(12i64));
        assert_eq!(conversations[0].participants[0].full_name, "Blake Reyes");
    }

    #[tokio::test]
    async fn test_list_messages_paged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/mssgs/12"))
            .and(query_param("page", "1"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    { "id": 2, "content": "later one", "sender_id": 9,
                      "created_at": "2025-03-02 09:16:00" },
                    { "id": 1, "content": "first one", "sender_id": 7,
                      "created_at": "2025-03-02 09:15:00" }
                ],
                "total": 120,
                "page": 1,
                "limit": 50
            })))
            .mount(&server)
            .await;

        let conversation = EntityId::from(12i64);
        let page = client_for(&server)
            .list_messages(&conversation, PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 120);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].conversation_id, conversation);
    }

    #[tokio::test]
    async fn test_send_message_decodes_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/mssgs/send"))
            .and(body_json(json!({ "conversationId": "12", "text": "How are you?" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Message sent",
                "newMessage": {
                    "_id": "m123",
                    "conversation": "12",
                    "sender": "7",
                    "text": "How are you?",
                    "createdAt": "2025-03-02T09:16:00Z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let conversation = EntityId::from(12i64);
        let confirmed = client_for(&server)
            .send_message(&conversation, "How are you?")
            .await
            .unwrap();
        assert_eq!(confirmed.id, EntityId::from("m123"));
        assert_eq!(confirmed.body, "How are you?");
        assert!(!confirmed.pending);
    }

    #[tokio::test]
    async fn test_delete_message_hits_delete_route() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/mssgs/delete/m9"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "Deleted" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete_message(&EntityId::from("m9"))
            .await
            .unwrap();
    }
}
