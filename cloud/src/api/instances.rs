//! Virtual instance API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::dictionary::InstanceState;
use super::tickets::Ticket;
use super::{ApiError, Client};

/// Image reference embedded in an instance
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    pub id: u64,
    pub name: String,
    /// Absent while the instance is still being provisioned
    #[serde(default)]
    pub image: Option<ImageRef>,
    pub cpu: u32,
    /// Memory in MiB
    pub ram: u32,
    #[serde(default)]
    pub group_id: Option<u64>,
    #[serde(default)]
    pub ssh_key_ids: Vec<u64>,
    #[serde(default)]
    pub floating_ip_ids: Vec<u64>,
    #[serde(default)]
    pub network_ids: Vec<u64>,
    #[serde(default)]
    pub disk_ids: Vec<u64>,
    pub state: InstanceState,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

/// Request body for POST /v1/instances
#[derive(Debug, Serialize)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub image_id: u64,
    pub cpu: u32,
    pub ram: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_key_ids: Vec<u64>,
}

/// Request body for PUT /v1/instances/{id}
#[derive(Debug, Serialize)]
pub struct UpdateInstanceRequest {
    pub name: String,
    pub cpu: u32,
    pub ram: u32,
    pub group_id: Option<u64>,
}

/// Objects that can be attached to an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    FloatingIp,
    Network,
    Disk,
}

impl Attachment {
    fn segment(self) -> &'static str {
        match self {
            Attachment::FloatingIp => "floating-ips",
            Attachment::Network => "networks",
            Attachment::Disk => "disks",
        }
    }
}

pub struct InstancesApi<'a> {
    client: &'a Client,
}

impl<'a> InstancesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/instances
    pub async fn list(&self) -> Result<Vec<Instance>, ApiError> {
        self.client.list_all("/v1/instances").await
    }

    /// GET /v1/instances/{id}
    pub async fn get(&self, id: u64) -> Result<Instance, ApiError> {
        self.client.get(&format!("/v1/instances/{}", id)).await
    }

    /// POST /v1/instances
    pub async fn create(&self, request: &CreateInstanceRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/instances", request).await
    }

    /// PUT /v1/instances/{id}
    pub async fn update(
        &self,
        id: u64,
        request: &UpdateInstanceRequest,
    ) -> Result<Ticket, ApiError> {
        self.client
            .put(&format!("/v1/instances/{}", id), request)
            .await
    }

    /// DELETE /v1/instances/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client.delete(&format!("/v1/instances/{}", id)).await
    }

    /// POST /v1/instances/{id}/{kind}/{object_id}
    pub async fn attach(
        &self,
        id: u64,
        kind: Attachment,
        object_id: u64,
    ) -> Result<Ticket, ApiError> {
        self.client
            .post(
                &format!("/v1/instances/{}/{}/{}", id, kind.segment(), object_id),
                &serde_json::json!({}),
            )
            .await
    }

    /// DELETE /v1/instances/{id}/{kind}/{object_id}
    pub async fn detach(
        &self,
        id: u64,
        kind: Attachment,
        object_id: u64,
    ) -> Result<Ticket, ApiError> {
        self.client
            .delete(&format!(
                "/v1/instances/{}/{}/{}",
                id,
                kind.segment(),
                object_id
            ))
            .await
    }

    /// POST /v1/instances/{id}/start
    pub async fn start(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client
            .post(&format!("/v1/instances/{}/start", id), &serde_json::json!({}))
            .await
    }

    /// POST /v1/instances/{id}/stop
    pub async fn stop(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client
            .post(&format!("/v1/instances/{}/stop", id), &serde_json::json!({}))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const TICKET: &str = r#"{"id":"T1","completed":null,"progress":0,"status":1}"#;

    #[tokio::test]
    async fn create_posts_body_and_returns_ticket() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/instances")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "web",
                "image_id": 7,
                "cpu": 2,
                "ram": 2048,
                "ssh_key_ids": [3]
            })))
            .with_body(TICKET)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        let ticket = client
            .instances()
            .create(&CreateInstanceRequest {
                name: "web".to_string(),
                image_id: 7,
                cpu: 2,
                ram: 2048,
                group_id: None,
                ssh_key_ids: vec![3],
            })
            .await
            .unwrap();

        assert_eq!(ticket.id, "T1");
        assert!(ticket.is_pending());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn attach_and_detach_use_the_attachment_path() {
        let mut server = Server::new_async().await;
        let attach = server
            .mock("POST", "/v1/instances/5/floating-ips/9")
            .with_body(TICKET)
            .create_async()
            .await;
        let detach = server
            .mock("DELETE", "/v1/instances/5/disks/11")
            .with_body(TICKET)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        client
            .instances()
            .attach(5, Attachment::FloatingIp, 9)
            .await
            .unwrap();
        client
            .instances()
            .detach(5, Attachment::Disk, 11)
            .await
            .unwrap();

        attach.assert_async().await;
        detach.assert_async().await;
    }

    #[tokio::test]
    async fn get_decodes_instance() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/instances/5")
            .with_body(
                r#"{"id":5,"name":"web","image":{"id":7,"name":"debian-12"},"cpu":2,"ram":2048,
                    "network_ids":[1,2],"state":2,"ipv4":"10.0.0.5","created":"2024-01-02T03:04:05Z"}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        let instance = client.instances().get(5).await.unwrap();

        assert_eq!(instance.image.unwrap().name, "debian-12");
        assert_eq!(instance.network_ids, vec![1, 2]);
        assert_eq!(instance.state, InstanceState::Running);
        assert!(instance.disk_ids.is_empty());
    }
}
