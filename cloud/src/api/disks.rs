//! Block storage API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::dictionary::DiskType;
use super::tickets::Ticket;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct Disk {
    pub id: u64,
    pub name: String,
    /// Size in GiB
    pub size: u64,
    pub disk_type: DiskType,
    #[serde(default)]
    pub instance_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateDiskRequest {
    pub name: String,
    pub size: u64,
    pub disk_type: DiskType,
}

/// Disks can be renamed and grown in place
#[derive(Debug, Serialize)]
pub struct UpdateDiskRequest {
    pub name: String,
    pub size: u64,
}

pub struct DisksApi<'a> {
    client: &'a Client,
}

impl<'a> DisksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/disks
    pub async fn list(&self) -> Result<Vec<Disk>, ApiError> {
        self.client.list_all("/v1/disks").await
    }

    /// GET /v1/disks/{id}
    pub async fn get(&self, id: u64) -> Result<Disk, ApiError> {
        self.client.get(&format!("/v1/disks/{}", id)).await
    }

    /// POST /v1/disks
    pub async fn create(&self, request: &CreateDiskRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/disks", request).await
    }

    /// PUT /v1/disks/{id}
    pub async fn update(&self, id: u64, request: &UpdateDiskRequest) -> Result<Ticket, ApiError> {
        self.client.put(&format!("/v1/disks/{}", id), request).await
    }

    /// DELETE /v1/disks/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client.delete(&format!("/v1/disks/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn create_sends_disk_type_code() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/disks")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "data",
                "size": 50,
                "disk_type": 2
            })))
            .with_body(r#"{"id":"T2","completed":null,"progress":0,"status":1}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        client
            .disks()
            .create(&CreateDiskRequest {
                name: "data".to_string(),
                size: 50,
                disk_type: DiskType::Ssd,
            })
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn forbidden_disk_reads_as_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/disks/3")
            .with_status(403)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        let err = client.disks().get(3).await.unwrap_err();

        assert!(err.is_not_found());
    }
}
