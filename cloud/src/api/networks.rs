//! Private network API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::tickets::Ticket;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub id: u64,
    pub name: String,
    pub cidr: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateNetworkRequest {
    pub name: String,
    pub description: Option<String>,
}

pub struct NetworksApi<'a> {
    client: &'a Client,
}

impl<'a> NetworksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/networks
    pub async fn list(&self) -> Result<Vec<Network>, ApiError> {
        self.client.list_all("/v1/networks").await
    }

    /// GET /v1/networks/{id}
    pub async fn get(&self, id: u64) -> Result<Network, ApiError> {
        self.client.get(&format!("/v1/networks/{}", id)).await
    }

    /// POST /v1/networks
    pub async fn create(&self, request: &CreateNetworkRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/networks", request).await
    }

    /// PUT /v1/networks/{id}
    pub async fn update(
        &self,
        id: u64,
        request: &UpdateNetworkRequest,
    ) -> Result<Ticket, ApiError> {
        self.client
            .put(&format!("/v1/networks/{}", id), request)
            .await
    }

    /// DELETE /v1/networks/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client.delete(&format!("/v1/networks/{}", id)).await
    }
}
