//! Instance group API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::tickets::Ticket;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

/// Request body for both POST and PUT
#[derive(Debug, Serialize)]
pub struct GroupRequest {
    pub name: String,
    pub description: Option<String>,
}

pub struct GroupsApi<'a> {
    client: &'a Client,
}

impl<'a> GroupsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/groups
    pub async fn list(&self) -> Result<Vec<Group>, ApiError> {
        self.client.list_all("/v1/groups").await
    }

    /// GET /v1/groups/{id}
    pub async fn get(&self, id: u64) -> Result<Group, ApiError> {
        self.client.get(&format!("/v1/groups/{}", id)).await
    }

    /// POST /v1/groups
    pub async fn create(&self, request: &GroupRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/groups", request).await
    }

    /// PUT /v1/groups/{id}
    pub async fn update(&self, id: u64, request: &GroupRequest) -> Result<Ticket, ApiError> {
        self.client.put(&format!("/v1/groups/{}", id), request).await
    }

    /// DELETE /v1/groups/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client.delete(&format!("/v1/groups/{}", id)).await
    }
}
