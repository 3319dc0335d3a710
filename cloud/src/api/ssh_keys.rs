//! SSH key API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::tickets::Ticket;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct SshKey {
    pub id: u64,
    pub name: String,
    pub public_key: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateSshKeyRequest {
    pub name: String,
    pub public_key: String,
}

/// SSH keys are immutable; changes go through delete and create
pub struct SshKeysApi<'a> {
    client: &'a Client,
}

impl<'a> SshKeysApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/ssh-keys
    pub async fn list(&self) -> Result<Vec<SshKey>, ApiError> {
        self.client.list_all("/v1/ssh-keys").await
    }

    /// GET /v1/ssh-keys/{id}
    pub async fn get(&self, id: u64) -> Result<SshKey, ApiError> {
        self.client.get(&format!("/v1/ssh-keys/{}", id)).await
    }

    /// POST /v1/ssh-keys
    pub async fn create(&self, request: &CreateSshKeyRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/ssh-keys", request).await
    }

    /// DELETE /v1/ssh-keys/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client.delete(&format!("/v1/ssh-keys/{}", id)).await
    }
}
