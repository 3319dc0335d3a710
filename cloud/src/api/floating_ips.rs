//! Floating (public) IP API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::dictionary::IpVersion;
use super::tickets::Ticket;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct FloatingIp {
    pub id: u64,
    pub address: String,
    pub ip_version: IpVersion,
    #[serde(default)]
    pub description: Option<String>,
    /// Instance the address is currently attached to
    #[serde(default)]
    pub instance_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateFloatingIpRequest {
    pub ip_version: IpVersion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateFloatingIpRequest {
    pub description: Option<String>,
}

pub struct FloatingIpsApi<'a> {
    client: &'a Client,
}

impl<'a> FloatingIpsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/floating-ips
    pub async fn list(&self) -> Result<Vec<FloatingIp>, ApiError> {
        self.client.list_all("/v1/floating-ips").await
    }

    /// GET /v1/floating-ips/{id}
    pub async fn get(&self, id: u64) -> Result<FloatingIp, ApiError> {
        self.client.get(&format!("/v1/floating-ips/{}", id)).await
    }

    /// POST /v1/floating-ips
    pub async fn create(&self, request: &CreateFloatingIpRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/floating-ips", request).await
    }

    /// PUT /v1/floating-ips/{id}
    pub async fn update(
        &self,
        id: u64,
        request: &UpdateFloatingIpRequest,
    ) -> Result<Ticket, ApiError> {
        self.client
            .put(&format!("/v1/floating-ips/{}", id), request)
            .await
    }

    /// DELETE /v1/floating-ips/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client.delete(&format!("/v1/floating-ips/{}", id)).await
    }
}
