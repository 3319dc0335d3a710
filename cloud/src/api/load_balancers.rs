//! Load balancer API implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::dictionary::LbAlgorithm;
use super::tickets::Ticket;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub id: u64,
    pub name: String,
    pub algorithm: LbAlgorithm,
    pub network_id: u64,
    pub port: u16,
    pub target_port: u16,
    /// Instances currently receiving traffic
    #[serde(default)]
    pub member_ids: Vec<u64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateLoadBalancerRequest {
    pub name: String,
    pub algorithm: LbAlgorithm,
    pub network_id: u64,
    pub port: u16,
    pub target_port: u16,
}

#[derive(Debug, Serialize)]
pub struct UpdateLoadBalancerRequest {
    pub name: String,
    pub algorithm: LbAlgorithm,
    pub port: u16,
    pub target_port: u16,
}

pub struct LoadBalancersApi<'a> {
    client: &'a Client,
}

impl<'a> LoadBalancersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/load-balancers
    pub async fn list(&self) -> Result<Vec<LoadBalancer>, ApiError> {
        self.client.list_all("/v1/load-balancers").await
    }

    /// GET /v1/load-balancers/{id}
    pub async fn get(&self, id: u64) -> Result<LoadBalancer, ApiError> {
        self.client
            .get(&format!("/v1/load-balancers/{}", id))
            .await
    }

    /// POST /v1/load-balancers
    pub async fn create(&self, request: &CreateLoadBalancerRequest) -> Result<Ticket, ApiError> {
        self.client.post("/v1/load-balancers", request).await
    }

    /// PUT /v1/load-balancers/{id}
    pub async fn update(
        &self,
        id: u64,
        request: &UpdateLoadBalancerRequest,
    ) -> Result<Ticket, ApiError> {
        self.client
            .put(&format!("/v1/load-balancers/{}", id), request)
            .await
    }

    /// DELETE /v1/load-balancers/{id}
    pub async fn delete(&self, id: u64) -> Result<Ticket, ApiError> {
        self.client
            .delete(&format!("/v1/load-balancers/{}", id))
            .await
    }

    /// POST /v1/load-balancers/{id}/members/{instance_id}
    pub async fn add_member(&self, id: u64, instance_id: u64) -> Result<Ticket, ApiError> {
        self.client
            .post(
                &format!("/v1/load-balancers/{}/members/{}", id, instance_id),
                &serde_json::json!({}),
            )
            .await
    }

    /// DELETE /v1/load-balancers/{id}/members/{instance_id}
    pub async fn remove_member(&self, id: u64, instance_id: u64) -> Result<Ticket, ApiError> {
        self.client
            .delete(&format!("/v1/load-balancers/{}/members/{}", id, instance_id))
            .await
    }
}
