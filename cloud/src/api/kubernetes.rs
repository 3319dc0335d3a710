//! Managed Kubernetes API implementation
//!
//! Cluster and node mutations return an [`Operation`]. Operations convert
//! into [`Ticket`]s and [`KubernetesApi`] serves them as a ticket source, so
//! the reconciler drives both APIs the same way.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::deserialize_optional_timestamp;
use super::dictionary::{operation_status, TicketStatus};
use super::tickets::Ticket;
use super::{ApiError, Client};
use crate::error::{Error, Result};
use crate::reconciler::{ClusterSource, TicketSource};

pub const CLUSTER_RUNNING: &str = "running";

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    pub id: u64,
    pub name: String,
    pub version: String,
    pub network_id: u64,
    pub status: String,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    #[serde(default)]
    pub node_count: u32,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

impl Cluster {
    pub fn is_running(&self) -> bool {
        self.status == CLUSTER_RUNNING
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: u64,
    pub cluster_id: u64,
    pub name: String,
    pub cpu: u32,
    pub ram: u32,
    pub disk_size: u64,
    pub status: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub id: String,
    pub status: u32,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Cluster or node the operation acts on
    #[serde(default)]
    pub resource_id: Option<u64>,
}

impl From<Operation> for Ticket {
    fn from(op: Operation) -> Self {
        let status = operation_status::to_ticket_status(op.status);
        // DONE and FAILED are terminal even when the finish time is missing
        let completed = op.finished_at.or_else(|| {
            matches!(status, TicketStatus::Succeeded | TicketStatus::Error).then(Utc::now)
        });
        Ticket {
            id: op.id,
            completed,
            progress: op.progress,
            status,
            object_id: op.resource_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateClusterRequest {
    pub name: String,
    pub version: String,
    pub network_id: u64,
}

#[derive(Debug, Serialize)]
pub struct UpdateClusterRequest {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct CreateNodeRequest {
    pub name: String,
    pub cpu: u32,
    pub ram: u32,
    pub disk_size: u64,
}

pub struct KubernetesApi<'a> {
    client: &'a Client,
}

impl<'a> KubernetesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/clusters
    pub async fn list_clusters(&self) -> Result<Vec<Cluster>, ApiError> {
        self.client.list_all("/v1/clusters").await
    }

    /// GET /v1/clusters/{id}
    pub async fn get_cluster(&self, id: u64) -> Result<Cluster, ApiError> {
        self.client.get(&format!("/v1/clusters/{}", id)).await
    }

    /// POST /v1/clusters
    pub async fn create_cluster(
        &self,
        request: &CreateClusterRequest,
    ) -> Result<Operation, ApiError> {
        self.client.post("/v1/clusters", request).await
    }

    /// PUT /v1/clusters/{id}
    pub async fn update_cluster(
        &self,
        id: u64,
        request: &UpdateClusterRequest,
    ) -> Result<Operation, ApiError> {
        self.client
            .put(&format!("/v1/clusters/{}", id), request)
            .await
    }

    /// DELETE /v1/clusters/{id}
    pub async fn delete_cluster(&self, id: u64) -> Result<Operation, ApiError> {
        self.client.delete(&format!("/v1/clusters/{}", id)).await
    }

    /// GET /v1/clusters/{id}/nodes
    pub async fn list_nodes(&self, cluster_id: u64) -> Result<Vec<Node>, ApiError> {
        self.client
            .list_all(&format!("/v1/clusters/{}/nodes", cluster_id))
            .await
    }

    /// GET /v1/clusters/{id}/nodes/{node}
    pub async fn get_node(&self, cluster_id: u64, node_id: u64) -> Result<Node, ApiError> {
        self.client
            .get(&format!("/v1/clusters/{}/nodes/{}", cluster_id, node_id))
            .await
    }

    /// POST /v1/clusters/{id}/nodes
    pub async fn create_node(
        &self,
        cluster_id: u64,
        request: &CreateNodeRequest,
    ) -> Result<Operation, ApiError> {
        self.client
            .post(&format!("/v1/clusters/{}/nodes", cluster_id), request)
            .await
    }

    /// DELETE /v1/clusters/{id}/nodes/{node}
    pub async fn delete_node(&self, cluster_id: u64, node_id: u64) -> Result<Operation, ApiError> {
        self.client
            .delete(&format!("/v1/clusters/{}/nodes/{}", cluster_id, node_id))
            .await
    }

    /// GET /v1/operations/{id}
    pub async fn get_operation(&self, id: &str) -> Result<Operation, ApiError> {
        self.client
            .get(&format!("/v1/operations/{}", urlencoding::encode(id)))
            .await
    }
}

#[async_trait]
impl TicketSource for KubernetesApi<'_> {
    async fn fetch_ticket(&self, id: &str) -> Result<Ticket> {
        self.get_operation(id)
            .await
            .map(Ticket::from)
            .map_err(|e| Error::api(format!("fetching operation {}", id), e))
    }
}

#[async_trait]
impl ClusterSource for KubernetesApi<'_> {
    async fn fetch_cluster(&self, id: u64) -> Result<Cluster> {
        self.get_cluster(id)
            .await
            .map_err(|e| Error::api(format!("fetching cluster {}", id), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tfplug::context::Context;

    #[test]
    fn finished_operation_becomes_terminal_ticket() {
        let op: Operation = serde_json::from_str(
            r#"{"id":"op-1","status":2,"progress":100,"finished_at":"2024-06-01T00:00:00Z","resource_id":12}"#,
        )
        .unwrap();

        let ticket = Ticket::from(op);
        assert_eq!(ticket.id, "op-1");
        assert!(!ticket.is_pending());
        assert_eq!(ticket.status, TicketStatus::Succeeded);
        assert_eq!(ticket.object_id().unwrap(), 12);
    }

    #[test]
    fn running_operation_stays_pending() {
        let op: Operation =
            serde_json::from_str(r#"{"id":"op-2","status":1,"finished_at":""}"#).unwrap();

        let ticket = Ticket::from(op);
        assert!(ticket.is_pending());
        assert_eq!(ticket.status, TicketStatus::Running);
    }

    #[test]
    fn terminal_operation_without_finish_time_is_not_pending() {
        let failed: Operation = serde_json::from_str(r#"{"id":"op-4","status":3}"#).unwrap();
        let ticket = Ticket::from(failed);
        assert!(!ticket.is_pending());
        assert_eq!(ticket.status, TicketStatus::Error);

        let done: Operation =
            serde_json::from_str(r#"{"id":"op-5","status":2,"resource_id":8}"#).unwrap();
        let ticket = Ticket::from(done);
        assert!(!ticket.is_pending());
        assert_eq!(ticket.object_id().unwrap(), 8);

        let queued: Operation = serde_json::from_str(r#"{"id":"op-6","status":0}"#).unwrap();
        assert!(Ticket::from(queued).is_pending());
    }

    #[tokio::test]
    async fn failed_operation_without_finish_time_ends_the_wait() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/operations/op-7")
            .with_body(r#"{"id":"op-7","status":3}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        let ctx = Context::new().with_timeout(std::time::Duration::from_secs(5));
        let pending: Operation = serde_json::from_str(r#"{"id":"op-7","status":1}"#).unwrap();
        let ticket = crate::reconciler::wait_for_completion(
            &ctx,
            &client.kubernetes(),
            Ticket::from(pending),
            crate::reconciler::PollPolicy::TICKET,
        )
        .await
        .unwrap();

        assert_eq!(ticket.status, TicketStatus::Error);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn operations_are_served_as_tickets() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/operations/op-3")
            .with_body(r#"{"id":"op-3","status":3,"finished_at":"2024-06-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        let ticket = client.kubernetes().fetch_ticket("op-3").await.unwrap();

        assert_eq!(ticket.status, TicketStatus::Error);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cluster_source_reports_running_flag() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/clusters/4")
            .with_body(
                r#"{"id":4,"name":"k","version":"1.30","network_id":2,"status":"running","api_endpoint":"https://k.example"}"#,
            )
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", false).unwrap();
        let cluster = client.kubernetes().fetch_cluster(4).await.unwrap();

        assert!(cluster.is_running());
        assert_eq!(cluster.api_endpoint.as_deref(), Some("https://k.example"));
    }
}
