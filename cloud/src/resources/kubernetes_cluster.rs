//! Managed Kubernetes cluster resource
//!
//! A finished operation only means the platform accepted the change. The
//! cluster keeps converging afterwards, so create and update also wait for
//! it to report `running` under the cluster poll policy.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use super::{
    complete_operation, create_response, created, delete_response, import_by_id, read_response,
    reject_replacements, required_id, required_string, state_id, state_of, update_response,
    CreateFailure, CreateResult, CREATE_TIMEOUT, DELETE_TIMEOUT, UPDATE_TIMEOUT,
};
use crate::api::kubernetes::{CreateClusterRequest, Operation, UpdateClusterRequest};
use crate::api::Ticket;
use crate::data_sources::kubernetes::Clusters;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};
use crate::reconciler::wait_for_cluster_ready;

/// `major.minor` or `major.minor.patch`
fn is_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    (2..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// Waits for the operation and then for the cluster to settle
pub(crate) async fn settle(
    ctx: &Context,
    data: &CloudProviderData,
    operation: Operation,
    cluster_id: Option<u64>,
) -> Result<u64> {
    let ticket = complete_operation(ctx, data, Ticket::from(operation)).await?;
    let cluster_id = match cluster_id {
        Some(id) => id,
        None => ticket.object_id()?,
    };

    let api = data.kubernetes.kubernetes();
    wait_for_cluster_ready(ctx, &api, cluster_id, data.cluster_policy).await?;
    Ok(cluster_id)
}

#[derive(Default)]
pub struct KubernetesClusterResource {
    provider_data: Option<CloudProviderData>,
}

impl KubernetesClusterResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn cluster_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a managed Kubernetes cluster")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Cluster identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Cluster name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("version", AttributeType::String)
                    .description("Kubernetes version; changing it upgrades the cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("network_id", AttributeType::String)
                    .description("Network the cluster runs in")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Cluster state")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_endpoint", AttributeType::String)
                    .description("Kubernetes API endpoint")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("node_count", AttributeType::Number)
                    .description("Number of worker nodes")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created", AttributeType::String)
                    .description("Creation time")
                    .computed()
                    .build(),
            )
            .build()
    }

    async fn read_cluster(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let cluster = data
            .kubernetes
            .kubernetes()
            .get_cluster(id)
            .await
            .map_err(|e| Error::api(format!("reading cluster {}", id), e))?;
        state_of(&Clusters, &cluster)
    }

    async fn create_cluster(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let request = CreateClusterRequest {
            name: required_string(config, "name")?,
            version: required_string(config, "version")?,
            network_id: required_id(config, "network_id")?,
        };

        let operation = data
            .kubernetes
            .kubernetes()
            .create_cluster(&request)
            .await
            .map_err(|e| Error::api("creating cluster", e))?;
        let announced = operation.resource_id;
        let ticket = complete_operation(ctx, data, Ticket::from(operation))
            .await
            .map_err(|e| match announced {
                Some(id) => CreateFailure::left_behind(id, e),
                None => CreateFailure::from(e),
            })?;
        let id = ticket.object_id().or_else(|e| announced.ok_or(e))?;

        created(id, async {
            let api = data.kubernetes.kubernetes();
            wait_for_cluster_ready(ctx, &api, id, data.cluster_policy).await?;
            tracing::info!("Cluster {} ({}) is running", request.name, id);
            self.read_cluster(data, id).await
        })
        .await
    }

    async fn update_cluster(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue> {
        reject_replacements(
            &Self::cluster_schema(),
            &request.prior_state,
            &request.planned_state,
        )?;
        let id = state_id(&request.prior_state)?;
        let update = UpdateClusterRequest {
            name: required_string(&request.config, "name")?,
            version: required_string(&request.config, "version")?,
        };

        let operation = data
            .kubernetes
            .kubernetes()
            .update_cluster(id, &update)
            .await
            .map_err(|e| Error::api(format!("updating cluster {}", id), e))?;
        settle(ctx, data, operation, Some(id)).await?;

        self.read_cluster(data, id).await
    }

    async fn delete_cluster(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let id = state_id(state)?;
        let operation = data
            .kubernetes
            .kubernetes()
            .delete_cluster(id)
            .await
            .map_err(|e| Error::api(format!("deleting cluster {}", id), e))?;
        complete_operation(ctx, data, Ticket::from(operation)).await?;
        tracing::info!("Deleted cluster {}", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for KubernetesClusterResource {
    fn type_name(&self) -> &str {
        "cloud_kubernetes_cluster"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::cluster_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(version) = request.config.get_string(&AttributePath::new("version")) {
            if !is_version(&version) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Kubernetes version",
                        format!("'{}' is not of the form 1.30 or 1.30.2", version),
                    )
                    .with_attribute(AttributePath::new("version")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(CREATE_TIMEOUT);
        let result = self.create_cluster(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "cluster")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_cluster(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "cluster")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = self.update_cluster(&ctx, data, &request).await;
        update_response(result, request.prior_state, "cluster")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self.delete_cluster(&ctx, data, &request.prior_state).await;
        delete_response(result, "cluster")
    }
}

#[async_trait]
impl ResourceWithConfigure for KubernetesClusterResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        match CloudProviderData::from_configure(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for KubernetesClusterResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_id(&ctx, &request)
    }
}
