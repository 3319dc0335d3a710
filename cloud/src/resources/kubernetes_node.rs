//! Kubernetes worker node resource. Nodes cannot be resized; every
//! configurable attribute forces replacement.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use super::kubernetes_cluster::settle;
use super::{
    create_response, created, delete_response, read_response, reject_replacements, required_id,
    required_string, required_u32, required_u64, state_id, state_of, update_response,
    CreateResult, CREATE_TIMEOUT, DELETE_TIMEOUT,
};
use crate::api::kubernetes::CreateNodeRequest;
use crate::data_sources::kubernetes::Nodes;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};
use crate::values::parse_id;

/// Splits a `cluster_id/node_id` import id
fn parse_import_id(id: &str) -> Result<(u64, u64)> {
    let (cluster, node) = id.split_once('/').ok_or_else(|| {
        Error::Config(format!(
            "import id '{}' must have the form cluster_id/node_id",
            id
        ))
    })?;
    Ok((parse_id("cluster_id", cluster)?, parse_id("id", node)?))
}

#[derive(Default)]
pub struct KubernetesNodeResource {
    provider_data: Option<CloudProviderData>,
}

impl KubernetesNodeResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a worker node of a managed Kubernetes cluster")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Node identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_id", AttributeType::String)
                    .description("Cluster the node joins")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Node name")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cpu", AttributeType::Number)
                    .description("Number of vCPUs")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ram", AttributeType::Number)
                    .description("Memory in MiB")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_size", AttributeType::Number)
                    .description("Disk size in GiB")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Node state")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("address", AttributeType::String)
                    .description("Node address")
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

    async fn read_node(
        &self,
        data: &CloudProviderData,
        cluster_id: u64,
        node_id: u64,
    ) -> Result<DynamicValue> {
        let node = data
            .kubernetes
            .kubernetes()
            .get_node(cluster_id, node_id)
            .await
            .map_err(|e| {
                Error::api(
                    format!("reading node {} of cluster {}", node_id, cluster_id),
                    e,
                )
            })?;
        state_of(&Nodes, &node)
    }

    async fn create_node(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let cluster_id = required_id(config, "cluster_id")?;
        let request = CreateNodeRequest {
            name: required_string(config, "name")?,
            cpu: required_u32(config, "cpu")?,
            ram: required_u32(config, "ram")?,
            disk_size: required_u64(config, "disk_size")?,
        };

        let operation = data
            .kubernetes
            .kubernetes()
            .create_node(cluster_id, &request)
            .await
            .map_err(|e| Error::api(format!("adding node to cluster {}", cluster_id), e))?;
        let node_id = operation.resource_id.ok_or_else(|| Error::MissingObjectId {
            ticket: operation.id.clone(),
        })?;
        created(node_id, async {
            settle(ctx, data, operation, Some(cluster_id)).await?;
            tracing::info!("Node {} joined cluster {}", node_id, cluster_id);
            self.read_node(data, cluster_id, node_id).await
        })
        .await
    }

    async fn delete_node(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let cluster_id = required_id(state, "cluster_id")?;
        let node_id = state_id(state)?;
        let operation = data
            .kubernetes
            .kubernetes()
            .delete_node(cluster_id, node_id)
            .await
            .map_err(|e| {
                Error::api(
                    format!("removing node {} from cluster {}", node_id, cluster_id),
                    e,
                )
            })?;
        settle(ctx, data, operation, Some(cluster_id)).await?;
        tracing::info!("Node {} left cluster {}", node_id, cluster_id);
        Ok(())
    }
}

#[async_trait]
impl Resource for KubernetesNodeResource {
    fn type_name(&self) -> &str {
        "cloud_kubernetes_node"
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
            schema: Self::node_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        for field in ["cpu", "ram", "disk_size"] {
            if let Ok(n) = request.config.get_number(&AttributePath::new(field)) {
                if n < 1.0 || n.fract() != 0.0 {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid node size",
                            format!("{} must be a positive whole number, got {}", field, n),
                        )
                        .with_attribute(AttributePath::new(field)),
                    );
                }
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
        let result = self.create_node(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "node")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let ids = required_id(&request.current_state, "cluster_id")
            .and_then(|cluster_id| Ok((cluster_id, state_id(&request.current_state)?)));
        let result = match ids {
            Ok((cluster_id, node_id)) => self.read_node(data, cluster_id, node_id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "node")
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let result = async {
            reject_replacements(
                &Self::node_schema(),
                &request.prior_state,
                &request.planned_state,
            )?;
            let cluster_id = required_id(&request.prior_state, "cluster_id")?;
            self.read_node(data, cluster_id, state_id(&request.prior_state)?)
                .await
        }
        .await;

        update_response(result, request.prior_state, "node")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self.delete_node(&ctx, data, &request.prior_state).await;
        delete_response(result, "node")
    }
}

#[async_trait]
impl ResourceWithConfigure for KubernetesNodeResource {
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
impl ResourceWithImportState for KubernetesNodeResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        let (cluster_id, node_id) = match parse_import_id(&request.id) {
            Ok(ids) => ids,
            Err(e) => {
                response
                    .diagnostics
                    .push(Diagnostic::error("Invalid import ID", e.to_string()));
                return response;
            }
        };

        let mut state = DynamicValue::object();
        let _ = state.set_string(&AttributePath::new("cluster_id"), cluster_id.to_string());
        let _ = state.set_string(&AttributePath::new("id"), node_id.to_string());

        response.imported_resources.push(ImportedResource {
            type_name: request.type_name,
            state,
        });
        response
    }
}
