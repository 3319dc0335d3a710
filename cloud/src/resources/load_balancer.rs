//! Load balancer resource
//!
//! Member instances are a set attribute. Create and update compare the
//! configured set with the members the platform reports and add or remove
//! the difference one ticket at a time.

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

use super::attachments::AttachmentDiff;
use super::{
    complete, create_response, created, delete_response, id_set, import_by_id, read_response,
    reject_replacements, required_id, required_string, required_u16, state_id, state_of,
    update_response, CreateResult, CREATE_TIMEOUT, DELETE_TIMEOUT, UPDATE_TIMEOUT,
};
use crate::api::dictionary::LbAlgorithm;
use crate::api::load_balancers::{CreateLoadBalancerRequest, UpdateLoadBalancerRequest};
use crate::data_sources::compute::LoadBalancers;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

fn algorithm(config: &DynamicValue) -> Result<LbAlgorithm> {
    LbAlgorithm::from_name(&required_string(config, "algorithm")?)
        .map_err(|e| Error::Config(e.to_string()))
}

#[derive(Default)]
pub struct LoadBalancerResource {
    provider_data: Option<CloudProviderData>,
}

impl LoadBalancerResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn load_balancer_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a load balancer and its member instances")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Load balancer identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Load balancer name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("algorithm", AttributeType::String)
                    .description("round_robin, least_connections or source_ip")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("network_id", AttributeType::String)
                    .description("Network the balancer is placed in")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port", AttributeType::Number)
                    .description("Listening port")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target_port", AttributeType::Number)
                    .description("Port traffic is forwarded to on members")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "instance_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("Member instances")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("address", AttributeType::String)
                    .description("Frontend address")
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

    async fn sync_members(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        id: u64,
        desired: &[u64],
        current: &[u64],
    ) -> Result<()> {
        let api = data.compute.load_balancers();
        let diff = AttachmentDiff::between(desired, current);

        for instance in diff.to_detach {
            tracing::debug!("Removing instance {} from load balancer {}", instance, id);
            let ticket = api.remove_member(id, instance).await.map_err(|e| {
                Error::api(
                    format!("removing instance {} from load balancer {}", instance, id),
                    e,
                )
            })?;
            complete(ctx, data, ticket).await?;
        }

        for instance in diff.to_attach {
            tracing::debug!("Adding instance {} to load balancer {}", instance, id);
            let ticket = api.add_member(id, instance).await.map_err(|e| {
                Error::api(
                    format!("adding instance {} to load balancer {}", instance, id),
                    e,
                )
            })?;
            complete(ctx, data, ticket).await?;
        }

        Ok(())
    }

    async fn create_load_balancer(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let request = CreateLoadBalancerRequest {
            name: required_string(config, "name")?,
            algorithm: algorithm(config)?,
            network_id: required_id(config, "network_id")?,
            port: required_u16(config, "port")?,
            target_port: required_u16(config, "target_port")?,
        };
        let members = id_set(config, "instance_ids")?;

        let ticket = data
            .compute
            .load_balancers()
            .create(&request)
            .await
            .map_err(|e| Error::api("creating load balancer", e))?;
        let id = complete(ctx, data, ticket).await?.object_id()?;
        tracing::info!("Created load balancer {} ({})", request.name, id);

        created(id, async {
            self.sync_members(ctx, data, id, &members, &[]).await?;
            self.read_load_balancer(data, id).await
        })
        .await
    }

    async fn read_load_balancer(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let lb = data
            .compute
            .load_balancers()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading load balancer {}", id), e))?;
        state_of(&LoadBalancers, &lb)
    }

    async fn update_load_balancer(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue> {
        reject_replacements(
            &Self::load_balancer_schema(),
            &request.prior_state,
            &request.planned_state,
        )?;
        let id = state_id(&request.prior_state)?;
        let config = &request.config;
        let api = data.compute.load_balancers();

        let current = api
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading load balancer {}", id), e))?;
        let update = UpdateLoadBalancerRequest {
            name: required_string(config, "name")?,
            algorithm: algorithm(config)?,
            port: required_u16(config, "port")?,
            target_port: required_u16(config, "target_port")?,
        };

        let settings_changed = update.name != current.name
            || update.algorithm != current.algorithm
            || update.port != current.port
            || update.target_port != current.target_port;
        if settings_changed {
            let ticket = api
                .update(id, &update)
                .await
                .map_err(|e| Error::api(format!("updating load balancer {}", id), e))?;
            complete(ctx, data, ticket).await?;
        }

        let desired = id_set(config, "instance_ids")?;
        self.sync_members(ctx, data, id, &desired, &current.member_ids)
            .await?;

        self.read_load_balancer(data, id).await
    }

    async fn delete_load_balancer(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let id = state_id(state)?;
        let ticket = data
            .compute
            .load_balancers()
            .delete(id)
            .await
            .map_err(|e| Error::api(format!("deleting load balancer {}", id), e))?;
        complete(ctx, data, ticket).await?;
        tracing::info!("Deleted load balancer {}", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for LoadBalancerResource {
    fn type_name(&self) -> &str {
        "cloud_load_balancer"
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
            schema: Self::load_balancer_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(name) = request
            .config
            .get_string(&AttributePath::new("algorithm"))
        {
            if let Err(e) = LbAlgorithm::from_name(&name) {
                diagnostics.push(
                    Diagnostic::error("Invalid algorithm", e.to_string())
                        .with_attribute(AttributePath::new("algorithm")),
                );
            }
        }

        for field in ["port", "target_port"] {
            if let Ok(port) = request.config.get_number(&AttributePath::new(field)) {
                if !(1.0..=65535.0).contains(&port) || port.fract() != 0.0 {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid port",
                            format!("{} must be between 1 and 65535, got {}", field, port),
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
        let result = self.create_load_balancer(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "load balancer")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_load_balancer(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "load balancer")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = self.update_load_balancer(&ctx, data, &request).await;
        update_response(result, request.prior_state, "load balancer")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self
            .delete_load_balancer(&ctx, data, &request.prior_state)
            .await;
        delete_response(result, "load balancer")
    }
}

#[async_trait]
impl ResourceWithConfigure for LoadBalancerResource {
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
impl ResourceWithImportState for LoadBalancerResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_id(&ctx, &request)
    }
}
