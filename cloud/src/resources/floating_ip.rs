//! Floating IP resource

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
    complete, create_response, created, delete_response, import_by_id, optional_string,
    read_response, reject_replacements, state_id, state_of, update_response, CreateResult,
    CREATE_TIMEOUT, DELETE_TIMEOUT, UPDATE_TIMEOUT,
};
use crate::api::dictionary::IpVersion;
use crate::api::floating_ips::{CreateFloatingIpRequest, UpdateFloatingIpRequest};
use crate::data_sources::compute::FloatingIps;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

#[derive(Default)]
pub struct FloatingIpResource {
    provider_data: Option<CloudProviderData>,
}

impl FloatingIpResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn floating_ip_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a floating (public) IP address")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Floating IP identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ip_version", AttributeType::String)
                    .description("ipv4 or ipv6")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Free-form description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("address", AttributeType::String)
                    .description("The allocated address")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("Instance the address is attached to; managed from cloud_instance")
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

    async fn create_floating_ip(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let version = super::required_string(config, "ip_version")?;
        let request = CreateFloatingIpRequest {
            ip_version: IpVersion::from_name(&version).map_err(|e| Error::Config(e.to_string()))?,
            description: optional_string(config, "description")?,
        };

        let ticket = data
            .compute
            .floating_ips()
            .create(&request)
            .await
            .map_err(|e| Error::api("allocating floating IP", e))?;
        let id = complete(ctx, data, ticket).await?.object_id()?;
        tracing::info!("Allocated floating IP {}", id);

        created(id, self.read_floating_ip(data, id)).await
    }

    async fn read_floating_ip(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let ip = data
            .compute
            .floating_ips()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading floating IP {}", id), e))?;
        state_of(&FloatingIps, &ip)
    }

    async fn update_floating_ip(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue> {
        reject_replacements(
            &Self::floating_ip_schema(),
            &request.prior_state,
            &request.planned_state,
        )?;
        let id = state_id(&request.prior_state)?;
        let update = UpdateFloatingIpRequest {
            description: optional_string(&request.config, "description")?,
        };

        let ticket = data
            .compute
            .floating_ips()
            .update(id, &update)
            .await
            .map_err(|e| Error::api(format!("updating floating IP {}", id), e))?;
        complete(ctx, data, ticket).await?;

        self.read_floating_ip(data, id).await
    }

    async fn release(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let id = state_id(state)?;
        let ticket = data
            .compute
            .floating_ips()
            .delete(id)
            .await
            .map_err(|e| Error::api(format!("releasing floating IP {}", id), e))?;
        complete(ctx, data, ticket).await?;
        tracing::info!("Released floating IP {}", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for FloatingIpResource {
    fn type_name(&self) -> &str {
        "cloud_floating_ip"
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
            schema: Self::floating_ip_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(version) = request
            .config
            .get_string(&AttributePath::new("ip_version"))
        {
            if let Err(e) = IpVersion::from_name(&version) {
                diagnostics.push(
                    Diagnostic::error("Invalid IP version", e.to_string())
                        .with_attribute(AttributePath::new("ip_version")),
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
        let result = self.create_floating_ip(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "floating IP")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_floating_ip(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "floating IP")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = self.update_floating_ip(&ctx, data, &request).await;
        update_response(result, request.prior_state, "floating IP")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self.release(&ctx, data, &request.prior_state).await;
        delete_response(result, "floating IP")
    }
}

#[async_trait]
impl ResourceWithConfigure for FloatingIpResource {
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
impl ResourceWithImportState for FloatingIpResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_id(&ctx, &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{done_ticket, provider_data, value};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn allocation_sends_the_version_code() {
        let mut server = Server::new_async().await;
        let post = server
            .mock("POST", "/v1/floating-ips")
            .match_body(Matcher::Json(json!({"ip_version": 6})))
            .with_body(done_ticket("t-4", 11))
            .create_async()
            .await;
        server
            .mock("GET", "/v1/floating-ips/11")
            .with_body(r#"{"id":11,"address":"2001:db8::1","ip_version":6}"#)
            .create_async()
            .await;

        let mut resource = FloatingIpResource::new();
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(provider_data(&server.url()))),
                },
            )
            .await;

        let config = value(json!({"ip_version": "ipv6"}));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "cloud_floating_ip".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.new_state;
        assert_eq!(
            state.get_string(&AttributePath::new("address")).unwrap(),
            "2001:db8::1"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("ip_version")).unwrap(),
            "ipv6"
        );
        assert!(state
            .get_string(&AttributePath::new("instance_id"))
            .unwrap_err()
            .is_missing());
        post.assert_async().await;
    }

    #[tokio::test]
    async fn validate_flags_unknown_versions() {
        let response = FloatingIpResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "cloud_floating_ip".to_string(),
                    config: value(json!({"ip_version": "ipv5"})),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
    }
}
