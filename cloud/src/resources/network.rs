//! Private network resource

use async_trait::async_trait;
use std::net::IpAddr;
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
    read_response, reject_replacements, required_string, state_id, state_of, update_response,
    CreateResult, CREATE_TIMEOUT, DELETE_TIMEOUT, UPDATE_TIMEOUT,
};
use crate::api::networks::{CreateNetworkRequest, UpdateNetworkRequest};
use crate::data_sources::compute::Networks;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

/// Checks `address/prefix` notation
fn check_cidr(cidr: &str) -> std::result::Result<(), String> {
    let (address, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("'{}' is missing a prefix length", cidr))?;
    let address: IpAddr = address
        .parse()
        .map_err(|_| format!("'{}' is not an IP address", address))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|_| format!("'{}' is not a prefix length", prefix))?;
    let max = if address.is_ipv4() { 32 } else { 128 };
    if prefix > max {
        return Err(format!("prefix /{} is longer than {} bits", prefix, max));
    }
    Ok(())
}

#[derive(Default)]
pub struct NetworkResource {
    provider_data: Option<CloudProviderData>,
}

impl NetworkResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn network_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a private network")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Network identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Network name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cidr", AttributeType::String)
                    .description("Address range, e.g. 10.0.0.0/24")
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
                AttributeBuilder::new("gateway", AttributeType::String)
                    .description("Gateway address assigned by the platform")
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

    async fn create_network(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let request = CreateNetworkRequest {
            name: required_string(config, "name")?,
            cidr: required_string(config, "cidr")?,
            description: optional_string(config, "description")?,
        };

        let ticket = data
            .compute
            .networks()
            .create(&request)
            .await
            .map_err(|e| Error::api("creating network", e))?;
        let id = complete(ctx, data, ticket).await?.object_id()?;
        tracing::info!("Created network {} ({})", request.name, id);

        created(id, self.read_network(data, id)).await
    }

    async fn read_network(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let network = data
            .compute
            .networks()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading network {}", id), e))?;
        state_of(&Networks, &network)
    }

    async fn update_network(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue> {
        reject_replacements(
            &Self::network_schema(),
            &request.prior_state,
            &request.planned_state,
        )?;
        let id = state_id(&request.prior_state)?;
        let update = UpdateNetworkRequest {
            name: required_string(&request.config, "name")?,
            description: optional_string(&request.config, "description")?,
        };

        let ticket = data
            .compute
            .networks()
            .update(id, &update)
            .await
            .map_err(|e| Error::api(format!("updating network {}", id), e))?;
        complete(ctx, data, ticket).await?;

        self.read_network(data, id).await
    }

    async fn delete_network(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let id = state_id(state)?;
        let ticket = data
            .compute
            .networks()
            .delete(id)
            .await
            .map_err(|e| Error::api(format!("deleting network {}", id), e))?;
        complete(ctx, data, ticket).await?;
        tracing::info!("Deleted network {}", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for NetworkResource {
    fn type_name(&self) -> &str {
        "cloud_network"
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
            schema: Self::network_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(cidr) = request.config.get_string(&AttributePath::new("cidr")) {
            if let Err(reason) = check_cidr(&cidr) {
                diagnostics.push(
                    Diagnostic::error("Invalid CIDR", reason)
                        .with_attribute(AttributePath::new("cidr")),
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
        let result = self.create_network(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "network")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_network(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "network")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = self.update_network(&ctx, data, &request).await;
        update_response(result, request.prior_state, "network")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self.delete_network(&ctx, data, &request.prior_state).await;
        delete_response(result, "network")
    }
}

#[async_trait]
impl ResourceWithConfigure for NetworkResource {
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
impl ResourceWithImportState for NetworkResource {
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

    #[test]
    fn cidr_notation() {
        assert!(check_cidr("10.0.0.0/24").is_ok());
        assert!(check_cidr("fd00::/64").is_ok());
        assert!(check_cidr("10.0.0.0").is_err());
        assert!(check_cidr("10.0.0.0/33").is_err());
        assert!(check_cidr("ten/8").is_err());
    }

    #[tokio::test]
    async fn update_renames_in_place() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/v1/networks/3")
            .match_body(Matcher::Json(
                json!({"name": "backend", "description": null}),
            ))
            .with_body(done_ticket("t-9", 3))
            .create_async()
            .await;
        server
            .mock("GET", "/v1/networks/3")
            .with_body(r#"{"id":3,"name":"backend","cidr":"10.0.0.0/24","gateway":"10.0.0.1"}"#)
            .create_async()
            .await;

        let mut resource = NetworkResource::new();
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(provider_data(&server.url()))),
                },
            )
            .await;

        let prior = value(json!({"id": "3", "name": "frontend", "cidr": "10.0.0.0/24"}));
        let planned = value(json!({"id": "3", "name": "backend", "cidr": "10.0.0.0/24"}));
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "cloud_network".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("gateway"))
                .unwrap(),
            "10.0.0.1"
        );
        put.assert_async().await;
    }

    #[tokio::test]
    async fn validate_flags_bad_cidr() {
        let response = NetworkResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "cloud_network".to_string(),
                    config: value(json!({"name": "n", "cidr": "10.0.0.0/40"})),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Invalid CIDR");
    }
}
