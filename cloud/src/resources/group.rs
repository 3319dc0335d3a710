//! Instance group resource

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
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::DynamicValue;

use super::{
    complete, create_response, created, delete_response, import_by_id, optional_string,
    read_response, required_string, state_id, state_of, update_response,
    CREATE_TIMEOUT, DELETE_TIMEOUT, UPDATE_TIMEOUT,
};
use crate::api::groups::GroupRequest;
use crate::data_sources::compute::Groups;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

fn group_request(config: &DynamicValue) -> Result<GroupRequest> {
    Ok(GroupRequest {
        name: required_string(config, "name")?,
        description: optional_string(config, "description")?,
    })
}

#[derive(Default)]
pub struct GroupResource {
    provider_data: Option<CloudProviderData>,
}

impl GroupResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_group(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let group = data
            .compute
            .groups()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading group {}", id), e))?;
        state_of(&Groups, &group)
    }
}

#[async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &str {
        "cloud_group"
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
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an instance group")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Group identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Group name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Free-form description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created", AttributeType::String)
                    .description("Creation time")
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(CREATE_TIMEOUT);
        let result = async {
            let body = group_request(&request.config)?;
            let ticket = data
                .compute
                .groups()
                .create(&body)
                .await
                .map_err(|e| Error::api("creating group", e))?;
            let id = complete(&ctx, data, ticket).await?.object_id()?;
            tracing::info!("Created group {} ({})", body.name, id);
            created(id, self.read_group(data, id)).await
        }
        .await;

        create_response(result, request.planned_state, "group")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_group(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "group")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = async {
            let id = state_id(&request.prior_state)?;
            let body = group_request(&request.config)?;
            let ticket = data
                .compute
                .groups()
                .update(id, &body)
                .await
                .map_err(|e| Error::api(format!("updating group {}", id), e))?;
            complete(&ctx, data, ticket).await?;
            self.read_group(data, id).await
        }
        .await;

        update_response(result, request.prior_state, "group")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = async {
            let id = state_id(&request.prior_state)?;
            let ticket = data
                .compute
                .groups()
                .delete(id)
                .await
                .map_err(|e| Error::api(format!("deleting group {}", id), e))?;
            complete(&ctx, data, ticket).await?;
            Ok::<_, Error>(())
        }
        .await;

        delete_response(result, "group")
    }
}

#[async_trait]
impl ResourceWithConfigure for GroupResource {
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
impl ResourceWithImportState for GroupResource {
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
    use crate::resources::test_support::{done_ticket, pending_ticket, provider_data, value};
    use mockito::Server;
    use serde_json::json;
    use std::sync::Arc;
    use tfplug::types::AttributePath;

    #[tokio::test]
    async fn create_polls_a_pending_ticket() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/groups")
            .with_body(pending_ticket("t-5"))
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/v1/tickets/t-5")
            .with_body(done_ticket("t-5", 2))
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/groups/2")
            .with_body(r#"{"id":2,"name":"web","description":"frontends"}"#)
            .create_async()
            .await;

        let mut resource = GroupResource::new();
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(provider_data(&server.url()))),
                },
            )
            .await;

        let config = value(json!({"name": "web", "description": "frontends"}));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "cloud_group".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response
                .new_state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "2"
        );
        poll.assert_async().await;
    }

    #[tokio::test]
    async fn import_keeps_the_id() {
        let response = GroupResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "cloud_group".to_string(),
                    id: "2".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("id"))
                .unwrap(),
            "2"
        );
    }
}
