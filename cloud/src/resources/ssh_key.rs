//! SSH key resource. Keys are immutable on the platform, so every
//! configurable attribute forces replacement.

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
    complete, create_response, created, delete_response, import_by_id, read_response,
    reject_replacements, required_string, state_id, state_of, update_response,
    CREATE_TIMEOUT, DELETE_TIMEOUT,
};
use crate::api::ssh_keys::CreateSshKeyRequest;
use crate::data_sources::compute::SshKeys;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

const KEY_TYPES: [&str; 6] = [
    "ssh-rsa",
    "ssh-ed25519",
    "ssh-dss",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];

fn is_openssh_key(key: &str) -> bool {
    let mut parts = key.split_whitespace();
    matches!(
        (parts.next(), parts.next()),
        (Some(kind), Some(_)) if KEY_TYPES.contains(&kind)
    )
}

#[derive(Default)]
pub struct SshKeyResource {
    provider_data: Option<CloudProviderData>,
}

impl SshKeyResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn ssh_key_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages an SSH public key that can be installed on instances")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("SSH key identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Key name")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_key", AttributeType::String)
                    .description("Public key in OpenSSH format")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fingerprint", AttributeType::String)
                    .description("Key fingerprint")
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

    async fn read_key(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let key = data
            .compute
            .ssh_keys()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading SSH key {}", id), e))?;
        state_of(&SshKeys, &key)
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    fn type_name(&self) -> &str {
        "cloud_ssh_key"
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
            schema: Self::ssh_key_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(key) = request
            .config
            .get_string(&AttributePath::new("public_key"))
        {
            if !is_openssh_key(&key) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid public key",
                        format!(
                            "public_key must start with one of {}",
                            KEY_TYPES.join(", ")
                        ),
                    )
                    .with_attribute(AttributePath::new("public_key")),
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
        let result = async {
            let body = CreateSshKeyRequest {
                name: required_string(&request.config, "name")?,
                public_key: required_string(&request.config, "public_key")?,
            };
            let ticket = data
                .compute
                .ssh_keys()
                .create(&body)
                .await
                .map_err(|e| Error::api("uploading SSH key", e))?;
            let id = complete(&ctx, data, ticket).await?.object_id()?;
            tracing::info!("Uploaded SSH key {} ({})", body.name, id);
            created(id, self.read_key(data, id)).await
        }
        .await;

        create_response(result, request.planned_state, "SSH key")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_key(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "SSH key")
    }

    /// Nothing can change in place; a plan that reaches here only refreshes
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let result = async {
            reject_replacements(
                &Self::ssh_key_schema(),
                &request.prior_state,
                &request.planned_state,
            )?;
            self.read_key(data, state_id(&request.prior_state)?).await
        }
        .await;

        update_response(result, request.prior_state, "SSH key")
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
                .ssh_keys()
                .delete(id)
                .await
                .map_err(|e| Error::api(format!("deleting SSH key {}", id), e))?;
            complete(&ctx, data, ticket).await?;
            Ok::<_, Error>(())
        }
        .await;

        delete_response(result, "SSH key")
    }
}

#[async_trait]
impl ResourceWithConfigure for SshKeyResource {
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
impl ResourceWithImportState for SshKeyResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_id(&ctx, &request)
    }
}
