//! Block storage disk resource

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
    reject_replacements, required_string, required_u64, state_id, state_of, update_response,
    CreateResult, CREATE_TIMEOUT, DELETE_TIMEOUT, UPDATE_TIMEOUT,
};
use crate::api::dictionary::DiskType;
use crate::api::disks::{CreateDiskRequest, UpdateDiskRequest};
use crate::data_sources::compute::Disks;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

#[derive(Default)]
pub struct DiskResource {
    provider_data: Option<CloudProviderData>,
}

impl DiskResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn disk_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a block storage disk")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Disk identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Disk name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Size in GiB; disks can grow but not shrink")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_type", AttributeType::String)
                    .description("Storage class: hdd, ssd or nvme")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("Instance the disk is attached to")
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

    async fn create_disk(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let disk_type = DiskType::from_name(&required_string(config, "disk_type")?)
            .map_err(|e| Error::Config(e.to_string()))?;
        let request = CreateDiskRequest {
            name: required_string(config, "name")?,
            size: required_u64(config, "size")?,
            disk_type,
        };

        let ticket = data
            .compute
            .disks()
            .create(&request)
            .await
            .map_err(|e| Error::api("creating disk", e))?;
        let id = complete(ctx, data, ticket).await?.object_id()?;
        tracing::info!("Created disk {} ({})", request.name, id);

        created(id, self.read_disk(data, id)).await
    }

    async fn read_disk(&self, data: &CloudProviderData, id: u64) -> Result<DynamicValue> {
        let disk = data
            .compute
            .disks()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading disk {}", id), e))?;
        state_of(&Disks, &disk)
    }

    async fn update_disk(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue> {
        reject_replacements(
            &Self::disk_schema(),
            &request.prior_state,
            &request.planned_state,
        )?;
        let id = state_id(&request.prior_state)?;
        let name = required_string(&request.config, "name")?;
        let size = required_u64(&request.config, "size")?;

        let prior_size = required_u64(&request.prior_state, "size")?;
        if size < prior_size {
            return Err(Error::Config(format!(
                "disk {} cannot shrink from {} to {} GiB",
                id, prior_size, size
            )));
        }

        let ticket = data
            .compute
            .disks()
            .update(id, &UpdateDiskRequest { name, size })
            .await
            .map_err(|e| Error::api(format!("updating disk {}", id), e))?;
        complete(ctx, data, ticket).await?;

        self.read_disk(data, id).await
    }

    async fn delete_disk(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let id = state_id(state)?;
        let ticket = data
            .compute
            .disks()
            .delete(id)
            .await
            .map_err(|e| Error::api(format!("deleting disk {}", id), e))?;
        complete(ctx, data, ticket).await?;
        tracing::info!("Deleted disk {}", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for DiskResource {
    fn type_name(&self) -> &str {
        "cloud_disk"
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
            schema: Self::disk_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(disk_type) = request
            .config
            .get_string(&AttributePath::new("disk_type"))
        {
            if let Err(e) = DiskType::from_name(&disk_type) {
                diagnostics.push(
                    Diagnostic::error("Invalid disk type", e.to_string())
                        .with_attribute(AttributePath::new("disk_type")),
                );
            }
        }

        if let Ok(size) = request.config.get_number(&AttributePath::new("size")) {
            if size < 1.0 || size.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid disk size",
                        format!("size must be a whole number of GiB, got {}", size),
                    )
                    .with_attribute(AttributePath::new("size")),
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
        let result = self.create_disk(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "disk")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => self.read_disk(data, id).await,
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "disk")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = self.update_disk(&ctx, data, &request).await;
        update_response(result, request.prior_state, "disk")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self.delete_disk(&ctx, data, &request.prior_state).await;
        delete_response(result, "disk")
    }
}

#[async_trait]
impl ResourceWithConfigure for DiskResource {
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
impl ResourceWithImportState for DiskResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_id(&ctx, &request)
    }
}
