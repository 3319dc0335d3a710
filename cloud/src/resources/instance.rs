//! Virtual instance resource
//!
//! Besides the instance itself this resource owns three attachment sets
//! (floating IPs, private networks, disks) and the power state. Each
//! attachment change and each power transition is its own ticket.

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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::attachments::AttachmentDiff;
use super::{
    complete, create_response, created, delete_response, id_set, import_by_id, optional_bool,
    optional_id, read_response, reject_replacements, required_id, required_string,
    required_u32, state_id, update_response, CreateResult, CREATE_TIMEOUT, DELETE_TIMEOUT,
    UPDATE_TIMEOUT,
};
use crate::api::dictionary::InstanceState;
use crate::api::instances::{Attachment, CreateInstanceRequest, Instance, UpdateInstanceRequest};
use crate::data_sources::compute::Instances;
use crate::data_sources::RecordMapper;
use crate::error::{Error, Result};
use crate::provider_data::{not_configured, CloudProviderData};

const MIN_RAM_MIB: f64 = 256.0;

/// Attachment kinds with the set attribute that holds them
const ATTACHMENTS: [(Attachment, &str); 3] = [
    (Attachment::FloatingIp, "floating_ip_ids"),
    (Attachment::Network, "network_ids"),
    (Attachment::Disk, "disk_ids"),
];

fn attached(instance: &Instance, kind: Attachment) -> &[u64] {
    match kind {
        Attachment::FloatingIp => &instance.floating_ip_ids,
        Attachment::Network => &instance.network_ids,
        Attachment::Disk => &instance.disk_ids,
    }
}

fn instance_state(instance: &Instance) -> Result<DynamicValue> {
    let mut record = Instances.to_record(instance)?;
    record.insert(
        "running".to_string(),
        Dynamic::Bool(instance.state == InstanceState::Running),
    );
    Ok(DynamicValue::new(Dynamic::Map(record)))
}

fn id_set_attribute(name: &str, description: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::Set(Box::new(AttributeType::String)))
        .description(description)
        .optional()
        .build()
}

#[derive(Default)]
pub struct InstanceResource {
    provider_data: Option<CloudProviderData>,
}

impl InstanceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn instance_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Manages a virtual instance and its attachments")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Instance identifier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Instance name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("image_id", AttributeType::String)
                    .description("Image to build the instance from")
                    .required()
                    .requires_replace()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("image_name", AttributeType::String)
                    .description("Name of the image")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cpu", AttributeType::Number)
                    .description("Number of vCPUs")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ram", AttributeType::Number)
                    .description("Memory in MiB")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_id", AttributeType::String)
                    .description("Group the instance belongs to")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "ssh_key_ids",
                    AttributeType::Set(Box::new(AttributeType::String)),
                )
                .description("SSH keys installed at creation")
                .optional()
                .requires_replace()
                .build(),
            )
            .attribute(id_set_attribute("floating_ip_ids", "Attached floating IPs"))
            .attribute(id_set_attribute("network_ids", "Attached private networks"))
            .attribute(id_set_attribute("disk_ids", "Attached disks"))
            .attribute(
                AttributeBuilder::new("running", AttributeType::Bool)
                    .description("Whether the instance should be powered on (default true)")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("state", AttributeType::String)
                    .description("Lifecycle state")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ipv4", AttributeType::String)
                    .description("Primary IPv4 address")
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

    async fn sync_attachments(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        id: u64,
        kind: Attachment,
        desired: &[u64],
        current: &[u64],
    ) -> Result<()> {
        let api = data.compute.instances();
        let diff = AttachmentDiff::between(desired, current);
        if diff.is_empty() {
            return Ok(());
        }

        for object_id in diff.to_detach {
            tracing::debug!("Detaching {:?} {} from instance {}", kind, object_id, id);
            let ticket = api.detach(id, kind, object_id).await.map_err(|e| {
                Error::api(
                    format!("detaching {:?} {} from instance {}", kind, object_id, id),
                    e,
                )
            })?;
            complete(ctx, data, ticket).await?;
        }

        for object_id in diff.to_attach {
            tracing::debug!("Attaching {:?} {} to instance {}", kind, object_id, id);
            let ticket = api.attach(id, kind, object_id).await.map_err(|e| {
                Error::api(
                    format!("attaching {:?} {} to instance {}", kind, object_id, id),
                    e,
                )
            })?;
            complete(ctx, data, ticket).await?;
        }

        Ok(())
    }

    async fn set_power(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        id: u64,
        running: bool,
    ) -> Result<()> {
        let api = data.compute.instances();
        let ticket = if running {
            api.start(id).await
        } else {
            api.stop(id).await
        }
        .map_err(|e| {
            let action = if running { "starting" } else { "stopping" };
            Error::api(format!("{} instance {}", action, id), e)
        })?;
        complete(ctx, data, ticket).await?;
        tracing::info!(
            "Instance {} is now {}",
            id,
            if running { "running" } else { "stopped" }
        );
        Ok(())
    }

    async fn fetch(&self, data: &CloudProviderData, id: u64) -> Result<Instance> {
        data.compute
            .instances()
            .get(id)
            .await
            .map_err(|e| Error::api(format!("reading instance {}", id), e))
    }

    async fn create_instance(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> CreateResult {
        let request = CreateInstanceRequest {
            name: required_string(config, "name")?,
            image_id: required_id(config, "image_id")?,
            cpu: required_u32(config, "cpu")?,
            ram: required_u32(config, "ram")?,
            group_id: optional_id(config, "group_id")?,
            ssh_key_ids: id_set(config, "ssh_key_ids")?,
        };

        let ticket = data
            .compute
            .instances()
            .create(&request)
            .await
            .map_err(|e| Error::api("creating instance", e))?;
        let id = complete(ctx, data, ticket).await?.object_id()?;
        tracing::info!("Created instance {} ({})", request.name, id);

        created(id, async {
            for (kind, attribute) in ATTACHMENTS {
                let desired = id_set(config, attribute)?;
                self.sync_attachments(ctx, data, id, kind, &desired, &[])
                    .await?;
            }

            if optional_bool(config, "running")? == Some(false) {
                self.set_power(ctx, data, id, false).await?;
            }

            instance_state(&self.fetch(data, id).await?)
        })
        .await
    }

    async fn update_instance(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        request: &UpdateResourceRequest,
    ) -> Result<DynamicValue> {
        reject_replacements(
            &Self::instance_schema(),
            &request.prior_state,
            &request.planned_state,
        )?;
        let id = state_id(&request.prior_state)?;
        let config = &request.config;
        let current = self.fetch(data, id).await?;

        let update = UpdateInstanceRequest {
            name: required_string(config, "name")?,
            cpu: required_u32(config, "cpu")?,
            ram: required_u32(config, "ram")?,
            group_id: optional_id(config, "group_id")?,
        };
        let settings_changed = update.name != current.name
            || update.cpu != current.cpu
            || update.ram != current.ram
            || update.group_id != current.group_id;
        if settings_changed {
            let ticket = data
                .compute
                .instances()
                .update(id, &update)
                .await
                .map_err(|e| Error::api(format!("updating instance {}", id), e))?;
            complete(ctx, data, ticket).await?;
        }

        for (kind, attribute) in ATTACHMENTS {
            let desired = id_set(config, attribute)?;
            self.sync_attachments(ctx, data, id, kind, &desired, attached(&current, kind))
                .await?;
        }

        let is_running = current.state == InstanceState::Running;
        if let Some(running) = optional_bool(config, "running")? {
            if running != is_running {
                self.set_power(ctx, data, id, running).await?;
            }
        }

        instance_state(&self.fetch(data, id).await?)
    }

    async fn delete_instance(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        state: &DynamicValue,
    ) -> Result<()> {
        let id = state_id(state)?;
        let ticket = data
            .compute
            .instances()
            .delete(id)
            .await
            .map_err(|e| Error::api(format!("deleting instance {}", id), e))?;
        complete(ctx, data, ticket).await?;
        tracing::info!("Deleted instance {}", id);
        Ok(())
    }
}

#[async_trait]
impl Resource for InstanceResource {
    fn type_name(&self) -> &str {
        "cloud_instance"
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
            schema: Self::instance_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let config = &request.config;

        if let Ok(cpu) = config.get_number(&AttributePath::new("cpu")) {
            if cpu < 1.0 || cpu.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid CPU count",
                        format!("cpu must be a positive whole number, got {}", cpu),
                    )
                    .with_attribute(AttributePath::new("cpu")),
                );
            }
        }

        if let Ok(ram) = config.get_number(&AttributePath::new("ram")) {
            if ram < MIN_RAM_MIB || ram.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid memory size",
                        format!("ram must be at least {} MiB, got {}", MIN_RAM_MIB, ram),
                    )
                    .with_attribute(AttributePath::new("ram")),
                );
            }
        }

        for attribute in ["image_id", "group_id"] {
            if let Ok(raw) = config.get_string(&AttributePath::new(attribute)) {
                if raw.parse::<u64>().is_err() {
                    diagnostics.push(
                        Diagnostic::error("Invalid id", format!("'{}' is not a numeric id", raw))
                            .with_attribute(AttributePath::new(attribute)),
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
        let result = self.create_instance(&ctx, data, &request.config).await;
        create_response(result, request.planned_state, "instance")
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
            };
        };

        let result = match state_id(&request.current_state) {
            Ok(id) => match self.fetch(data, id).await {
                Ok(instance) => instance_state(&instance),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        read_response(result, request.current_state, "instance")
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(UPDATE_TIMEOUT);
        let result = self.update_instance(&ctx, data, &request).await;
        update_response(result, request.prior_state, "instance")
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let ctx = ctx.with_timeout(DELETE_TIMEOUT);
        let result = self.delete_instance(&ctx, data, &request.prior_state).await;
        delete_response(result, "instance")
    }
}

#[async_trait]
impl ResourceWithConfigure for InstanceResource {
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
impl ResourceWithImportState for InstanceResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_by_id(&ctx, &request)
    }
}

#[cfg(test)]
#[path = "./instance_test.rs"]
mod instance_test;
