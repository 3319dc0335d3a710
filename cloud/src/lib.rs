//! Terraform provider for the cloud compute and managed Kubernetes APIs

pub mod api;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod provider_data;
pub mod reconciler;
pub mod resources;
pub mod values;

pub use error::{Error, Result};
pub use provider_data::CloudProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::{DataSourceFactory, Provider, ResourceFactory, ResourceWithConfigure};

pub const ENDPOINT_ENV: &str = "CLOUD_ENDPOINT";
pub const KUBERNETES_ENDPOINT_ENV: &str = "CLOUD_KUBERNETES_ENDPOINT";
pub const TOKEN_ENV: &str = "CLOUD_TOKEN";
pub const INSECURE_ENV: &str = "CLOUD_INSECURE";

/// Attribute value, or the environment variable when unset or empty
fn string_setting(config: &DynamicValue, name: &str, env: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|s| !s.is_empty()))
}

fn bool_setting(config: &DynamicValue, name: &str, env: &str) -> bool {
    config
        .get_bool(&AttributePath::new(name))
        .ok()
        .or_else(|| {
            std::env::var(env)
                .ok()
                .and_then(|v| v.trim().to_ascii_lowercase().parse::<bool>().ok())
        })
        .unwrap_or(false)
}

fn instance_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::InstanceResource::new())
}

fn disk_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::DiskResource::new())
}

fn network_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::NetworkResource::new())
}

fn floating_ip_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::FloatingIpResource::new())
}

fn group_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::GroupResource::new())
}

fn load_balancer_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::LoadBalancerResource::new())
}

fn ssh_key_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::SshKeyResource::new())
}

fn kubernetes_cluster_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::KubernetesClusterResource::new())
}

fn kubernetes_node_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(resources::KubernetesNodeResource::new())
}

pub struct CloudProvider {
    provider_data: Option<CloudProviderData>,
}

impl Default for CloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    fn build_provider_data(
        &self,
        config: &DynamicValue,
    ) -> std::result::Result<CloudProviderData, Diagnostic> {
        let endpoint = string_setting(config, "endpoint", ENDPOINT_ENV).ok_or_else(|| {
            Diagnostic::error(
                "endpoint is required",
                format!("Set endpoint in the provider block or the {} environment variable", ENDPOINT_ENV),
            )
            .with_attribute(AttributePath::new("endpoint"))
        })?;
        let token = string_setting(config, "token", TOKEN_ENV).ok_or_else(|| {
            Diagnostic::error(
                "token is required",
                format!("Set token in the provider block or the {} environment variable", TOKEN_ENV),
            )
            .with_attribute(AttributePath::new("token"))
        })?;
        let kubernetes_endpoint =
            string_setting(config, "kubernetes_endpoint", KUBERNETES_ENDPOINT_ENV)
                .unwrap_or_else(|| endpoint.clone());
        let insecure = bool_setting(config, "insecure", INSECURE_ENV);

        let client_error = |attribute: &str, e: api::ApiError| {
            Diagnostic::error("Failed to create API client", e.to_string())
                .with_attribute(AttributePath::new(attribute))
        };
        let compute = api::Client::new(&endpoint, &token, insecure)
            .map_err(|e| client_error("endpoint", e))?;
        let kubernetes = api::Client::new(&kubernetes_endpoint, &token, insecure)
            .map_err(|e| client_error("kubernetes_endpoint", e))?;

        tracing::info!(
            "Configured cloud provider for {} (kubernetes: {}, insecure: {})",
            endpoint,
            kubernetes_endpoint,
            insecure
        );
        Ok(CloudProviderData::new(compute, kubernetes))
    }
}

#[async_trait]
impl Provider for CloudProvider {
    fn type_name(&self) -> &str {
        "cloud"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            resources: self.resources().into_keys().collect(),
            data_sources: self.data_sources().into_keys().collect(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Provider for the cloud compute and managed Kubernetes platform")
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Compute API base URL. Falls back to CLOUD_ENDPOINT.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("kubernetes_endpoint", AttributeType::String)
                    .description(
                        "Managed Kubernetes API base URL. Falls back to \
                         CLOUD_KUBERNETES_ENDPOINT, then to endpoint.",
                    )
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("API token. Falls back to CLOUD_TOKEN.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Accept invalid TLS certificates. Falls back to CLOUD_INSECURE.")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();

        match self.build_provider_data(&request.config) {
            Ok(data) => {
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(diag) => ConfigureProviderResponse {
                diagnostics: vec![diag],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let factories: [(&str, ResourceFactory); 9] = [
            ("cloud_instance", instance_resource),
            ("cloud_disk", disk_resource),
            ("cloud_network", network_resource),
            ("cloud_floating_ip", floating_ip_resource),
            ("cloud_group", group_resource),
            ("cloud_load_balancer", load_balancer_resource),
            ("cloud_ssh_key", ssh_key_resource),
            ("cloud_kubernetes_cluster", kubernetes_cluster_resource),
            ("cloud_kubernetes_node", kubernetes_node_resource),
        ];
        factories
            .into_iter()
            .map(|(name, factory)| (name.to_string(), factory))
            .collect()
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let factories: [(&str, DataSourceFactory); 19] = [
            ("cloud_instances", data_sources::instances),
            ("cloud_instance", data_sources::instance),
            ("cloud_disks", data_sources::disks),
            ("cloud_disk", data_sources::disk),
            ("cloud_networks", data_sources::networks),
            ("cloud_network", data_sources::network),
            ("cloud_floating_ips", data_sources::floating_ips),
            ("cloud_floating_ip", data_sources::floating_ip),
            ("cloud_groups", data_sources::groups),
            ("cloud_group", data_sources::group),
            ("cloud_load_balancers", data_sources::load_balancers),
            ("cloud_load_balancer", data_sources::load_balancer),
            ("cloud_ssh_keys", data_sources::ssh_keys),
            ("cloud_ssh_key", data_sources::ssh_key),
            ("cloud_images", data_sources::images),
            ("cloud_image", data_sources::image),
            ("cloud_kubernetes_clusters", data_sources::kubernetes_clusters),
            ("cloud_kubernetes_cluster", data_sources::kubernetes_cluster),
            ("cloud_kubernetes_nodes", data_sources::kubernetes_nodes),
        ];
        factories
            .into_iter()
            .map(|(name, factory)| (name.to_string(), factory))
            .collect()
    }
}
