//! Provider trait and factory helpers
//!
//! A provider is configured once, then hands out fresh resource and data
//! source instances through factories. Each instance is configured with the
//! provider data produced by [`Provider::configure`] before use.

use crate::context::Context;
use crate::data_source::{ConfigureDataSourceRequest, DataSourceWithConfigure};
use crate::error::{Result, TfplugError};
use crate::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

pub type ResourceFactory = fn() -> Box<dyn ResourceWithConfigure>;
pub type DataSourceFactory = fn() -> Box<dyn DataSourceWithConfigure>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name, the prefix of every resource type name
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Called once with the provider block. On success the returned
    /// provider_data is passed to every resource and data source.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    fn resources(&self) -> HashMap<String, ResourceFactory>;

    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub resources: Vec<String>,
    pub data_sources: Vec<String>,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

fn first_error(diagnostics: &[Diagnostic]) -> Option<TfplugError> {
    diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(|d| TfplugError::InvalidConfiguration(format!("{}: {}", d.summary, d.detail)))
}

/// Builds and configures the named resource
pub async fn instantiate_resource(
    ctx: Context,
    factories: &HashMap<String, ResourceFactory>,
    name: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Box<dyn ResourceWithConfigure>> {
    let factory = factories
        .get(name)
        .ok_or_else(|| TfplugError::ResourceNotFound(name.to_string()))?;

    tracing::debug!("Instantiating resource {}", name);
    let mut resource = factory();
    let response = resource
        .configure(ctx, ConfigureResourceRequest { provider_data })
        .await;

    match first_error(&response.diagnostics) {
        Some(err) => Err(err),
        None => Ok(resource),
    }
}

/// Builds and configures the named data source
pub async fn instantiate_data_source(
    ctx: Context,
    factories: &HashMap<String, DataSourceFactory>,
    name: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Result<Box<dyn DataSourceWithConfigure>> {
    let factory = factories
        .get(name)
        .ok_or_else(|| TfplugError::DataSourceNotFound(name.to_string()))?;

    tracing::debug!("Instantiating data source {}", name);
    let mut data_source = factory();
    let response = data_source
        .configure(ctx, ConfigureDataSourceRequest { provider_data })
        .await;

    match first_error(&response.diagnostics) {
        Some(err) => Err(err),
        None => Ok(data_source),
    }
}
