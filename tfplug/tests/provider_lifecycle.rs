use async_trait::async_trait;
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::provider::{
    instantiate_data_source, instantiate_resource, ConfigureProviderRequest,
    ConfigureProviderResponse, ProviderMetadataRequest, ProviderMetadataResponse,
    ProviderSchemaRequest, ProviderSchemaResponse,
};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::types::Diagnostic;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, DataSourceFactory, DynamicValue, Provider,
    Resource, ResourceFactory, SchemaBuilder, TfplugError,
};

#[derive(Clone)]
struct Greeting(String);

struct TestProvider;

#[async_trait]
impl Provider for TestProvider {
    fn type_name(&self) -> &str {
        "test"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "test".to_string(),
            resources: self.resources().into_keys().collect(),
            data_sources: self.data_sources().into_keys().collect(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("greeting", AttributeType::String)
                        .required()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        match request.config.get_string(&AttributePath::new("greeting")) {
            Ok(greeting) => ConfigureProviderResponse {
                diagnostics: vec![],
                provider_data: Some(Arc::new(Greeting(greeting))),
            },
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error("greeting is required", e.to_string())],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert("test_echo".to_string(), echo_resource);
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert("test_greeting".to_string(), greeting_data_source);
        factories
    }
}

fn echo_resource() -> Box<dyn tfplug::ResourceWithConfigure> {
    Box::new(EchoResource::default())
}

fn greeting_data_source() -> Box<dyn DataSourceWithConfigure> {
    Box::new(GreetingDataSource::default())
}

fn downcast(data: Option<Arc<dyn Any + Send + Sync>>) -> Option<Greeting> {
    data.and_then(|d| d.downcast_ref::<Greeting>().cloned())
}

#[derive(Default)]
struct EchoResource {
    greeting: Option<Greeting>,
}

#[async_trait]
impl Resource for EchoResource {
    fn type_name(&self) -> &str {
        "test_echo"
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

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: SchemaBuilder::new().build(),
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

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut state = request.planned_state;
        let greeting = self.greeting.clone().map(|g| g.0).unwrap_or_default();
        state
            .set_string(&AttributePath::new("message"), greeting)
            .unwrap();
        CreateResourceResponse {
            new_state: state,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl tfplug::ResourceWithConfigure for EchoResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        self.greeting = downcast(request.provider_data);
        let diagnostics = if self.greeting.is_none() {
            vec![Diagnostic::error("No provider data", "missing greeting")]
        } else {
            vec![]
        };
        ConfigureResourceResponse { diagnostics }
    }
}

#[derive(Default)]
struct GreetingDataSource {
    greeting: Option<Greeting>,
}

#[async_trait]
impl DataSource for GreetingDataSource {
    fn type_name(&self) -> &str {
        "test_greeting"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: SchemaBuilder::new().build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut state = DynamicValue::object();
        if let Some(greeting) = &self.greeting {
            state
                .set_string(&AttributePath::new("message"), greeting.0.clone())
                .unwrap();
        }
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for GreetingDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        self.greeting = downcast(request.provider_data);
        ConfigureDataSourceResponse {
            diagnostics: vec![],
        }
    }
}

async fn configured_provider_data() -> Option<Arc<dyn Any + Send + Sync>> {
    let mut provider = TestProvider;
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                config: DynamicValue::from_json(json!({ "greeting": "hello" })),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    response.provider_data
}

#[tokio::test]
async fn provider_data_flows_into_resources() {
    let provider = TestProvider;
    let data = configured_provider_data().await;

    let resource = tokio_test::assert_ok!(
        instantiate_resource(Context::new(), &provider.resources(), "test_echo", data).await
    );

    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "test_echo".to_string(),
                planned_state: DynamicValue::object(),
                config: DynamicValue::object(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("message"))
            .unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn provider_data_flows_into_data_sources() {
    let provider = TestProvider;
    let data = configured_provider_data().await;

    let data_source = tokio_test::assert_ok!(
        instantiate_data_source(Context::new(), &provider.data_sources(), "test_greeting", data)
            .await
    );

    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "test_greeting".to_string(),
                config: DynamicValue::object(),
            },
        )
        .await;

    assert_eq!(
        response.state.get_string(&AttributePath::new("message")).unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn unknown_type_names_are_rejected() {
    let provider = TestProvider;

    let err = instantiate_resource(Context::new(), &provider.resources(), "test_nope", None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TfplugError::ResourceNotFound(name) if name == "test_nope"));

    let err = instantiate_data_source(Context::new(), &provider.data_sources(), "test_nope", None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, TfplugError::DataSourceNotFound(_)));
}

#[tokio::test]
async fn configure_errors_surface_from_instantiation() {
    let provider = TestProvider;

    let err = instantiate_resource(Context::new(), &provider.resources(), "test_echo", None)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, TfplugError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn provider_configure_reports_missing_greeting() {
    let mut provider = TestProvider;
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                config: DynamicValue::object(),
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.provider_data.is_none());
}

#[tokio::test]
async fn metadata_lists_registered_types() {
    let provider = TestProvider;
    let metadata = provider
        .metadata(Context::new(), ProviderMetadataRequest)
        .await;

    assert_eq!(metadata.type_name, "test");
    assert_eq!(metadata.resources, vec!["test_echo".to_string()]);
    assert_eq!(metadata.data_sources, vec!["test_greeting".to_string()]);
}
