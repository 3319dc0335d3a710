//! Generic list and lookup data sources
//!
//! Each remote object type supplies a [`RecordMapper`] plus a
//! [`ListSource`] and/or [`LookupSource`]. [`ListDataSource`] and
//! [`LookupDataSource`] turn those adapters into complete data sources:
//! schema generation, fetching, mapping, filtering and state assembly are
//! written once here.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::filter::{apply_filters, FilterClause, Record, RecordField};
use crate::error::Result;
use crate::provider_data::{not_configured, CloudProviderData};

/// Flattens one remote object into a [`Record`]
pub trait RecordMapper: Send + Sync {
    type Item: Send + Sync;

    fn fields(&self) -> Vec<RecordField>;

    fn to_record(&self, item: &Self::Item) -> Result<Record>;
}

/// A remote collection exposed as a filterable list
#[async_trait]
pub trait ListSource: RecordMapper {
    fn type_name(&self) -> &'static str;

    /// Name of the state attribute holding the records
    fn collection(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Extra configuration attributes the fetch depends on
    fn inputs(&self) -> Vec<Attribute> {
        Vec::new()
    }

    async fn fetch_all(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> Result<Vec<Self::Item>>;
}

/// A single remote object looked up by id
#[async_trait]
pub trait LookupSource: RecordMapper {
    fn type_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn fetch_one(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<Self::Item>;
}

fn record_object_type(fields: &[RecordField]) -> AttributeType {
    AttributeType::Object(
        fields
            .iter()
            .map(|f| (f.name.to_string(), f.kind.attribute_type()))
            .collect(),
    )
}

fn record_to_dynamic(record: Record) -> Dynamic {
    Dynamic::Map(record)
}

/// Content-independent identity for a data source read
fn fresh_id() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub struct ListDataSource<S> {
    source: S,
    provider_data: Option<CloudProviderData>,
}

impl<S: ListSource> ListDataSource<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            provider_data: None,
        }
    }

    pub fn build_schema(&self) -> Schema {
        let fields = self.source.fields();

        SchemaBuilder::new()
            .version(0)
            .description(self.source.description())
            .attributes(self.source.inputs())
            .attribute(
                AttributeBuilder::new(
                    self.source.collection(),
                    AttributeType::List(Box::new(record_object_type(&fields))),
                )
                .description("Objects that passed every filter")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Timestamp of the read")
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("filter", NestingMode::Set)
                    .description("Keep only objects whose field equals one of the values")
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .description("Field to filter on")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new(
                            "values",
                            AttributeType::List(Box::new(AttributeType::String)),
                        )
                        .description("Accepted values")
                        .required()
                        .build(),
                    )
                    .build(),
            )
            .build()
    }

    /// Fetch, map, filter, then assemble state from the config
    pub async fn read_state(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let items = self.source.fetch_all(ctx, data, config).await?;

        let records = items
            .iter()
            .map(|item| self.source.to_record(item))
            .collect::<Result<Vec<_>>>()?;

        let clauses = FilterClause::from_config(config)?;
        let records = apply_filters(records, &clauses, &self.source.fields())?;

        tracing::debug!(
            "{} returned {} of {} object(s)",
            self.source.type_name(),
            records.len(),
            items.len()
        );

        let mut state = config.clone();
        let _ = state.set_list(
            &AttributePath::new(self.source.collection()),
            records.into_iter().map(record_to_dynamic).collect(),
        );
        let _ = state.set_string(&AttributePath::new("id"), fresh_id());
        Ok(state)
    }
}

#[async_trait]
impl<S: ListSource> DataSource for ListDataSource<S> {
    fn type_name(&self) -> &str {
        self.source.type_name()
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
            schema: self.build_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(clauses) = FilterClause::from_config(&request.config) {
            let fields = self.source.fields();
            for (i, clause) in clauses.iter().enumerate() {
                if !fields.iter().any(|f| f.name == clause.name) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Unknown filter field",
                            format!(
                                "'{}' is not a field of {}",
                                clause.name,
                                self.source.collection()
                            ),
                        )
                        .with_attribute(
                            AttributePath::new("filter").index(i as i64).attribute("name"),
                        ),
                    );
                }
            }
        }

        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(not_configured());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match self.read_state(&ctx, provider_data, &request.config).await {
            Ok(state) => ReadDataSourceResponse { state, diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    format!("Failed to read {}", self.source.type_name()),
                    e.to_string(),
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl<S: ListSource> DataSourceWithConfigure for ListDataSource<S> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match CloudProviderData::from_configure(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}

pub struct LookupDataSource<S> {
    source: S,
    provider_data: Option<CloudProviderData>,
}

impl<S: LookupSource> LookupDataSource<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            provider_data: None,
        }
    }

    pub fn build_schema(&self) -> Schema {
        let fields = self.source.fields();

        SchemaBuilder::new()
            .version(0)
            .description(self.source.description())
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Identifier of the object to look up")
                    .required()
                    .build(),
            )
            .attributes(fields.iter().filter(|f| f.name != "id").map(|f| {
                AttributeBuilder::new(f.name, f.kind.attribute_type())
                    .description(f.description)
                    .computed()
                    .build()
            }))
            .build()
    }

    pub async fn read_state(
        &self,
        ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id = config
            .get_string(&AttributePath::new("id"))
            .map_err(|e| crate::error::Error::Config(format!("id: {}", e)))?;

        let item = self.source.fetch_one(ctx, data, &id).await?;
        let record = self.source.to_record(&item)?;

        let mut state = config.clone();
        for (name, value) in record.into_iter().filter(|(name, _)| name != "id") {
            let _ = state.set_value(&AttributePath::new(&name), value);
        }
        Ok(state)
    }
}

#[async_trait]
impl<S: LookupSource> DataSource for LookupDataSource<S> {
    fn type_name(&self) -> &str {
        self.source.type_name()
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
            schema: self.build_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(id) = request.config.get_string(&AttributePath::new("id")) {
            if id.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error("Invalid id", "id must not be empty")
                        .with_attribute(AttributePath::new("id")),
                );
            }
        }

        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(not_configured());
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match self.read_state(&ctx, provider_data, &request.config).await {
            Ok(state) => ReadDataSourceResponse { state, diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    format!("Failed to read {}", self.source.type_name()),
                    e.to_string(),
                ));
                ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                }
            }
        }
    }
}

#[async_trait]
impl<S: LookupSource> DataSourceWithConfigure for LookupDataSource<S> {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        match CloudProviderData::from_configure(request.provider_data) {
            Ok(data) => self.provider_data = Some(data),
            Err(diag) => diagnostics.push(diag),
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use crate::error::Error;
    use std::collections::HashMap;

    /// Five fixed items; the one without a zone cannot be mapped
    struct Fixture {
        items: Vec<(u64, Option<&'static str>)>,
    }

    impl RecordMapper for Fixture {
        type Item = (u64, Option<&'static str>);

        fn fields(&self) -> Vec<RecordField> {
            vec![
                RecordField::string("id", "Identifier"),
                RecordField::string("zone", "Zone"),
                RecordField::int("size", "Size"),
            ]
        }

        fn to_record(&self, item: &Self::Item) -> Result<Record> {
            let zone = item
                .1
                .ok_or_else(|| Error::mapping(format!("item {}", item.0), "zone is missing"))?;
            Ok(HashMap::from([
                ("id".to_string(), Dynamic::from(item.0.to_string())),
                ("zone".to_string(), Dynamic::from(zone)),
                ("size".to_string(), Dynamic::from(item.0 * 10)),
            ]))
        }
    }

    #[async_trait]
    impl ListSource for Fixture {
        fn type_name(&self) -> &'static str {
            "cloud_fixtures"
        }

        fn collection(&self) -> &'static str {
            "fixtures"
        }

        fn description(&self) -> &'static str {
            "Test fixtures"
        }

        async fn fetch_all(
            &self,
            _ctx: &Context,
            _data: &CloudProviderData,
            _config: &DynamicValue,
        ) -> Result<Vec<Self::Item>> {
            Ok(self.items.clone())
        }
    }

    #[async_trait]
    impl LookupSource for Fixture {
        fn type_name(&self) -> &'static str {
            "cloud_fixture"
        }

        fn description(&self) -> &'static str {
            "Test fixture"
        }

        async fn fetch_one(
            &self,
            _ctx: &Context,
            _data: &CloudProviderData,
            id: &str,
        ) -> Result<Self::Item> {
            self.items
                .iter()
                .find(|(item_id, _)| item_id.to_string() == id)
                .cloned()
                .ok_or_else(|| Error::Config(format!("no fixture {}", id)))
        }
    }

    fn provider_data() -> CloudProviderData {
        let client = Client::new("http://127.0.0.1:1", "token", false).unwrap();
        CloudProviderData::new(client.clone(), client)
    }

    fn healthy() -> Fixture {
        Fixture {
            items: vec![
                (1, Some("a")),
                (2, Some("a")),
                (3, Some("b")),
                (4, Some("b")),
                (5, Some("c")),
            ],
        }
    }

    fn config(json: serde_json::Value) -> DynamicValue {
        DynamicValue::from_json(json)
    }

    #[tokio::test]
    async fn one_unmappable_item_fails_the_whole_read() {
        let mut fixture = healthy();
        fixture.items[3].1 = None;
        let ds = ListDataSource::new(fixture);

        let err = ds
            .read_state(&Context::new(), &provider_data(), &config(serde_json::json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Mapping { .. }));
    }

    #[tokio::test]
    async fn list_read_filters_and_stamps_state() {
        let ds = ListDataSource::new(healthy());
        let cfg = config(serde_json::json!({
            "filter": [
                {"name": "zone", "values": ["a", "b"]},
                {"name": "size", "values": ["20", "30", "50"]}
            ]
        }));

        let state = ds
            .read_state(&Context::new(), &provider_data(), &cfg)
            .await
            .unwrap();

        let fixtures = state.get_list(&AttributePath::new("fixtures")).unwrap();
        let ids: Vec<_> = fixtures
            .iter()
            .filter_map(|r| r.as_map()?.get("id")?.as_str().map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["2", "3"]);

        let id = state.get_string(&AttributePath::new("id")).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&id).is_ok());
        assert!(state.get_list(&AttributePath::new("filter")).is_ok());
    }

    #[tokio::test]
    async fn list_read_rejects_uncoercible_filter_values() {
        let ds = ListDataSource::new(healthy());
        let cfg = config(serde_json::json!({
            "filter": [{"name": "size", "values": ["big"]}]
        }));

        let err = ds
            .read_state(&Context::new(), &provider_data(), &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Coercion { .. }));
    }

    #[tokio::test]
    async fn list_schema_has_collection_and_filter_block() {
        let ds = ListDataSource::new(healthy());
        let schema = ds.build_schema();

        assert!(schema.attribute("fixtures").unwrap().computed);
        assert!(schema.attribute("id").unwrap().computed);
        let filter = &schema.block.block_types[0];
        assert_eq!(filter.type_name, "filter");
        assert_eq!(filter.nesting, NestingMode::Set);
        assert!(filter.block.attributes.iter().all(|a| a.required));
    }

    #[tokio::test]
    async fn unconfigured_list_reports_diagnostic() {
        let ds = ListDataSource::new(healthy());
        let response = ds
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "cloud_fixtures".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn validate_flags_unknown_filter_fields() {
        let ds = ListDataSource::new(healthy());
        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "cloud_fixtures".to_string(),
                    config: config(serde_json::json!({
                        "filter": [{"name": "colour", "values": ["red"]}]
                    })),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn lookup_places_fields_at_top_level() {
        let ds = LookupDataSource::new(healthy());

        let state = ds
            .read_state(
                &Context::new(),
                &provider_data(),
                &config(serde_json::json!({"id": "3"})),
            )
            .await
            .unwrap();

        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "3");
        assert_eq!(state.get_string(&AttributePath::new("zone")).unwrap(), "b");
        assert_eq!(state.get_number(&AttributePath::new("size")).unwrap(), 30.0);

        let schema = ds.build_schema();
        assert!(schema.attribute("id").unwrap().required);
        assert!(schema.attribute("zone").unwrap().computed);
    }
}
