//! Record adapters for managed Kubernetes objects

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::compute::record_of;
use super::filter::{Record, RecordField};
use super::list::{ListSource, LookupSource, RecordMapper};
use crate::api::kubernetes::{Cluster, Node};
use crate::error::{Error, Result};
use crate::provider_data::CloudProviderData;
use crate::values::{id_value, parse_id, timestamp};

pub struct Clusters;

impl RecordMapper for Clusters {
    type Item = Cluster;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Cluster identifier"),
            RecordField::string("name", "Cluster name"),
            RecordField::string("version", "Kubernetes version"),
            RecordField::string("network_id", "Network the cluster runs in"),
            RecordField::string("state", "Cluster state"),
            RecordField::string("api_endpoint", "Kubernetes API endpoint"),
            RecordField::int("node_count", "Number of worker nodes"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Cluster) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("version", Dynamic::from(item.version.as_str())),
            ("network_id", id_value(item.network_id)),
            ("state", Dynamic::from(item.status.as_str())),
            ("api_endpoint", Dynamic::from(item.api_endpoint.clone())),
            ("node_count", Dynamic::from(item.node_count)),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Clusters {
    fn type_name(&self) -> &'static str {
        "cloud_kubernetes_clusters"
    }

    fn collection(&self) -> &'static str {
        "clusters"
    }

    fn description(&self) -> &'static str {
        "Lists managed Kubernetes clusters"
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        _config: &DynamicValue,
    ) -> Result<Vec<Cluster>> {
        data.kubernetes
            .kubernetes()
            .list_clusters()
            .await
            .map_err(|e| Error::api("listing clusters", e))
    }
}

#[async_trait]
impl LookupSource for Clusters {
    fn type_name(&self) -> &'static str {
        "cloud_kubernetes_cluster"
    }

    fn description(&self) -> &'static str {
        "Looks up a managed Kubernetes cluster by id"
    }

    async fn fetch_one(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        id: &str,
    ) -> Result<Cluster> {
        let id = parse_id("id", id)?;
        data.kubernetes
            .kubernetes()
            .get_cluster(id)
            .await
            .map_err(|e| Error::api(format!("reading cluster {}", id), e))
    }
}

/// Nodes of one cluster, selected by the `cluster_id` input
pub struct Nodes;

impl RecordMapper for Nodes {
    type Item = Node;

    fn fields(&self) -> Vec<RecordField> {
        vec![
            RecordField::string("id", "Node identifier"),
            RecordField::string("cluster_id", "Cluster the node belongs to"),
            RecordField::string("name", "Node name"),
            RecordField::int("cpu", "Number of vCPUs"),
            RecordField::int("ram", "Memory in MiB"),
            RecordField::int("disk_size", "Disk size in GiB"),
            RecordField::string("state", "Node state"),
            RecordField::string("address", "Node address"),
            RecordField::string("created", "Creation time"),
        ]
    }

    fn to_record(&self, item: &Node) -> Result<Record> {
        Ok(record_of([
            ("id", id_value(item.id)),
            ("cluster_id", id_value(item.cluster_id)),
            ("name", Dynamic::from(item.name.as_str())),
            ("cpu", Dynamic::from(item.cpu)),
            ("ram", Dynamic::from(item.ram)),
            ("disk_size", Dynamic::from(item.disk_size)),
            ("state", Dynamic::from(item.status.as_str())),
            ("address", Dynamic::from(item.address.clone())),
            ("created", timestamp(item.created)),
        ]))
    }
}

#[async_trait]
impl ListSource for Nodes {
    fn type_name(&self) -> &'static str {
        "cloud_kubernetes_nodes"
    }

    fn collection(&self) -> &'static str {
        "nodes"
    }

    fn description(&self) -> &'static str {
        "Lists the worker nodes of a managed Kubernetes cluster"
    }

    fn inputs(&self) -> Vec<Attribute> {
        vec![AttributeBuilder::new("cluster_id", AttributeType::String)
            .description("Cluster whose nodes are listed")
            .required()
            .build()]
    }

    async fn fetch_all(
        &self,
        _ctx: &Context,
        data: &CloudProviderData,
        config: &DynamicValue,
    ) -> Result<Vec<Node>> {
        let raw = config
            .get_string(&AttributePath::new("cluster_id"))
            .map_err(|e| Error::Config(format!("cluster_id: {}", e)))?;
        let cluster_id = parse_id("cluster_id", &raw)?;

        data.kubernetes
            .kubernetes()
            .list_nodes(cluster_id)
            .await
            .map_err(|e| Error::api(format!("listing nodes of cluster {}", cluster_id), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Client;
    use crate::data_sources::list::ListDataSource;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn nodes_are_listed_for_the_configured_cluster() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/clusters/4/nodes")
            .match_query(Matcher::Any)
            .with_body(
                r#"{"items":[
                    {"id":1,"cluster_id":4,"name":"n1","cpu":2,"ram":4096,"disk_size":40,"status":"ready"},
                    {"id":2,"cluster_id":4,"name":"n2","cpu":4,"ram":8192,"disk_size":40,"status":"ready"}
                ],"total":2}"#,
            )
            .create_async()
            .await;

        let compute = Client::new("http://127.0.0.1:1", "secret", false).unwrap();
        let kubernetes = Client::new(&server.url(), "secret", false).unwrap();
        let data = CloudProviderData::new(compute, kubernetes);
        let config = DynamicValue::from_json(serde_json::json!({
            "cluster_id": "4",
            "filter": [{"name": "cpu", "values": ["4"]}]
        }));

        let state = ListDataSource::new(Nodes)
            .read_state(&Context::new(), &data, &config)
            .await
            .unwrap();

        let nodes = state.get_list(&AttributePath::new("nodes")).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].as_map().unwrap()["name"],
            Dynamic::from("n2")
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn nodes_require_a_cluster_id() {
        let client = Client::new("http://127.0.0.1:1", "secret", false).unwrap();
        let data = CloudProviderData::new(client.clone(), client);

        let err = ListDataSource::new(Nodes)
            .read_state(&Context::new(), &data, &DynamicValue::object())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
