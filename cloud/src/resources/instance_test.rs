#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::resources::test_support::{done_ticket, failed_ticket, provider_data, value};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::sync::Arc;

    const STOPPED: &str = r#"{"id":9,"name":"web-1","image":{"id":1,"name":"ubuntu-24.04"},
        "cpu":2,"ram":2048,"network_ids":[3],"disk_ids":[4],"state":3,
        "ipv4":"10.0.0.9","created":"2024-05-01T10:00:00Z"}"#;

    async fn configured(url: &str) -> InstanceResource {
        let mut resource = InstanceResource::new();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(provider_data(url))),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    #[test]
    fn test_resource_type_name() {
        assert_eq!(InstanceResource::new().type_name(), "cloud_instance");
    }

    #[tokio::test]
    async fn test_resource_schema() {
        let response = InstanceResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await;
        let schema = response.schema;

        assert!(schema.attribute("image_id").unwrap().requires_replace);
        assert!(schema.attribute("ssh_key_ids").unwrap().requires_replace);
        let running = schema.attribute("running").unwrap();
        assert!(running.optional && running.computed);
        assert!(!schema.attribute("network_ids").unwrap().requires_replace);
    }

    #[tokio::test]
    async fn test_create_attaches_and_powers_off() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/v1/instances")
            .match_body(Matcher::Json(json!({
                "name": "web-1", "image_id": 1, "cpu": 2, "ram": 2048
            })))
            .with_body(done_ticket("t-c", 9))
            .create_async()
            .await;
        let network = server
            .mock("POST", "/v1/instances/9/networks/3")
            .with_body(done_ticket("t-n", 9))
            .create_async()
            .await;
        let disk = server
            .mock("POST", "/v1/instances/9/disks/4")
            .with_body(done_ticket("t-d", 9))
            .create_async()
            .await;
        let stop = server
            .mock("POST", "/v1/instances/9/stop")
            .with_body(done_ticket("t-s", 9))
            .create_async()
            .await;
        server
            .mock("GET", "/v1/instances/9")
            .with_body(STOPPED)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let config = value(json!({
            "name": "web-1", "image_id": "1", "cpu": 2, "ram": 2048,
            "network_ids": ["3"], "disk_ids": ["4"], "running": false
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "cloud_instance".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "9");
        assert!(!state.get_bool(&AttributePath::new("running")).unwrap());
        assert_eq!(
            state.get_string(&AttributePath::new("state")).unwrap(),
            "stopped"
        );
        assert_eq!(
            state.get_list(&AttributePath::new("network_ids")).unwrap(),
            vec![Dynamic::String("3".to_string())]
        );
        create.assert_async().await;
        network.assert_async().await;
        disk.assert_async().await;
        stop.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_keeps_id_when_attach_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/instances")
            .with_body(done_ticket("t-c", 9))
            .create_async()
            .await;
        let attach = server
            .mock("POST", "/v1/instances/9/networks/3")
            .with_body(failed_ticket("t-n"))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let config = value(json!({
            "name": "web-1", "image_id": "1", "cpu": 2, "ram": 2048,
            "network_ids": ["3"]
        }));
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "cloud_instance".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Failed to create instance");
        assert!(response.diagnostics[0].detail.contains("instance 9 was created"));
        assert!(response.diagnostics[0].detail.contains("t-n"));
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "9");
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "web-1");
        attach.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_reconciles_attachments_and_power() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/instances/9")
            .with_body(STOPPED)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/v1/instances/9")
            .expect(0)
            .create_async()
            .await;
        let detach = server
            .mock("DELETE", "/v1/instances/9/networks/3")
            .with_body(done_ticket("t-1", 9))
            .expect(1)
            .create_async()
            .await;
        let attach = server
            .mock("POST", "/v1/instances/9/networks/5")
            .with_body(done_ticket("t-2", 9))
            .expect(1)
            .create_async()
            .await;
        let disks = server
            .mock("DELETE", Matcher::Regex(r"^/v1/instances/9/disks/".to_string()))
            .expect(0)
            .create_async()
            .await;
        let start = server
            .mock("POST", "/v1/instances/9/start")
            .with_body(done_ticket("t-3", 9))
            .expect(1)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let prior = value(json!({
            "id": "9", "name": "web-1", "image_id": "1", "cpu": 2, "ram": 2048,
            "network_ids": ["3"], "disk_ids": ["4"], "running": false
        }));
        let planned = value(json!({
            "id": "9", "name": "web-1", "image_id": "1", "cpu": 2, "ram": 2048,
            "network_ids": ["5"], "disk_ids": ["4"], "running": true
        }));

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "cloud_instance".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
        detach.assert_async().await;
        attach.assert_async().await;
        disks.assert_async().await;
        start.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_resizes_in_place() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/instances/9")
            .with_body(STOPPED)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/v1/instances/9")
            .match_body(Matcher::Json(json!({
                "name": "web-1", "cpu": 4, "ram": 4096, "group_id": null
            })))
            .with_body(done_ticket("t-u", 9))
            .expect(1)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let prior = value(json!({
            "id": "9", "name": "web-1", "image_id": "1", "cpu": 2, "ram": 2048,
            "network_ids": ["3"], "disk_ids": ["4"]
        }));
        let planned = value(json!({
            "id": "9", "name": "web-1", "image_id": "1", "cpu": 4, "ram": 4096,
            "network_ids": ["3"], "disk_ids": ["4"]
        }));

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "cloud_instance".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_reports_unmappable_instances() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/instances/9")
            .with_body(r#"{"id":9,"name":"web-1","cpu":2,"ram":2048,"state":1}"#)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let current = value(json!({"id": "9"}));
        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "cloud_instance".to_string(),
                    current_state: current.clone(),
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to read instance");
        assert_eq!(response.new_state, Some(current));
    }

    #[tokio::test]
    async fn test_validate() {
        let response = InstanceResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "cloud_instance".to_string(),
                    config: value(json!({
                        "name": "web-1", "image_id": "ubuntu", "cpu": 0, "ram": 128
                    })),
                },
            )
            .await;

        let summaries: Vec<_> = response
            .diagnostics
            .iter()
            .map(|d| d.summary.as_str())
            .collect();
        assert_eq!(
            summaries,
            vec!["Invalid CPU count", "Invalid memory size", "Invalid id"]
        );
    }

    #[tokio::test]
    async fn test_import_state() {
        let response = InstanceResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "cloud_instance".to_string(),
                    id: "9".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources[0].type_name, "cloud_instance");
    }
}
