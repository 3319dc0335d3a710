//! Shared fixtures for resource tests

use std::time::Duration;
use tfplug::types::DynamicValue;

use crate::api::Client;
use crate::provider_data::CloudProviderData;
use crate::reconciler::PollPolicy;

pub const FAST: PollPolicy = PollPolicy {
    interval: Duration::from_millis(1),
    retries: 1,
};

/// Provider data with both APIs pointed at one mock server
pub fn provider_data(url: &str) -> CloudProviderData {
    let compute = Client::new(url, "secret", false).unwrap();
    let kubernetes = Client::new(url, "secret", false).unwrap();
    CloudProviderData::new(compute, kubernetes).with_poll_policies(FAST, FAST)
}

/// Body of a ticket that already succeeded
pub fn done_ticket(id: &str, object_id: u64) -> String {
    format!(
        r#"{{"id":"{}","completed":"2024-05-01T10:00:00Z","progress":100,"status":3,"object_id":{}}}"#,
        id, object_id
    )
}

pub fn pending_ticket(id: &str) -> String {
    format!(r#"{{"id":"{}","progress":10,"status":2}}"#, id)
}

pub fn failed_ticket(id: &str) -> String {
    format!(
        r#"{{"id":"{}","completed":"2024-05-01T10:00:00Z","progress":100,"status":4}}"#,
        id
    )
}

pub fn value(json: serde_json::Value) -> DynamicValue {
    DynamicValue::from_json(json)
}
