//! Resources
//!
//! Every mutation returns a ticket that is driven to completion by the
//! reconciler before the handler reads the object back into state.

pub mod attachments;
pub mod disk;
pub mod floating_ip;
pub mod group;
pub mod instance;
pub mod kubernetes_cluster;
pub mod kubernetes_node;
pub mod load_balancer;
pub mod network;
pub mod ssh_key;

#[cfg(test)]
pub(crate) mod test_support;

use std::future::Future;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::resource::{
    CreateResourceResponse, DeleteResourceResponse, ImportResourceStateRequest,
    ImportResourceStateResponse, ReadResourceResponse, UpdateResourceResponse,
};
use tfplug::schema::Schema;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::Ticket;
use crate::data_sources::RecordMapper;
use crate::error::{Error, Result};
use crate::provider_data::CloudProviderData;
use crate::reconciler::wait_for_success;
use crate::values::{parse_id, parse_id_list};

pub use disk::DiskResource;
pub use floating_ip::FloatingIpResource;
pub use group::GroupResource;
pub use instance::InstanceResource;
pub use kubernetes_cluster::KubernetesClusterResource;
pub use kubernetes_node::KubernetesNodeResource;
pub use load_balancer::LoadBalancerResource;
pub use network::NetworkResource;
pub use ssh_key::SshKeyResource;

pub const CREATE_TIMEOUT: Duration = Duration::from_secs(45 * 60);
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const DELETE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

fn config_error(name: &str, e: tfplug::TfplugError) -> Error {
    Error::Config(format!("{}: {}", name, e))
}

pub(crate) fn required_string(config: &DynamicValue, name: &str) -> Result<String> {
    config
        .get_string(&AttributePath::new(name))
        .map_err(|e| config_error(name, e))
}

pub(crate) fn optional_string(config: &DynamicValue, name: &str) -> Result<Option<String>> {
    match config.get_string(&AttributePath::new(name)) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_missing() => Ok(None),
        Err(e) => Err(config_error(name, e)),
    }
}

pub(crate) fn optional_bool(config: &DynamicValue, name: &str) -> Result<Option<bool>> {
    match config.get_bool(&AttributePath::new(name)) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_missing() => Ok(None),
        Err(e) => Err(config_error(name, e)),
    }
}

pub(crate) fn required_u64(config: &DynamicValue, name: &str) -> Result<u64> {
    config
        .get_u64(&AttributePath::new(name))
        .map_err(|e| config_error(name, e))
}

pub(crate) fn required_u32(config: &DynamicValue, name: &str) -> Result<u32> {
    let value = required_u64(config, name)?;
    u32::try_from(value).map_err(|_| Error::Config(format!("{}: {} is too large", name, value)))
}

pub(crate) fn required_u16(config: &DynamicValue, name: &str) -> Result<u16> {
    let value = required_u64(config, name)?;
    u16::try_from(value).map_err(|_| Error::Config(format!("{}: {} is not a port", name, value)))
}

/// Id-valued string attribute
pub(crate) fn required_id(config: &DynamicValue, name: &str) -> Result<u64> {
    parse_id(name, &required_string(config, name)?)
}

pub(crate) fn optional_id(config: &DynamicValue, name: &str) -> Result<Option<u64>> {
    optional_string(config, name)?
        .map(|raw| parse_id(name, &raw))
        .transpose()
}

/// Set of ids; an unset attribute is the empty set
pub(crate) fn id_set(config: &DynamicValue, name: &str) -> Result<Vec<u64>> {
    match config.get_list(&AttributePath::new(name)) {
        Ok(values) => parse_id_list(name, &values),
        Err(e) if e.is_missing() => Ok(Vec::new()),
        Err(e) => Err(config_error(name, e)),
    }
}

/// The remote id stored in state
pub(crate) fn state_id(state: &DynamicValue) -> Result<u64> {
    required_id(state, "id")
}

/// Fails when an attribute that cannot change in place differs between
/// prior state and plan
pub(crate) fn reject_replacements(
    schema: &Schema,
    prior: &DynamicValue,
    planned: &DynamicValue,
) -> Result<()> {
    let triggers = schema.replace_triggers(prior, planned);
    if triggers.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} cannot be changed in place",
            triggers.join(", ")
        )))
    }
}

/// State built from the same flat record the data sources expose
pub(crate) fn state_of<M: RecordMapper>(mapper: &M, item: &M::Item) -> Result<DynamicValue> {
    Ok(DynamicValue::new(Dynamic::Map(mapper.to_record(item)?)))
}

/// Waits for a compute ticket to succeed
pub(crate) async fn complete(
    ctx: &Context,
    data: &CloudProviderData,
    ticket: Ticket,
) -> Result<Ticket> {
    wait_for_success(ctx, &data.compute.tickets(), ticket, data.ticket_policy).await
}

/// Waits for a Kubernetes operation to succeed
pub(crate) async fn complete_operation(
    ctx: &Context,
    data: &CloudProviderData,
    ticket: Ticket,
) -> Result<Ticket> {
    wait_for_success(ctx, &data.kubernetes.kubernetes(), ticket, data.ticket_policy).await
}

/// A failed create. `id` is set once the remote object exists, so the
/// failure can still hand Terraform something to track.
pub(crate) struct CreateFailure {
    error: Error,
    id: Option<u64>,
}

impl CreateFailure {
    pub(crate) fn left_behind(id: u64, error: Error) -> Self {
        Self {
            error,
            id: Some(id),
        }
    }
}

impl From<Error> for CreateFailure {
    fn from(error: Error) -> Self {
        Self { error, id: None }
    }
}

pub(crate) type CreateResult = std::result::Result<DynamicValue, CreateFailure>;

/// Runs the steps that follow the creation of object `id`
pub(crate) async fn created<F>(id: u64, steps: F) -> CreateResult
where
    F: Future<Output = Result<DynamicValue>>,
{
    steps
        .await
        .map_err(|e| CreateFailure::left_behind(id, e))
}

fn without_unknowns(value: Dynamic) -> Dynamic {
    match value {
        Dynamic::Unknown => Dynamic::Null,
        Dynamic::List(items) => Dynamic::List(items.into_iter().map(without_unknowns).collect()),
        Dynamic::Map(fields) => Dynamic::Map(
            fields
                .into_iter()
                .map(|(name, value)| (name, without_unknowns(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Planned state pinned to an object that exists but did not finish
/// creating. Terraform records it as tainted.
fn partial_state(planned_state: DynamicValue, id: u64) -> DynamicValue {
    let mut state = DynamicValue::new(without_unknowns(planned_state.value));
    if state.is_null() {
        state = DynamicValue::object();
    }
    let _ = state.set_string(&AttributePath::new("id"), id.to_string());
    state
}

pub(crate) fn create_response(
    result: std::result::Result<DynamicValue, impl Into<CreateFailure>>,
    planned_state: DynamicValue,
    what: &str,
) -> CreateResourceResponse {
    let failure = match result {
        Ok(new_state) => {
            return CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            }
        }
        Err(e) => e.into(),
    };
    let summary = format!("Failed to create {}", what);

    match failure.id {
        Some(id) => {
            tracing::warn!("{} {} exists but did not finish creating", what, id);
            CreateResourceResponse {
                new_state: partial_state(planned_state, id),
                diagnostics: vec![Diagnostic::error(
                    summary,
                    format!("{} {} was created, then: {}", what, id, failure.error),
                )],
            }
        }
        None => CreateResourceResponse {
            new_state: planned_state,
            diagnostics: vec![Diagnostic::error(summary, failure.error.to_string())],
        },
    }
}

/// A missing object drops out of state instead of failing the refresh
pub(crate) fn read_response(
    result: Result<DynamicValue>,
    current_state: DynamicValue,
    what: &str,
) -> ReadResourceResponse {
    match result {
        Ok(state) => ReadResourceResponse {
            new_state: Some(state),
            diagnostics: vec![],
        },
        Err(e) if e.is_not_found() => {
            tracing::debug!("{} no longer exists: {}", what, e);
            ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            }
        }
        Err(e) => ReadResourceResponse {
            new_state: Some(current_state),
            diagnostics: vec![Diagnostic::error(
                format!("Failed to read {}", what),
                e.to_string(),
            )],
        },
    }
}

pub(crate) fn update_response(
    result: Result<DynamicValue>,
    prior_state: DynamicValue,
    what: &str,
) -> UpdateResourceResponse {
    match result {
        Ok(new_state) => UpdateResourceResponse {
            new_state,
            diagnostics: vec![],
        },
        Err(e) => UpdateResourceResponse {
            new_state: prior_state,
            diagnostics: vec![Diagnostic::error(
                format!("Failed to update {}", what),
                e.to_string(),
            )],
        },
    }
}

/// Deleting something that is already gone succeeds
pub(crate) fn delete_response(result: Result<()>, what: &str) -> DeleteResourceResponse {
    match result {
        Ok(()) => DeleteResourceResponse {
            diagnostics: vec![],
        },
        Err(e) if e.is_not_found() => {
            tracing::warn!("{} was already deleted: {}", what, e);
            DeleteResourceResponse {
                diagnostics: vec![],
            }
        }
        Err(e) => DeleteResourceResponse {
            diagnostics: vec![Diagnostic::error(
                format!("Failed to delete {}", what),
                e.to_string(),
            )],
        },
    }
}

/// Imports by numeric id; the following read fills in the rest
pub(crate) fn import_by_id(
    ctx: &Context,
    request: &ImportResourceStateRequest,
) -> ImportResourceStateResponse {
    let mut response = ImportResourceStateResponse {
        imported_resources: vec![],
        diagnostics: vec![],
    };

    if !request.id.trim().is_empty() && parse_id("id", &request.id).is_err() {
        response.diagnostics.push(Diagnostic::error(
            "Invalid import ID",
            format!("'{}' is not a numeric id", request.id),
        ));
        return response;
    }

    tfplug::import_state_passthrough_id(ctx, AttributePath::new("id"), request, &mut response);
    response
}
