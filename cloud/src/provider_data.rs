//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::reconciler::PollPolicy;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct CloudProviderData {
    pub compute: Arc<Client>,
    pub kubernetes: Arc<Client>,
    pub ticket_policy: PollPolicy,
    pub cluster_policy: PollPolicy,
}

impl CloudProviderData {
    pub fn new(compute: Client, kubernetes: Client) -> Self {
        Self {
            compute: Arc::new(compute),
            kubernetes: Arc::new(kubernetes),
            ticket_policy: PollPolicy::TICKET,
            cluster_policy: PollPolicy::CLUSTER,
        }
    }

    pub fn with_poll_policies(mut self, ticket: PollPolicy, cluster: PollPolicy) -> Self {
        self.ticket_policy = ticket;
        self.cluster_policy = cluster;
        self
    }

    /// Extracts the provider data handed to a resource or data source
    /// through `configure`
    pub fn from_configure(
        data: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<CloudProviderData, Diagnostic> {
        match data {
            Some(data) => data
                .downcast_ref::<CloudProviderData>()
                .cloned()
                .ok_or_else(|| {
                    Diagnostic::error(
                        "Invalid provider data",
                        "Failed to extract CloudProviderData from provider data",
                    )
                }),
            None => Err(Diagnostic::error(
                "No provider data",
                "No provider data was provided",
            )),
        }
    }
}

/// Diagnostic for handlers invoked before `configure`
pub fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}
