//! Ticket reconciliation
//!
//! Every mutation against the platform returns a [`Ticket`]. The functions
//! here block (asynchronously) until the ticket reaches a terminal state,
//! re-fetching it at a fixed interval. Transient fetch failures are tolerated
//! up to a retry budget. The budget is shared by the whole wait: a fetch that
//! succeeds but still reports "pending" does not replenish it.
//!
//! The wait has no wall-clock bound of its own. The caller's [`Context`]
//! bounds it: cancellation or an expired deadline stops the loop between
//! attempts with [`Error::Cancelled`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tfplug::Context;

use crate::api::kubernetes::Cluster;
use crate::api::Ticket;
use crate::error::{Error, Result};

/// Anything that can re-fetch a ticket by id
#[async_trait]
pub trait TicketSource: Send + Sync {
    async fn fetch_ticket(&self, id: &str) -> Result<Ticket>;
}

/// Anything that can fetch a managed Kubernetes cluster descriptor
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn fetch_cluster(&self, id: u64) -> Result<Cluster>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two fetches; never applied before the first one
    pub interval: Duration,
    /// Failed fetches tolerated before the last error is returned
    pub retries: u32,
}

impl PollPolicy {
    pub const TICKET: PollPolicy = PollPolicy {
        interval: Duration::from_secs(10),
        retries: 5,
    };

    pub const CLUSTER: PollPolicy = PollPolicy {
        interval: Duration::from_secs(10),
        retries: 18,
    };
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::TICKET
    }
}

/// Waits until `ticket` is no longer pending and returns its final form.
///
/// A ticket that is already terminal is returned as is, without fetching.
/// The terminal status is not interpreted; see [`wait_for_success`].
pub async fn wait_for_completion<S>(
    ctx: &Context,
    source: &S,
    ticket: Ticket,
    policy: PollPolicy,
) -> Result<Ticket>
where
    S: TicketSource + ?Sized,
{
    if !ticket.is_pending() {
        return Ok(ticket);
    }

    let id = ticket.id;
    tracing::debug!("Waiting for ticket {}", id);

    poll_until(
        ctx,
        &format!("ticket {}", id),
        policy,
        || source.fetch_ticket(&id),
        |t: &Ticket| !t.is_pending(),
    )
    .await
}

/// Like [`wait_for_completion`], but any terminal status other than
/// `Succeeded` is an error carrying that status
pub async fn wait_for_success<S>(
    ctx: &Context,
    source: &S,
    ticket: Ticket,
    policy: PollPolicy,
) -> Result<Ticket>
where
    S: TicketSource + ?Sized,
{
    let ticket = wait_for_completion(ctx, source, ticket, policy).await?;
    if !ticket.status.is_success() {
        return Err(Error::TicketFailed {
            ticket: ticket.id,
            status: ticket.status,
        });
    }
    Ok(ticket)
}

/// Waits until the cluster is flagged running
pub async fn wait_for_cluster_ready<S>(
    ctx: &Context,
    source: &S,
    cluster_id: u64,
    policy: PollPolicy,
) -> Result<Cluster>
where
    S: ClusterSource + ?Sized,
{
    tracing::debug!("Waiting for cluster {} to become ready", cluster_id);

    poll_until(
        ctx,
        &format!("cluster {}", cluster_id),
        policy,
        || source.fetch_cluster(cluster_id),
        Cluster::is_running,
    )
    .await
}

async fn poll_until<T, F, Fut, P>(
    ctx: &Context,
    target: &str,
    policy: PollPolicy,
    mut fetch: F,
    done: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let mut retries = policy.retries;
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            tokio::select! {
                _ = tokio::time::sleep(policy.interval) => {}
                _ = ctx.cancelled() => {}
            }
        }
        if ctx.is_cancelled() {
            return Err(Error::Cancelled {
                target: target.to_string(),
            });
        }
        attempt += 1;

        match fetch().await {
            Ok(value) if done(&value) => {
                tracing::debug!("{} settled after {} attempt(s)", target, attempt);
                return Ok(value);
            }
            Ok(_) => {
                tracing::debug!("{} still pending (attempt {})", target, attempt);
            }
            Err(e) if retries == 0 => return Err(e),
            Err(e) => {
                retries -= 1;
                tracing::warn!(
                    "Polling {} failed, {} retries left: {}",
                    target,
                    retries,
                    e
                );
            }
        }
    }
}
