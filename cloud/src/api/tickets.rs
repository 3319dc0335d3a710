//! Tickets: server-side handles for long-running operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::deserialize_optional_timestamp;
use super::dictionary::TicketStatus;
use super::{ApiError, Client};
use crate::error::{Error, Result};
use crate::reconciler::TicketSource;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticket {
    pub id: String,
    /// `None` while the operation is pending
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progress: u8,
    pub status: TicketStatus,
    #[serde(default)]
    pub object_id: Option<u64>,
}

impl Ticket {
    pub fn is_pending(&self) -> bool {
        self.completed.is_none()
    }

    /// Id of the object the operation created or touched
    pub fn object_id(&self) -> Result<u64> {
        self.object_id.ok_or_else(|| Error::MissingObjectId {
            ticket: self.id.clone(),
        })
    }
}

pub struct TicketsApi<'a> {
    client: &'a Client,
}

impl<'a> TicketsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/tickets/{id}
    pub async fn get(&self, id: &str) -> Result<Ticket, ApiError> {
        self.client
            .get(&format!("/v1/tickets/{}", urlencoding::encode(id)))
            .await
    }
}

#[async_trait]
impl TicketSource for TicketsApi<'_> {
    async fn fetch_ticket(&self, id: &str) -> Result<Ticket> {
        self.get(id)
            .await
            .map_err(|e| Error::api(format!("fetching ticket {}", id), e))
    }
}
