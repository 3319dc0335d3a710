//! Read-only image catalogue

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::deserialize_optional_timestamp;
use super::{ApiError, Client};

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub id: u64,
    pub name: String,
    pub os: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Image size in GiB
    pub size: f64,
    /// Smallest disk the image boots from, in GiB
    #[serde(default)]
    pub min_disk: u64,
    #[serde(default)]
    pub public: bool,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created: Option<DateTime<Utc>>,
}

pub struct ImagesApi<'a> {
    client: &'a Client,
}

impl<'a> ImagesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /v1/images
    pub async fn list(&self) -> Result<Vec<Image>, ApiError> {
        self.client.list_all("/v1/images").await
    }

    /// GET /v1/images/{id}
    pub async fn get(&self, id: u64) -> Result<Image, ApiError> {
        self.client.get(&format!("/v1/images/{}", id)).await
    }
}
