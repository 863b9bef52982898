//! Catalog service collaborator: the trait the engine depends on and the
//! HTTP implementation used against a live deployment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Item, ItemId},
    error::{CatalogError, UpstreamErrorBody},
    protocol::ListItemsQuery,
};
use tracing::{debug, warn};
use url::Url;

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_items(&self, query: &ListItemsQuery) -> Result<Vec<Item>, CatalogError>;
    async fn list_categories(&self) -> Result<Vec<String>, CatalogError>;
    async fn get_item(&self, id: &ItemId) -> Result<Item, CatalogError>;
}

pub struct HttpCatalogClient {
    http: Client,
    base_url: Url,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: &str, http: Client) -> Result<Self, CatalogError> {
        // A trailing slash makes `Url::join` append instead of replacing the
        // last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|err| CatalogError::Decode(format!("invalid catalog base url: {err}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base_url
            .join(path)
            .map_err(|err| CatalogError::Decode(format!("invalid catalog path {path}: {err}")))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_items(&self, query: &ListItemsQuery) -> Result<Vec<Item>, CatalogError> {
        let url = self.endpoint("products")?;
        debug!(%url, ?query, "listing catalog items");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        decode_body(response).await
    }

    async fn list_categories(&self) -> Result<Vec<String>, CatalogError> {
        let url = self.endpoint("categories")?;
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        decode_body(response).await
    }

    async fn get_item(&self, id: &ItemId) -> Result<Item, CatalogError> {
        let mut url = self.endpoint("products")?;
        url.path_segments_mut()
            .map_err(|()| CatalogError::Decode("catalog base url cannot be a base".into()))?
            .pop_if_empty()
            .push(id.as_str());
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id.clone()));
        }
        let response = check_status(response).await?;
        decode_body(response).await
    }
}

fn transport_error(err: reqwest::Error) -> CatalogError {
    warn!(error = %err, "catalog request failed before a response arrived");
    CatalogError::Network(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<UpstreamErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    warn!(status = status.as_u16(), %message, "catalog service rejected request");
    Err(CatalogError::upstream(status.as_u16(), message))
}

async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
    let bytes = response.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&bytes).map_err(|err| CatalogError::Decode(err.to_string()))
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
