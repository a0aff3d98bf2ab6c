use crate::queries::{HAS_TX_HASH_BEEN_INDEXED, PUBLICATION};
use crate::{HasTxHashBeenIndexedRequest, IndexingResult, LensApi, LensClientError, PublicationQuery};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use lp_optimistic::Publication;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a, V> {
    operation_name: &'a str,
    query: &'a str,
    variables: V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Serialize)]
struct RequestVariables<'a, R> {
    request: &'a R,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HasTxHashBeenIndexedData {
    has_tx_hash_been_indexed: IndexingResult,
}

#[derive(Deserialize)]
struct PublicationData {
    publication: Option<Publication>,
}

/// Lens API client speaking GraphQL over HTTP.
#[derive(Clone)]
pub struct LensProvider {
    client: reqwest::Client,
    api_url: Url,
    headers: HeaderMap,
}

impl std::fmt::Debug for LensProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LensProvider").field("api_url", &self.api_url).finish()
    }
}

impl LensProvider {
    pub fn new(api_url: Url) -> Result<Self, LensClientError> {
        Self::with_timeout(api_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_url: Url, timeout: Duration) -> Result<Self, LensClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_url, headers: HeaderMap::new() })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Authenticates requests as a profile, so the API resolves viewer specific fields.
    pub fn with_access_token(mut self, token: &str) -> Result<Self, LensClientError> {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        self.headers.insert(HeaderName::from_static("x-access-token"), value);
        Ok(self)
    }

    async fn query<V: Serialize, T: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: V,
    ) -> Result<T, LensClientError> {
        let response = self
            .client
            .post(self.api_url.clone())
            .headers(self.headers.clone())
            .json(&GraphQlRequest { operation_name, query, variables })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LensClientError::Status { status: status.as_u16(), body });
        }

        let response: GraphQlResponse<T> = response.json().await?;
        if !response.errors.is_empty() {
            return Err(LensClientError::GraphQl(response.errors.into_iter().map(|e| e.message).collect()));
        }
        response.data.ok_or(LensClientError::MissingData)
    }
}

#[async_trait]
impl LensApi for LensProvider {
    async fn has_tx_hash_been_indexed(
        &self,
        request: &HasTxHashBeenIndexedRequest,
    ) -> Result<IndexingResult, LensClientError> {
        let data: HasTxHashBeenIndexedData =
            self.query("HasTxHashBeenIndexed", HAS_TX_HASH_BEEN_INDEXED, RequestVariables { request }).await?;
        tracing::trace!(?request, result = ?data.has_tx_hash_been_indexed, "hasTxHashBeenIndexed");
        Ok(data.has_tx_hash_been_indexed)
    }

    async fn publication(&self, query: &PublicationQuery) -> Result<Option<Publication>, LensClientError> {
        let data: PublicationData = self.query("Publication", PUBLICATION, query).await?;
        tracing::trace!(tx_hash = %query.request.tx_hash, found = data.publication.is_some(), "publication");
        Ok(data.publication)
    }
}
