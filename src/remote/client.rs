//! HTTP/JSON client for the case listing and assignment services
//!
//! Every call is a `POST` of a JSON body to `{api_base_url}/{path}`. The
//! credential travels in a configurable header. Listing pages are retried on
//! transient failures; the assignment call is sent exactly once because the
//! server may have committed it before a timeout.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::traits::{AssignmentResponse, AssignmentSource, ListingSource, PageRequest, PageResult};
use super::{RemoteError, RetryPolicy};
use crate::config::DispatchConfig;
use crate::engine::{AssigneeId, CancellationScope, Row, RowKey, RowSchema};

/// Client for the remote case service
#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    assign_path: String,
    auth_header: String,
    auth_scheme: Option<String>,
    credential: Option<String>,
    retry: RetryPolicy,
}

impl RemoteClient {
    /// Create a client from configuration; no connection is made yet
    pub fn new(config: &DispatchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
            assign_path: config.assign_path.clone(),
            auth_header: config.auth_header.clone(),
            auth_scheme: config.auth_scheme.clone(),
            credential: None,
            retry: config.retry,
        })
    }

    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.set_credential(credential);
        self
    }

    pub fn set_credential(&mut self, credential: Option<String>) {
        self.credential = credential;
    }

    /// Listing source for `path`, decoding rows against `schema`
    pub fn listing(&self, path: &str, schema: Arc<RowSchema>) -> HttpListing {
        HttpListing {
            client: self.clone(),
            path: path.to_string(),
            schema,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_value(&self) -> Option<String> {
        let credential = self.credential.as_deref()?;
        Some(match self.auth_scheme.as_deref().map(str::trim) {
            Some(scheme) if !scheme.is_empty() => format!("{scheme} {credential}"),
            _ => credential.to_string(),
        })
    }

    async fn post_json(
        &self,
        path: &str,
        body: &Value,
        retry: RetryPolicy,
        scope: &CancellationScope,
    ) -> Result<Value, RemoteError> {
        let url = self.url(path);
        let url = url.as_str();
        let auth = self.auth_value();
        let auth = auth.as_deref();

        retry
            .run(path, scope, || async move {
                let mut request = self.http.post(url).json(body);
                if let Some(value) = auth {
                    request = request.header(self.auth_header.as_str(), value);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return Err(RemoteError::from_status(status.as_u16(), &text));
                }
                response
                    .json::<Value>()
                    .await
                    .map_err(|e| RemoteError::Decode(e.to_string()))
            })
            .await
    }
}

#[async_trait]
impl AssignmentSource for RemoteClient {
    async fn assign(
        &self,
        keys: &[RowKey],
        assignee: &AssigneeId,
        scope: &CancellationScope,
    ) -> Result<AssignmentResponse, RemoteError> {
        let body = json!({ "keys": keys, "assigneeId": assignee });
        let value = self
            .post_json(&self.assign_path, &body, RetryPolicy::none(), scope)
            .await?;
        decode_assignment(value)
    }
}

/// A listing endpoint bound to its row schema
pub struct HttpListing {
    client: RemoteClient,
    path: String,
    schema: Arc<RowSchema>,
}

#[async_trait]
impl ListingSource for HttpListing {
    async fn fetch_page(
        &self,
        request: &PageRequest,
        scope: &CancellationScope,
    ) -> Result<PageResult, RemoteError> {
        let body = serde_json::to_value(request).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let value = self
            .client
            .post_json(&self.path, &body, self.client.retry, scope)
            .await?;
        decode_page(&self.schema, value)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePage {
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default, alias = "total")]
    total_count: Option<u64>,
}

/// Decode a page body; any undecodable record fails the whole page
pub fn decode_page(schema: &RowSchema, value: Value) -> Result<PageResult, RemoteError> {
    let page: WirePage =
        serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))?;
    let total_count = page.total_count.unwrap_or(page.rows.len() as u64);
    let rows = page
        .rows
        .into_iter()
        .map(|raw| Row::decode(schema, raw))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PageResult { rows, total_count })
}

pub fn decode_assignment(value: Value) -> Result<AssignmentResponse, RemoteError> {
    serde_json::from_value(value).map_err(|e| RemoteError::Decode(e.to_string()))
}
