//! Trait abstractions for the remote services, enabling mocking in tests

use crate::engine::{AssigneeId, CancellationScope, Row, RowKey};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RemoteError;

/// One page of a remote listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-based page index
    pub page_index: u32,
    pub page_size: u32,
    /// Opaque filter object passed through to the source unchanged
    #[serde(rename = "filter")]
    pub filter_payload: Value,
}

/// Rows of one page plus the total the source reports
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResult {
    pub rows: Vec<Row>,
    /// Only authoritative on the first page
    pub total_count: u64,
}

/// A key the assignment source refused, with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub key: RowKey,
    #[serde(default)]
    pub reason: String,
}

/// Raw response of an assignment call
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssignmentResponse {
    #[serde(default)]
    pub accepted: Vec<RowKey>,
    #[serde(default)]
    pub rejected: Vec<Rejection>,
}

/// A page-oriented remote listing
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch a single page; gives up with [`RemoteError::Cancelled`] once
    /// `scope` is cancelled
    async fn fetch_page(
        &self,
        request: &PageRequest,
        scope: &CancellationScope,
    ) -> Result<PageResult, RemoteError>;
}

/// The remote "assign rows to an operator" call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssignmentSource: Send + Sync {
    /// Assign every key to the operator; per-key rejections are not errors
    async fn assign(
        &self,
        keys: &[RowKey],
        assignee: &AssigneeId,
        scope: &CancellationScope,
    ) -> Result<AssignmentResponse, RemoteError>;
}

/// Where the single credential string lives between runs
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, if any
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored credential
    fn save(&self, credential: &str) -> Result<()>;

    /// Forget the stored credential
    fn clear(&self) -> Result<()>;
}
