//! Remote assignment call and per-row classification of its response

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::cancel::CancellationScope;
use super::row::RowKey;
use crate::remote::{AssignmentResponse, AssignmentSource, RemoteError};

/// Reason recorded for requested keys the remote neither accepted nor rejected
pub const NO_RESULT_REASON: &str = "no result reported";

/// Identifier of the operator receiving the cases
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssigneeId(String);

impl AssigneeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssigneeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated set of keys bound for one assignee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentBatch {
    keys: Vec<RowKey>,
    assignee: AssigneeId,
}

impl AssignmentBatch {
    /// `None` when there is nothing to assign or nobody to assign it to
    pub fn new(keys: impl IntoIterator<Item = RowKey>, assignee: AssigneeId) -> Option<Self> {
        let mut seen = BTreeSet::new();
        let keys: Vec<RowKey> = keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        if keys.is_empty() || assignee.as_str().trim().is_empty() {
            return None;
        }
        Some(Self { keys, assignee })
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn assignee(&self) -> &AssigneeId {
        &self.assignee
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentFailure {
    pub key: RowKey,
    pub reason: String,
}

/// Per-row result of an assignment call that reached the remote
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssignmentOutcome {
    pub successful_keys: BTreeSet<RowKey>,
    pub failures: Vec<AssignmentFailure>,
}

impl AssignmentOutcome {
    pub fn success_count(&self) -> usize {
        self.successful_keys.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.successful_keys.is_empty() && !self.failures.is_empty()
    }
}

/// How an assignment attempt ended
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentResult {
    Completed(AssignmentOutcome),
    /// The call itself failed; no row is known to have been assigned
    TotalFailure(RemoteError),
    Cancelled,
}

/// Split a raw response into per-row success and failure, in batch order.
/// Keys the remote mentions that were never requested are ignored.
pub fn classify(batch: &AssignmentBatch, response: &AssignmentResponse) -> AssignmentOutcome {
    let accepted: BTreeSet<&RowKey> = response.accepted.iter().collect();
    let mut outcome = AssignmentOutcome::default();

    for key in batch.keys() {
        if accepted.contains(key) {
            outcome.successful_keys.insert(key.clone());
            continue;
        }
        let reason = response
            .rejected
            .iter()
            .find(|rejection| &rejection.key == key)
            .map(|rejection| {
                if rejection.reason.trim().is_empty() {
                    "rejected".to_string()
                } else {
                    rejection.reason.clone()
                }
            })
            .unwrap_or_else(|| NO_RESULT_REASON.to_string());
        outcome.failures.push(AssignmentFailure {
            key: key.clone(),
            reason,
        });
    }

    outcome
}

pub struct AssignmentService<'a, S: AssignmentSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: AssignmentSource + ?Sized> AssignmentService<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Issue one assignment call for the whole batch. Partial failures are
    /// reported, never retried.
    pub async fn assign(&self, batch: &AssignmentBatch, scope: &CancellationScope) -> AssignmentResult {
        if scope.is_cancelled() {
            return AssignmentResult::Cancelled;
        }

        let response = self.source.assign(batch.keys(), batch.assignee(), scope).await;

        if scope.is_cancelled() {
            tracing::debug!("Discarding assignment response for cancelled scope {}", scope.id());
            return AssignmentResult::Cancelled;
        }

        match response {
            Ok(response) => {
                let outcome = classify(batch, &response);
                tracing::info!(
                    "Assigned {} of {} cases to {}",
                    outcome.success_count(),
                    batch.len(),
                    batch.assignee()
                );
                AssignmentResult::Completed(outcome)
            }
            Err(err) => {
                tracing::warn!("Assignment to {} failed: {err}", batch.assignee());
                AssignmentResult::TotalFailure(err)
            }
        }
    }
}
