//! Paginated aggregation with bounded concurrency
//!
//! Page 1 is fetched alone to learn the total. The remaining pages are
//! fetched in chunks of at most `concurrency_limit` requests; a chunk's
//! requests are joined on the calling task, so they interleave cooperatively
//! rather than running on separate threads. The next chunk is only issued
//! once the whole previous chunk has resolved.

use futures::future::join_all;
use serde_json::Value;

use super::cancel::CancellationScope;
use super::row::Row;
use crate::remote::{ListingSource, PageRequest, RemoteError};

/// Parameters of one aggregation run
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPlan {
    pub filter_payload: Value,
    pub page_size: u32,
    pub concurrency_limit: usize,
}

impl AggregationPlan {
    fn request(&self, page_index: u32) -> PageRequest {
        PageRequest {
            page_index,
            page_size: self.page_size.max(1),
            filter_payload: self.filter_payload.clone(),
        }
    }
}

/// Progress of an aggregation; `rows` only ever grows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregationState {
    pub pages_fetched: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub rows: Vec<Row>,
    pub cancelled: bool,
}

/// How an aggregation ended
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// Every page was fetched
    Completed(AggregationState),
    /// The scope was cancelled; holds the rows of fully completed chunks
    Cancelled(AggregationState),
    /// A page request failed; nothing partial is kept
    Failed(RemoteError),
}

impl AggregationOutcome {
    #[cfg(test)]
    pub fn state(&self) -> Option<&AggregationState> {
        match self {
            Self::Completed(state) | Self::Cancelled(state) => Some(state),
            Self::Failed(_) => None,
        }
    }
}

/// Fetch every page of a listing.
///
/// `progress` is called with `(rows loaded so far, total reported by the
/// source)` after the first page and after every chunk.
pub async fn aggregate<S, P>(
    source: &S,
    plan: &AggregationPlan,
    scope: &CancellationScope,
    mut progress: P,
) -> AggregationOutcome
where
    S: ListingSource + ?Sized,
    P: FnMut(usize, u64),
{
    let page_size = u64::from(plan.page_size.max(1));
    let concurrency_limit = plan.concurrency_limit.max(1);
    let mut state = AggregationState::default();

    if scope.is_cancelled() {
        state.cancelled = true;
        return AggregationOutcome::Cancelled(state);
    }

    let first = match source.fetch_page(&plan.request(1), scope).await {
        Ok(page) => page,
        Err(_) if scope.is_cancelled() => {
            state.cancelled = true;
            return AggregationOutcome::Cancelled(state);
        }
        Err(err) => {
            tracing::warn!("Aggregation failed on page 1: {err}");
            return AggregationOutcome::Failed(err);
        }
    };

    if scope.is_cancelled() {
        state.cancelled = true;
        return AggregationOutcome::Cancelled(state);
    }

    state.pages_fetched = 1;
    state.total_count = first.total_count;
    state.total_pages = u32::try_from(first.total_count.div_ceil(page_size))
        .unwrap_or(u32::MAX)
        .max(1);

    if first.rows.is_empty() {
        tracing::debug!("Listing is empty");
        return AggregationOutcome::Completed(state);
    }

    state.rows.extend(first.rows);
    progress(state.rows.len(), state.total_count);

    if state.total_pages <= 1 {
        return AggregationOutcome::Completed(state);
    }

    let remaining: Vec<u32> = (2..=state.total_pages).collect();
    for chunk in remaining.chunks(concurrency_limit) {
        if scope.is_cancelled() {
            state.cancelled = true;
            return AggregationOutcome::Cancelled(state);
        }

        tracing::debug!(
            "Fetching pages {}..={} of {}",
            chunk[0],
            chunk[chunk.len() - 1],
            state.total_pages
        );

        let requests = chunk.iter().map(|&page_index| {
            let request = plan.request(page_index);
            async move {
                if scope.is_cancelled() {
                    return None;
                }
                Some(source.fetch_page(&request, scope).await)
            }
        });
        // join_all yields results in declared page order regardless of
        // which response arrived first
        let results = join_all(requests).await;

        if scope.is_cancelled() {
            state.cancelled = true;
            return AggregationOutcome::Cancelled(state);
        }

        for (page_index, result) in chunk.iter().zip(results) {
            match result {
                Some(Ok(page)) => {
                    state.rows.extend(page.rows);
                    state.pages_fetched += 1;
                }
                Some(Err(err)) => {
                    tracing::warn!("Aggregation failed on page {page_index}: {err}");
                    return AggregationOutcome::Failed(err);
                }
                // Only skipped when the scope was cancelled, handled above
                None => {}
            }
        }

        progress(state.rows.len(), state.total_count);
    }

    tracing::info!(
        "Aggregated {} rows from {} pages",
        state.rows.len(),
        state.pages_fetched
    );
    AggregationOutcome::Completed(state)
}
