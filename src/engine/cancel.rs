//! Cancellation scopes issued per workflow step

use std::fmt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity of a cancellation scope.
///
/// Async results are tagged with the id of the scope that started them so a
/// late response from an abandoned scope can never touch newer step state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(Uuid);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// Revocable handle marking a unit of work as abandonable.
///
/// Clones share the same cancellation state and identity. Cancelling is
/// cooperative: work already dispatched runs to completion but its result is
/// discarded by whoever checks the scope.
#[derive(Debug, Clone)]
pub struct CancellationScope {
    id: ScopeId,
    token: CancellationToken,
}

impl CancellationScope {
    pub fn new() -> Self {
        Self {
            id: ScopeId(Uuid::new_v4()),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Cancelling scope {}", self.id);
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the scope is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Default for CancellationScope {
    fn default() -> Self {
        Self::new()
    }
}
