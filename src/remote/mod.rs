//! Remote case service: HTTP client, retry policy and credential storage

mod client;
mod credentials;
mod error;
mod retry;
#[cfg(test)]
pub mod test_server;
mod traits;

pub use client::RemoteClient;
pub use credentials::FileCredentialStore;
pub use error::RemoteError;
pub use retry::RetryPolicy;
pub use traits::{
    AssignmentResponse, AssignmentSource, CredentialStore, ListingSource, PageRequest, PageResult,
    Rejection,
};

#[cfg(test)]
pub use traits::{MockAssignmentSource, MockCredentialStore, MockListingSource};
