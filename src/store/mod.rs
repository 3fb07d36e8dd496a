//! Destination blob store.
//!
//! The resolver only needs "does this container exist" and the orchestrator needs
//! "create it". `DestinationStore` captures exactly that, so tests can swap in an
//! in-memory fake and the Azure client stays a thin REST wrapper.

mod auth;
mod azure;

pub use auth::{canonicalized_headers, sign, string_to_sign, SharedKeyRequest};
pub use azure::{AzureBlobStore, API_VERSION};

use crate::errors::BackupError;

/// Capabilities required from the destination account.
pub trait DestinationStore {
    /// True if a container with this exact name already exists.
    fn container_exists(&self, name: &str) -> Result<bool, BackupError>;

    /// Create the container. Fails if it already exists.
    fn create_container(&self, name: &str) -> Result<(), BackupError>;

    /// Public URL of a container in this store.
    fn container_url(&self, name: &str) -> String;
}

impl<T: DestinationStore + ?Sized> DestinationStore for &T {
    fn container_exists(&self, name: &str) -> Result<bool, BackupError> {
        (**self).container_exists(name)
    }

    fn create_container(&self, name: &str) -> Result<(), BackupError> {
        (**self).create_container(name)
    }

    fn container_url(&self, name: &str) -> String {
        (**self).container_url(name)
    }
}

/// `https://<account>.blob.core.windows.net/<container>`
pub fn blob_container_url(storage_account: &str, container: &str) -> String {
    format!("https://{storage_account}.blob.core.windows.net/{container}")
}
