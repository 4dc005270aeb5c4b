use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Opaque token identifying the stored version of a path.
///
/// Assigned by the remote store on every write and required to overwrite an
/// existing path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Revision {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

/// Raw content of a path together with the revision it was read at.
///
/// `content` is the base64 text exactly as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content: Vec<u8>,
    pub revision: Revision,
}

/// Path-addressed blob storage with conditional writes.
///
/// Implementations must:
/// - return `Ok(None)` from `fetch` when the path does not exist
/// - create the path when `write` is given no revision
/// - reject `write` when the given revision is not the current one
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the backend identifier (e.g., "github", "memory").
    fn backend_name(&self) -> &'static str;

    /// Fails with `StoreError::Configuration` when this backend cannot write.
    ///
    /// Callers check this before starting a read-modify-write cycle so a
    /// misconfigured process never touches the remote store.
    fn ensure_writable(&self) -> Result<(), StoreError>;

    /// Fetch the current content and revision of a path.
    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>, StoreError>;

    /// Current revision of a path, without requiring readable content.
    ///
    /// Used before blind overwrites, which must succeed even when the stored
    /// content cannot be decoded or is not returned inline.
    async fn revision(&self, path: &str) -> Result<Option<Revision>, StoreError>;

    /// Create or overwrite a path, returning the new revision.
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        revision: Option<&Revision>,
    ) -> Result<Revision, StoreError>;
}
