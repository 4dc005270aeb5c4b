use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::blob::{BlobStore, Revision, StoredBlob};
use crate::error::StoreError;

/// A successful write as seen by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub path: String,
    pub message: String,
    /// Revision the caller supplied.
    pub revision: Option<Revision>,
    /// Revision assigned by the write.
    pub new_revision: Revision,
}

/// In-process blob store with the contents API's conditional write rules.
///
/// Revisions are SHA-256 hashes of the stored bytes. Writing an existing path
/// without a revision fails with 422, writing with a stale one fails with 409.
pub struct MemoryBlobStore {
    files: Mutex<HashMap<String, StoredBlob>>,
    writes: Mutex<Vec<WriteRecord>>,
    fetches: AtomicUsize,
    writable: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            writable: true,
        }
    }

    /// A store that behaves like a backend without a write credential.
    pub fn read_only() -> Self {
        Self {
            writable: false,
            ..Self::new()
        }
    }

    /// Put content at a path directly, bypassing revision checks.
    pub fn insert(&self, path: &str, content: &[u8]) -> Revision {
        let revision = Self::revision_of(content);
        self.insert_with_revision(path, content, revision.clone());
        revision
    }

    /// Put content at a path with a chosen revision.
    pub fn insert_with_revision(&self, path: &str, content: &[u8], revision: Revision) {
        self.files().insert(
            path.to_string(),
            StoredBlob {
                content: content.to_vec(),
                revision,
            },
        );
    }

    /// Successful writes in the order they happened.
    pub fn writes(&self) -> Vec<WriteRecord> {
        lock(&self.writes).clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn files(&self) -> MutexGuard<'_, HashMap<String, StoredBlob>> {
        lock(&self.files)
    }

    fn revision_of(content: &[u8]) -> Revision {
        Revision::new(hex::encode(Sha256::digest(content)))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::Configuration("memory store is read-only".to_string()))
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, path: &str) -> Result<Option<StoredBlob>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.files().get(path).cloned())
    }

    #[instrument(skip(self), level = "debug")]
    async fn revision(&self, path: &str) -> Result<Option<Revision>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.files().get(path).map(|blob| blob.revision.clone()))
    }

    #[instrument(skip(self, content), level = "debug", fields(content_len = content.len()))]
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        revision: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        self.ensure_writable()?;

        let mut files = self.files();
        match (files.get(path), revision) {
            (Some(_), None) => {
                return Err(StoreError::Remote {
                    status: 422,
                    message: format!("Invalid request. \"sha\" wasn't supplied for {}", path),
                });
            }
            (Some(current), Some(expected)) if &current.revision != expected => {
                return Err(StoreError::Remote {
                    status: 409,
                    message: format!(
                        "{} is at {} but expected {}",
                        path, current.revision, expected
                    ),
                });
            }
            (None, Some(expected)) => {
                return Err(StoreError::Remote {
                    status: 409,
                    message: format!("{} does not exist but expected {}", path, expected),
                });
            }
            _ => {}
        }

        let new_revision = Self::revision_of(content);
        files.insert(
            path.to_string(),
            StoredBlob {
                content: content.to_vec(),
                revision: new_revision.clone(),
            },
        );
        drop(files);

        lock(&self.writes).push(WriteRecord {
            path: path.to_string(),
            message: message.to_string(),
            revision: revision.cloned(),
            new_revision: new_revision.clone(),
        });

        debug!("Stored {} at revision {}", path, new_revision);
        Ok(new_revision)
    }
}
