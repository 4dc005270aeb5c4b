use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::blob::{BlobStore, Revision};
use crate::codec;
use crate::commit::CommitMessage;
use crate::error::StoreError;

/// A value that can be stored as a whole file.
///
/// `Default` is the document a path holds before it has ever been written.
pub trait Document: Serialize + DeserializeOwned + Default + Send + Sync {}

impl<T> Document for T where T: Serialize + DeserializeOwned + Default + Send + Sync {}

/// One stored document as read from the remote store.
///
/// `revision` is `None` when the path did not exist. It is only meaningful for
/// the single write that follows the read producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFile<D> {
    pub path: String,
    pub revision: Option<Revision>,
    pub content: D,
}

/// Read-modify-write access to whole documents in a [`BlobStore`].
///
/// Every call starts from a fresh read. There is no locking and no retry: two
/// overlapping cycles on the same path either lose an update or fail on the
/// store's conditional write.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn BlobStore>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Read and decode a document. A missing path yields `D::default()`.
    #[instrument(skip(self), level = "debug")]
    pub async fn load<D: Document>(&self, path: &str) -> Result<RemoteFile<D>, StoreError> {
        match self.backend.fetch(path).await? {
            Some(blob) => {
                let content = codec::decode(&blob.content)?;
                debug!("Loaded {} at revision {}", path, blob.revision);
                Ok(RemoteFile {
                    path: path.to_string(),
                    revision: Some(blob.revision),
                    content,
                })
            }
            None => {
                debug!("{} does not exist yet, using empty document", path);
                Ok(RemoteFile {
                    path: path.to_string(),
                    revision: None,
                    content: D::default(),
                })
            }
        }
    }

    /// Apply `mutate` to the current document and write the result back with
    /// the revision it was read at.
    ///
    /// `mutate` returns the commit message describing its change. Nothing is
    /// fetched when the backend cannot write.
    #[instrument(skip(self, mutate), level = "debug")]
    pub async fn update<D, F>(&self, path: &str, mutate: F) -> Result<RemoteFile<D>, StoreError>
    where
        D: Document,
        F: FnOnce(&mut D) -> CommitMessage + Send,
    {
        self.backend.ensure_writable()?;

        let mut file = self.load::<D>(path).await?;
        let message = mutate(&mut file.content);
        let revision = self
            .save(path, &file.content, &message, file.revision.as_ref())
            .await?;

        file.revision = Some(revision);
        Ok(file)
    }

    /// Overwrite a document without decoding what is currently stored.
    ///
    /// Only the current revision is read, so a corrupt document can still be
    /// replaced.
    #[instrument(skip(self, content), level = "debug")]
    pub async fn replace<D: Document>(
        &self,
        path: &str,
        content: D,
        message: CommitMessage,
    ) -> Result<RemoteFile<D>, StoreError> {
        self.backend.ensure_writable()?;

        let current = self.backend.revision(path).await?;
        let revision = self.save(path, &content, &message, current.as_ref()).await?;

        Ok(RemoteFile {
            path: path.to_string(),
            revision: Some(revision),
            content,
        })
    }

    async fn save<D: Document>(
        &self,
        path: &str,
        content: &D,
        message: &CommitMessage,
        revision: Option<&Revision>,
    ) -> Result<Revision, StoreError> {
        let blob = codec::encode(content)?;
        let rendered = message.render(Utc::now());
        let revision = self.backend.write(path, &blob, &rendered, revision).await?;
        debug!("Wrote {} ({} bytes) at revision {}", path, blob.len(), revision);
        Ok(revision)
    }
}
