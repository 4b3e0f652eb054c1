// Document-body sync collaborator.
//
// The registry only hands document ids to this seam. Merge semantics belong
// to the implementation (`yrs` in-process by default).

pub mod doc_manager;

use std::{future::Future, pin::Pin};

use uuid::Uuid;

pub use doc_manager::YrsDocumentSync;

pub type SyncFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SyncError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("update for document {doc_id} could not be decoded or applied")]
    InvalidUpdate { doc_id: Uuid },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub trait DocumentSync: Send + Sync {
    /// Create an empty collaborative body for a new document.
    fn attach(&self, doc_id: Uuid) -> SyncFuture<'_, ()>;

    /// Drop the body of a deleted document. Unknown ids are a no-op.
    fn detach(&self, doc_id: Uuid) -> SyncFuture<'_, ()>;

    /// Full state of the body as one binary update.
    fn encode_state(&self, doc_id: Uuid) -> SyncFuture<'_, Vec<u8>>;

    /// Merge a binary update produced by a client replica.
    fn apply_update<'a>(&'a self, doc_id: Uuid, update: &'a [u8]) -> SyncFuture<'a, ()>;
}
