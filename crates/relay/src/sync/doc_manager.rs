use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;
use yrs::updates::decoder::Decode;
use yrs::{Doc, ReadTxn, StateVector, Transact, Update};

use super::{DocumentSync, SyncError, SyncFuture};

/// One in-process `yrs::Doc` per document id.
///
/// Bodies are created lazily, so a document whose body was lost on restart
/// starts over empty instead of failing.
#[derive(Default)]
pub struct YrsDocumentSync {
    docs: RwLock<HashMap<Uuid, Doc>>,
}

impl YrsDocumentSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_attached(&self, doc_id: Uuid) -> bool {
        self.docs.read().await.contains_key(&doc_id)
    }

    async fn attach_doc(&self, doc_id: Uuid) {
        self.docs.write().await.entry(doc_id).or_insert_with(Doc::new);
    }

    async fn encode_doc(&self, doc_id: Uuid) -> Vec<u8> {
        let mut docs = self.docs.write().await;
        let doc = docs.entry(doc_id).or_insert_with(Doc::new);
        let txn = doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    async fn apply_doc_update(&self, doc_id: Uuid, payload: &[u8]) -> Result<(), SyncError> {
        let mut docs = self.docs.write().await;
        let decoded =
            Update::decode_v1(payload).map_err(|_| SyncError::InvalidUpdate { doc_id })?;
        let doc = docs.entry(doc_id).or_insert_with(Doc::new);
        let mut txn = doc.transact_mut();
        txn.apply_update(decoded).map_err(|_| SyncError::InvalidUpdate { doc_id })?;
        Ok(())
    }
}

impl DocumentSync for YrsDocumentSync {
    fn attach(&self, doc_id: Uuid) -> SyncFuture<'_, ()> {
        Box::pin(async move {
            self.attach_doc(doc_id).await;
            Ok(())
        })
    }

    fn detach(&self, doc_id: Uuid) -> SyncFuture<'_, ()> {
        Box::pin(async move {
            self.docs.write().await.remove(&doc_id);
            Ok(())
        })
    }

    fn encode_state(&self, doc_id: Uuid) -> SyncFuture<'_, Vec<u8>> {
        Box::pin(async move { Ok(self.encode_doc(doc_id).await) })
    }

    fn apply_update<'a>(&'a self, doc_id: Uuid, update: &'a [u8]) -> SyncFuture<'a, ()> {
        Box::pin(self.apply_doc_update(doc_id, update))
    }
}
