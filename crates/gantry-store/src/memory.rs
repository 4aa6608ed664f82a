//! In-memory implementations of the storage traits (testing and defaults).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::records::{ArtifactKind, FeedbackOutcome, FeedbackRecord, Signature, StoredExample};
use crate::traits::{CorpusStore, FeedbackLedger};

type CorpusKey = (String, ArtifactKind);

/// In-memory corpus backed by a `HashMap<(signature, kind), StoredExample>`.
///
/// The `RwLock` gives concurrent reads and exclusive batch writes, matching
/// the corpus access contract.
#[derive(Debug, Default)]
pub struct MemoryCorpusStore {
    entries: RwLock<HashMap<CorpusKey, StoredExample>>,
}

impl MemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpusStore {
    async fn get(
        &self,
        signature: &Signature,
        kind: ArtifactKind,
    ) -> StoreResult<Option<StoredExample>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(signature.as_str().to_string(), kind)).cloned())
    }

    async fn entries(&self, kind: ArtifactKind) -> StoreResult<Vec<StoredExample>> {
        let entries = self.entries.read().await;
        let mut out: Vec<StoredExample> = entries
            .values()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.signature.as_str().cmp(b.signature.as_str()));
        Ok(out)
    }

    async fn put_batch(&self, examples: Vec<StoredExample>) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        for example in examples {
            entries.insert(
                (example.signature.as_str().to_string(), example.kind),
                example,
            );
        }
        Ok(())
    }

    async fn len(&self) -> StoreResult<usize> {
        Ok(self.entries.read().await.len())
    }
}

/// In-memory feedback ledger backed by an insertion-ordered `Vec`.
#[derive(Debug, Default)]
pub struct MemoryFeedbackLedger {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl MemoryFeedbackLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackLedger for MemoryFeedbackLedger {
    async fn append(&self, record: FeedbackRecord) -> StoreResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<FeedbackRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::FeedbackNotFound { id })
    }

    async fn unfolded_accepted(&self) -> StoreResult<Vec<FeedbackRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| !r.folded && r.outcome != FeedbackOutcome::Rejected)
            .cloned()
            .collect())
    }

    async fn mark_folded(&self, ids: &[Uuid]) -> StoreResult<()> {
        let mut records = self.records.write().await;
        for record in records.iter_mut() {
            if ids.contains(&record.id) {
                record.folded = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RetrievalFacets;
    use chrono::Utc;

    fn example(sig: &Signature, kind: ArtifactKind, content: &str) -> StoredExample {
        StoredExample {
            signature: sig.clone(),
            kind,
            content: content.to_string(),
            facets: RetrievalFacets::default(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn batch_put_supersedes_same_key() {
        let store = MemoryCorpusStore::new();
        let sig = Signature::from_parts(["python", "flask"]);

        store
            .put_batch(vec![
                example(&sig, ArtifactKind::Dockerfile, "old"),
                example(&sig, ArtifactKind::Dockerfile, "new"),
            ])
            .await
            .unwrap();

        let got = store.get(&sig, ArtifactKind::Dockerfile).await.unwrap();
        assert_eq!(got.unwrap().content, "new");
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn entries_filters_by_kind() {
        let store = MemoryCorpusStore::new();
        let sig = Signature::from_parts(["go", "gin"]);

        store
            .put_batch(vec![
                example(&sig, ArtifactKind::Dockerfile, "a"),
                example(&sig, ArtifactKind::CiPipeline, "b"),
            ])
            .await
            .unwrap();

        let docker = store.entries(ArtifactKind::Dockerfile).await.unwrap();
        assert_eq!(docker.len(), 1);
        assert_eq!(docker[0].content, "a");
    }
}
